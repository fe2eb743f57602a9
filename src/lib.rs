// Copyright (c) 2024 The rust-gpio-sysfs Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `gpio-sysfs` crate provides access to GPIO lines through the legacy [sysfs GPIO
//! interface](https://www.kernel.org/doc/Documentation/gpio/sysfs.txt) found under
//! `/sys/class/gpio`.
//!
//! Each line is a managed resource with an explicit lifecycle:
//!
//! 1. **request**: the line is exported if needed, and the context remembers whether it
//!    did the export.  The optional `direction` and `edge` nodes are probed.
//! 2. **open**: the `value` node (and with [`Line::full_open`] the other nodes) is
//!    opened once and kept open.
//! 3. **use**: typed reads and writes of value, active-low, direction and edge.
//! 4. **close** and **release**: handles are closed, and the line is un-exported only if
//!    this context exported it.
//!
//! Several lines can be requested as a unit with [`LineArray::request`], which releases
//! everything it acquired if any member fails.
//!
//! # Examples
//!
//! Drive an LED from a button:
//!
//! ```no_run
//! use gpio_sysfs::{Level, LineConfig, Sysfs, SysfsAccess};
//!
//! # fn main() -> Result<(), gpio_sysfs::Error> {
//! let sysfs = Sysfs::new();
//! let mut button = sysfs.request_one(17, LineConfig::input(), "button")?;
//! let mut led = sysfs.request_one(27, LineConfig::output(Level::Low), "led")?;
//! button.open()?;
//! led.open()?;
//!
//! let pressed = button.get_value()?;
//! led.set_value(pressed)?;
//!
//! led.release()?;
//! button.release()?;
//! # Ok(()) }
//! ```
//!
//! Request several lines at once:
//!
//! ```no_run
//! use gpio_sysfs::{LineArray, LineRequest, RequestFlags, Sysfs};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sysfs = Sysfs::new();
//! let lines = LineArray::request(
//!     &sysfs,
//!     &[
//!         LineRequest::new(5, RequestFlags::IN | RequestFlags::TRIG_BOTH, "irq"),
//!         LineRequest::new(6, RequestFlags::OUT_INIT_HIGH, "reset"),
//!     ],
//! )?;
//! // ...
//! lines.free();
//! # Ok(()) }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod errors;

pub mod line;

pub mod sysfs;

pub use errors::{Error, ErrorKind, Result};
pub use line::{
    free_array, ArrayError, Capabilities, Direction, Level, Line, LineArray, LineConfig,
    LineRequest, RequestDirection, RequestFlags, Trigger, TriggerFlags, UnrecognizedTrigger,
};
pub use sysfs::{Access, Attribute, Node, Sysfs, SysfsAccess, SysfsNode};
