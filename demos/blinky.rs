// Copyright (c) 2024 The rust-gpio-sysfs Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use gpio_sysfs::{Level, LineConfig, Sysfs, SysfsAccess};
use quicli::prelude::*;
use std::thread::sleep;
use std::time::{Duration, Instant};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
struct Cli {
    /// The GPIO line number
    line: u32,
    /// Period in milliseconds
    period_ms: u64,
    /// Duration over which to blink in milliseconds
    duration_ms: u64,
}

fn do_main(args: Cli) -> gpio_sysfs::Result<()> {
    let sysfs = Sysfs::from_env();

    // NOTE: the line starts out driven low, so no separate write is needed
    let mut line = sysfs.request_one(args.line, LineConfig::output(Level::Low), "blinky")?;
    line.open()?;

    let duration = Duration::from_millis(args.duration_ms);
    let start_time = Instant::now();
    let mut level = Level::Low;
    while start_time.elapsed() < duration {
        sleep(Duration::from_millis(args.period_ms));
        level = !level;
        line.set_value(level)?;
    }

    line.release()
}

fn main() -> CliResult {
    let args = Cli::from_args();
    do_main(args).or_else(|e| {
        error!("{:?}", e);
        Ok(())
    })
}
