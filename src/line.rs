//! The lifecycle of a single exported GPIO line.
//!
//! A [`Line`] is acquired with [`Line::request`] (or configured in the same step with
//! [`Line::request_one`]), opened with [`Line::open`] or [`Line::full_open`], used through
//! its typed getters and setters, and finally [`closed`](Line::close) and
//! [`released`](Line::release).  Releasing is never implicit: dropping a `Line` closes its
//! handles but leaves the kernel-side export in place.

use log::{debug, trace, warn};

use crate::{
    errors::{Error, ErrorKind, Result},
    sysfs::{Access, Attribute, Node, SysfsAccess},
};

pub mod array;
mod handles;
pub(crate) mod oneshot;
pub mod options;
pub mod trigger;

pub use array::{free_array, ArrayError, LineArray, LineRequest};
pub use options::{Capabilities, Direction, Level, LineConfig, RequestDirection, RequestFlags};
pub use trigger::{Trigger, TriggerFlags, UnrecognizedTrigger};

use handles::Handles;
use oneshot::{NodeText, NODE_TEXT_MAX};

/// Context for one GPIO line
///
/// Every operation is synchronous; a `Line` must not be used from several threads without
/// external locking.
pub struct Line<'a, A: SysfsAccess> {
    sysfs: &'a A,
    line: u32,
    label: String,
    owned: bool,
    caps: Capabilities,
    direction: Option<Direction>,
    trigger: Option<Trigger>,
    handles: Handles<A::Node>,
}

impl<'a, A: SysfsAccess> Line<'a, A> {
    /// Acquire `line`, exporting it if it is not exported yet.
    ///
    /// The line is only un-exported on [`release`](Self::release) if this call exported
    /// it.  Capabilities are probed and the current direction and trigger are read to seed
    /// the context; values that cannot be read are left unknown.  No handles are opened.
    pub fn request(sysfs: &'a A, line: u32, label: &str) -> Result<Self> {
        let exported = sysfs
            .is_exported(line)
            .map_err(|e| Error::on(line, Attribute::Value, ErrorKind::ProbeFailed(e)))?;

        if !exported {
            sysfs
                .export(line)
                .map_err(|e| Error::new(line, ErrorKind::ExportFailed(e)))?;
            debug!("gpio{line}: exported for {label:?}");
        }

        let mut this = Self {
            sysfs,
            line,
            label: label.to_owned(),
            owned: !exported,
            caps: Capabilities::default(),
            direction: None,
            trigger: None,
            handles: Handles::closed(),
        };

        if let Err(e) = this.probe() {
            this.undo_export();
            return Err(e);
        }

        Ok(this)
    }

    /// Acquire `line` and apply `config`.
    ///
    /// The trigger is only applied if the line exposes an `edge` node.  Any failure after
    /// this call exported the line un-exports it again before the error is returned; a
    /// line that was already exported is left exported.
    pub fn request_one(
        sysfs: &'a A,
        line: u32,
        config: impl Into<LineConfig>,
        label: &str,
    ) -> Result<Self> {
        let config = config.into();
        let mut this = Self::request(sysfs, line, label)?;

        if let Err(e) = this.apply(config) {
            warn!("gpio{line}: configuring {config:?} failed: {e}");
            this.undo_export();
            return Err(e);
        }

        Ok(this)
    }

    fn probe(&mut self) -> Result<()> {
        let line = self.line;
        self.caps = Capabilities {
            alterable_direction: oneshot::probe(self.sysfs, line, Attribute::Direction)?,
            alterable_edge: oneshot::probe(self.sysfs, line, Attribute::Edge)?,
        };

        if self.caps.alterable_direction {
            self.direction = oneshot::get_direction(self.sysfs, line).ok();
            if self.caps.alterable_edge {
                self.trigger = oneshot::get_edge(self.sysfs, line).ok();
            }
        }

        trace!(
            "gpio{line}: {:?}, direction {:?}, trigger {:?}",
            self.caps,
            self.direction,
            self.trigger
        );
        Ok(())
    }

    /// Apply a requested configuration through one-shot writes.
    fn apply(&mut self, config: LineConfig) -> Result<()> {
        if !self.caps.alterable_direction {
            return Err(self.error(Attribute::Direction, ErrorKind::Unsupported));
        }

        let (text, direction): (&[u8], _) = match config.direction {
            RequestDirection::Input => (&b"in"[..], Direction::Input),
            RequestDirection::Output { initial } => {
                (oneshot::output_word(initial), Direction::Output)
            }
        };
        oneshot::write_text(self.sysfs, self.line, Attribute::Direction, text)?;
        self.direction = Some(direction);

        if self.caps.alterable_edge {
            oneshot::write_text(
                self.sysfs,
                self.line,
                Attribute::Edge,
                config.trigger.name().as_bytes(),
            )?;
            self.trigger = Some(config.trigger);
        }

        debug!("gpio{}: configured {:?}", self.line, config);
        Ok(())
    }

    fn undo_export(&mut self) {
        if !self.owned {
            return;
        }
        self.handles.close_all();
        match self.sysfs.unexport(self.line) {
            Ok(()) => {
                self.owned = false;
                debug!("gpio{}: export undone", self.line);
            }
            Err(e) => warn!("gpio{}: undoing export failed: {e}", self.line),
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether this context exported the line and will un-export it on release
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// The last direction read or set, `None` while unknown
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// The last trigger read or set, `None` while unknown
    pub fn trigger(&self) -> Option<Trigger> {
        self.trigger
    }

    /// Whether the value handle is open
    pub fn is_open(&self) -> bool {
        self.handles.get(Attribute::Value).is_some()
    }

    pub fn value_handle(&self) -> Option<&A::Node> {
        self.handles.get(Attribute::Value)
    }

    /// Access mode the value handle needs for the current direction
    fn value_access(&self) -> Access {
        match self.direction {
            Some(Direction::Input) => Access::ReadOnly,
            Some(Direction::Output) | None => Access::ReadWrite,
        }
    }

    /// Open the value node.
    ///
    /// The handle is read-only for inputs and read-write otherwise.  Opening an open
    /// line returns the existing handle.
    pub fn open(&mut self) -> Result<&A::Node> {
        let access = self.value_access();
        self.open_handle(Attribute::Value, access)?;
        self.handles
            .get(Attribute::Value)
            .ok_or_else(|| self.error(Attribute::Value, ErrorKind::NotOpen))
    }

    /// Open every node the line exposes: value, active-low, and direction and edge if
    /// they are alterable.
    ///
    /// Handles already open are kept.  On failure, the handles opened before the failing
    /// one stay open; [`close`](Self::close) releases them.
    pub fn full_open(&mut self) -> Result<()> {
        self.open()?;
        self.open_handle(Attribute::ActiveLow, Access::ReadWrite)?;
        if self.caps.alterable_direction {
            self.open_handle(Attribute::Direction, Access::ReadWrite)?;
        }
        if self.caps.alterable_edge {
            self.open_handle(Attribute::Edge, Access::ReadWrite)?;
        }
        Ok(())
    }

    fn open_handle(&mut self, attribute: Attribute, access: Access) -> Result<()> {
        if self.handles.get(attribute).is_some() {
            return Ok(());
        }
        let node = self
            .sysfs
            .open(self.line, attribute, access)
            .map_err(|e| self.error(attribute, ErrorKind::Io(e)))?;
        trace!("gpio{}: opened {attribute} {access:?}", self.line);
        *self.handles.slot(attribute) = Some(node);
        Ok(())
    }

    /// Close every open handle.  The line stays exported.
    pub fn close(&mut self) {
        for attribute in self.handles.close_all() {
            trace!("gpio{}: closed {attribute}", self.line);
        }
    }

    /// Close every handle and, if this context exported the line, un-export it.
    ///
    /// Releasing again, or releasing a line this context did not export, does nothing
    /// kernel-side.  If un-exporting fails the context keeps its ownership so the release
    /// can be retried.
    pub fn release(&mut self) -> Result<()> {
        self.close();
        if !self.owned {
            return Ok(());
        }
        self.sysfs
            .unexport(self.line)
            .map_err(|e| Error::new(self.line, ErrorKind::UnexportFailed(e)))?;
        self.owned = false;
        debug!("gpio{}: unexported", self.line);
        Ok(())
    }

    pub fn get_value(&mut self) -> Result<Level> {
        self.sync_value_access()?;
        let digit = self.read_digit(Attribute::Value)?;
        Ok(Level::new(digit))
    }

    pub fn set_value(&mut self, level: impl Into<Level>) -> Result<()> {
        self.sync_value_access()?;
        self.write_handle(Attribute::Value, &[level.into().digit()])
    }

    pub fn get_active_low(&mut self) -> Result<bool> {
        self.read_digit(Attribute::ActiveLow)
    }

    pub fn set_active_low(&mut self, active_low: bool) -> Result<()> {
        self.write_handle(Attribute::ActiveLow, &oneshot::digit_text(active_low))
    }

    /// Read the direction node, refreshing the mirrored direction.
    pub fn get_direction(&mut self) -> Result<Direction> {
        self.require(Attribute::Direction)?;
        let text = self.read_handle(Attribute::Direction)?;
        let direction = oneshot::parse_direction(self.line, &text)?;
        self.direction = Some(direction);
        Ok(direction)
    }

    pub fn set_direction_input(&mut self) -> Result<()> {
        self.set_direction(b"in", Direction::Input)
    }

    /// Make the line an output, driving `level` from the moment it switches.
    pub fn set_direction_output(&mut self, level: impl Into<Level>) -> Result<()> {
        self.set_direction(oneshot::output_word(level.into()), Direction::Output)
    }

    /// Write the direction node and bring an open value handle to the access mode the new
    /// direction allows, without closing it.
    ///
    /// The mirrored direction follows the kernel even if the handle cannot be adjusted;
    /// the next value transfer retries the adjustment.
    fn set_direction(&mut self, text: &[u8], direction: Direction) -> Result<()> {
        self.require(Attribute::Direction)?;
        self.write_handle(Attribute::Direction, text)?;
        self.direction = Some(direction);
        debug!("gpio{}: direction {direction:?}", self.line);
        self.sync_value_access()
    }

    /// Bring an open value handle to the access mode of the mirrored direction.
    fn sync_value_access(&mut self) -> Result<()> {
        let access = self.value_access();
        let line = self.line;
        if let Some(value) = self.handles.get_mut(Attribute::Value) {
            if value.access() != access {
                value
                    .set_access(access)
                    .map_err(|e| Error::on(line, Attribute::Value, ErrorKind::Io(e)))?;
                trace!("gpio{line}: value handle now {access:?}");
            }
        }
        Ok(())
    }

    /// Read the edge node, refreshing the mirrored trigger.
    pub fn get_edge(&mut self) -> Result<Trigger> {
        self.require(Attribute::Edge)?;
        let text = self.read_handle(Attribute::Edge)?;
        let trigger = Trigger::decode(&text).map_err(|e| self.error(Attribute::Edge, e.into()))?;
        self.trigger = Some(trigger);
        Ok(trigger)
    }

    pub fn set_edge(&mut self, trigger: Trigger) -> Result<()> {
        self.require(Attribute::Edge)?;
        self.write_handle(Attribute::Edge, trigger.name().as_bytes())?;
        self.trigger = Some(trigger);
        debug!("gpio{}: edge {trigger}", self.line);
        Ok(())
    }

    /// Fail with `Unsupported` if the line does not expose `attribute`.
    fn require(&self, attribute: Attribute) -> Result<()> {
        let alterable = match attribute {
            Attribute::Direction => self.caps.alterable_direction,
            Attribute::Edge => self.caps.alterable_edge,
            Attribute::Value | Attribute::ActiveLow => true,
        };
        if alterable {
            Ok(())
        } else {
            Err(self.error(attribute, ErrorKind::Unsupported))
        }
    }

    fn read_digit(&mut self, attribute: Attribute) -> Result<bool> {
        let line = self.line;
        let mut buf = [0; 1];
        let n = self
            .handle(attribute)?
            .read_from_start(&mut buf)
            .map_err(|e| Error::on(line, attribute, ErrorKind::Io(e)))?;
        oneshot::parse_digit(line, attribute, &buf[..n])
    }

    fn read_handle(&mut self, attribute: Attribute) -> Result<NodeText> {
        let line = self.line;
        let mut buf = [0; NODE_TEXT_MAX];
        let n = self
            .handle(attribute)?
            .read_from_start(&mut buf)
            .map_err(|e| Error::on(line, attribute, ErrorKind::Io(e)))?;
        oneshot::node_text(line, attribute, &buf[..n])
    }

    fn write_handle(&mut self, attribute: Attribute, text: &[u8]) -> Result<()> {
        let line = self.line;
        let n = self
            .handle(attribute)?
            .write_from_start(text)
            .map_err(|e| Error::on(line, attribute, ErrorKind::Io(e)))?;
        oneshot::check_written(line, attribute, text, n)
    }

    fn handle(&mut self, attribute: Attribute) -> Result<&mut A::Node> {
        let line = self.line;
        self.handles
            .get_mut(attribute)
            .ok_or_else(|| Error::on(line, attribute, ErrorKind::NotOpen))
    }

    fn error(&self, attribute: Attribute, kind: ErrorKind) -> Error {
        Error::on(self.line, attribute, kind)
    }
}

impl<A: SysfsAccess> std::fmt::Debug for Line<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("line", &self.line)
            .field("label", &self.label)
            .field("owned", &self.owned)
            .field("caps", &self.caps)
            .field("direction", &self.direction)
            .field("trigger", &self.trigger)
            .field("open", &self.is_open())
            .finish()
    }
}
