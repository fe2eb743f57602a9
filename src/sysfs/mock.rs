//! In-memory emulation of the GPIO sysfs interface.
//!
//! [`MockSysfs`] behaves like the kernel for the lines it knows about: exporting creates
//! the attribute nodes, direction writes update the value, writing the value of an input
//! fails, and so on.  Every primitive operation is recorded as an [`Event`] so tests can
//! assert on exactly what reached the "kernel".

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    io,
    rc::Rc,
};

use bstr::ByteSlice;
use nix::errno::Errno;

use super::{Access, Attribute, Node, SysfsAccess};

/// Which optional nodes a line exposes once exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLine {
    pub direction: bool,
    pub edge: bool,
}

impl MockLine {
    pub const FULL: Self = Self {
        direction: true,
        edge: true,
    };
    pub const FIXED: Self = Self {
        direction: false,
        edge: false,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Probe {
        line: u32,
        attribute: Attribute,
    },
    Export(u32),
    Unexport(u32),
    Open {
        line: u32,
        attribute: Attribute,
        access: Access,
    },
    SetAccess {
        line: u32,
        attribute: Attribute,
        access: Access,
    },
    Read {
        line: u32,
        attribute: Attribute,
    },
    Write {
        line: u32,
        attribute: Attribute,
        data: Vec<u8>,
    },
    Close {
        line: u32,
        attribute: Attribute,
    },
}

/// A failure to inject into the next matching operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fault {
    Probe(u32, Attribute),
    Export(u32),
    Unexport(u32),
    Open(u32, Attribute),
    /// Changing the access mode of an open node fails and leaves it as it was
    SetAccess(u32, Attribute),
    Write(u32, Attribute),
    /// Reads of the node return nothing
    ShortRead(u32, Attribute),
}

#[derive(Debug, Default)]
struct State {
    lines: BTreeMap<u32, MockLine>,
    exported: BTreeMap<u32, BTreeMap<Attribute, Vec<u8>>>,
    faults: BTreeSet<Fault>,
    events: Vec<Event>,
}

impl State {
    fn node(&mut self, line: u32, attribute: Attribute) -> io::Result<&mut Vec<u8>> {
        self.exported
            .get_mut(&line)
            .and_then(|nodes| nodes.get_mut(&attribute))
            .ok_or_else(|| Errno::ENOENT.into())
    }

    fn fault(&self, fault: Fault) -> io::Result<()> {
        if self.faults.contains(&fault) {
            Err(Errno::EIO.into())
        } else {
            Ok(())
        }
    }

    fn store(&mut self, line: u32, attribute: Attribute, data: &[u8]) -> io::Result<()> {
        let text = data.trim_end_with(|c| c == '\n' || c == '\0');
        match attribute {
            Attribute::Value | Attribute::ActiveLow => {
                let bit: &[u8] = match text {
                    b"0" => &b"0\n"[..],
                    b"1" => &b"1\n"[..],
                    _ => return Err(Errno::EINVAL.into()),
                };
                let is_input = self
                    .exported
                    .get(&line)
                    .and_then(|nodes| nodes.get(&Attribute::Direction))
                    .is_some_and(|dir| dir.starts_with(b"in"));
                if attribute == Attribute::Value && is_input {
                    return Err(Errno::EPERM.into());
                }
                *self.node(line, attribute)? = bit.to_vec();
            }
            Attribute::Direction => {
                let (dir, level): (&[u8], Option<&[u8]>) = match text {
                    b"in" => (&b"in\n"[..], None),
                    b"out" | b"low" => (&b"out\n"[..], Some(&b"0\n"[..])),
                    b"high" => (&b"out\n"[..], Some(&b"1\n"[..])),
                    _ => return Err(Errno::EINVAL.into()),
                };
                *self.node(line, Attribute::Direction)? = dir.to_vec();
                if let Some(level) = level {
                    *self.node(line, Attribute::Value)? = level.to_vec();
                }
            }
            Attribute::Edge => {
                if !matches!(text, b"none" | b"falling" | b"rising" | b"both") {
                    return Err(Errno::EINVAL.into());
                }
                let mut edge = text.to_vec();
                edge.push(b'\n');
                *self.node(line, Attribute::Edge)? = edge;
            }
        }
        Ok(())
    }
}

/// Kernel emulation shared by every node it hands out
#[derive(Debug, Clone, Default)]
pub struct MockSysfs {
    state: Rc<RefCell<State>>,
}

impl MockSysfs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `line` exportable with the given capabilities.
    pub fn with_line(self, line: u32, caps: MockLine) -> Self {
        self.state.borrow_mut().lines.insert(line, caps);
        self
    }

    /// Make `line` exportable and export it, as if another process had.
    pub fn with_exported(self, line: u32, caps: MockLine) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.lines.insert(line, caps);
            state.exported.insert(line, Self::fresh_nodes(caps));
        }
        self
    }

    pub fn inject(&self, fault: Fault) {
        self.state.borrow_mut().faults.insert(fault);
    }

    pub fn clear(&self, fault: Fault) {
        self.state.borrow_mut().faults.remove(&fault);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn exported(&self, line: u32) -> bool {
        self.state.borrow().exported.contains_key(&line)
    }

    /// Contents of a node, `None` if it does not exist
    pub fn contents(&self, line: u32, attribute: Attribute) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        state.exported.get(&line)?.get(&attribute).cloned()
    }

    /// Overwrite a node as the hardware would, bypassing the kernel's checks.
    pub fn set_contents(&self, line: u32, attribute: Attribute, data: &[u8]) {
        if let Some(node) = self
            .state
            .borrow_mut()
            .exported
            .get_mut(&line)
            .and_then(|nodes| nodes.get_mut(&attribute))
        {
            *node = data.to_vec();
        }
    }

    fn fresh_nodes(caps: MockLine) -> BTreeMap<Attribute, Vec<u8>> {
        let mut nodes = BTreeMap::new();
        nodes.insert(Attribute::Value, b"0\n".to_vec());
        nodes.insert(Attribute::ActiveLow, b"0\n".to_vec());
        if caps.direction {
            nodes.insert(Attribute::Direction, b"in\n".to_vec());
        }
        if caps.edge {
            nodes.insert(Attribute::Edge, b"none\n".to_vec());
        }
        nodes
    }
}

impl SysfsAccess for MockSysfs {
    type Node = MockNode;

    fn exists(&self, line: u32, attribute: Attribute) -> io::Result<bool> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Probe { line, attribute });
        state.fault(Fault::Probe(line, attribute))?;
        Ok(state
            .exported
            .get(&line)
            .is_some_and(|nodes| nodes.contains_key(&attribute)))
    }

    fn open(&self, line: u32, attribute: Attribute, access: Access) -> io::Result<MockNode> {
        let mut state = self.state.borrow_mut();
        state.fault(Fault::Open(line, attribute))?;
        state.node(line, attribute)?;
        state.events.push(Event::Open {
            line,
            attribute,
            access,
        });
        Ok(MockNode {
            state: Rc::clone(&self.state),
            line,
            attribute,
            access,
        })
    }

    fn export(&self, line: u32) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Export(line));
        state.fault(Fault::Export(line))?;
        let caps = *state.lines.get(&line).ok_or(Errno::EINVAL)?;
        if state.exported.contains_key(&line) {
            return Err(Errno::EBUSY.into());
        }
        state.exported.insert(line, Self::fresh_nodes(caps));
        Ok(())
    }

    fn unexport(&self, line: u32) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Unexport(line));
        state.fault(Fault::Unexport(line))?;
        state
            .exported
            .remove(&line)
            .map(drop)
            .ok_or_else(|| Errno::EINVAL.into())
    }
}

/// A node handed out by [`MockSysfs`]
#[derive(Debug)]
pub struct MockNode {
    state: Rc<RefCell<State>>,
    line: u32,
    attribute: Attribute,
    access: Access,
}

impl Node for MockNode {
    fn access(&self) -> Access {
        self.access
    }

    fn set_access(&mut self, access: Access) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::SetAccess {
            line: self.line,
            attribute: self.attribute,
            access,
        });
        state.fault(Fault::SetAccess(self.line, self.attribute))?;
        self.access = access;
        Ok(())
    }

    fn read_from_start(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Read {
            line: self.line,
            attribute: self.attribute,
        });
        if !self.access.is_readable() {
            return Err(Errno::EBADF.into());
        }
        if state.faults.contains(&Fault::ShortRead(self.line, self.attribute)) {
            return Ok(0);
        }
        // Unexported nodes disappear under open descriptors
        let data = state.node(self.line, self.attribute).map_err(|_| Errno::ENODEV)?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn write_from_start(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::Write {
            line: self.line,
            attribute: self.attribute,
            data: buf.to_vec(),
        });
        if !self.access.is_writable() {
            return Err(Errno::EBADF.into());
        }
        state.fault(Fault::Write(self.line, self.attribute))?;
        state.store(self.line, self.attribute, buf)?;
        Ok(buf.len())
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.events.push(Event::Close {
                line: self.line,
                attribute: self.attribute,
            });
        }
    }
}
