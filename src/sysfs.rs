// Copyright (c) 2024 The rust-gpio-sysfs Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Access to the kernel's GPIO pseudo-files.
//!
//! The kernel lays the interface out under a fixed root:
//!
//! ```text
//! <root>/export              write-only: "<N>\n" exports line N
//! <root>/unexport            write-only: "<N>\n" reverses the export
//! <root>/gpio<N>/direction   "in" | "out" | "high" | "low" (absent if not alterable)
//! <root>/gpio<N>/active_low  "0" | "1"
//! <root>/gpio<N>/value       "0" | "1"
//! <root>/gpio<N>/edge        "none" | "falling" | "rising" | "both" (absent if not alterable)
//! ```
//!
//! [`SysfsAccess`] is the seam between the line lifecycle and those files.  [`Sysfs`]
//! talks to the real filesystem; the `mock` module (feature `mock`) emulates the kernel
//! in memory.

use std::{
    fmt::Write as _,
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    os::{
        fd::{AsFd, AsRawFd, BorrowedFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    path::{Path, PathBuf},
};

use crate::{
    errors::Result,
    line::{
        array, oneshot, Direction, Level, Line, LineArray, LineConfig, LineRequest, Trigger,
    },
};

#[cfg(any(test, feature = "mock"))]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

/// Where the kernel mounts the GPIO class directory
pub const DEFAULT_ROOT: &str = "/sys/class/gpio";

/// Environment variable consulted by [`Sysfs::from_env`]
pub const ROOT_ENV: &str = "GPIO_SYSFS_ROOT";

/// One of the per-line attribute nodes below `gpio<N>/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Value,
    ActiveLow,
    Direction,
    Edge,
}

impl Attribute {
    pub const fn file_name(self) -> &'static str {
        match self {
            Attribute::Value => "value",
            Attribute::ActiveLow => "active_low",
            Attribute::Direction => "direction",
            Attribute::Edge => "edge",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub const fn is_readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }

    fn options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        opts.read(self.is_readable()).write(self.is_writable());
        opts
    }
}

/// An open attribute node
///
/// Attribute nodes reflect the current state of the hardware rather than a stream, so
/// every transfer starts at offset zero.
pub trait Node {
    fn access(&self) -> Access;

    /// Change the access mode of this handle without the caller closing it.
    fn set_access(&mut self, access: Access) -> io::Result<()>;

    /// Read from the start of the node until `buf` is full or the node is exhausted.
    fn read_from_start(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write `buf` from the start of the node, returning how much the node accepted.
    fn write_from_start(&mut self, buf: &[u8]) -> io::Result<usize>;
}

/// Primitive operations against the GPIO class directory
///
/// Lines and line arrays are requested through the provided methods.  The provided
/// `get_*`/`set_*` methods are stateless: each opens the node, transfers once and closes
/// it again, without exporting the line or checking who owns it.
pub trait SysfsAccess {
    type Node: Node;

    /// Check whether `attribute` of `line` exists.
    ///
    /// A missing node is `Ok(false)`; any other failure is returned.
    fn exists(&self, line: u32, attribute: Attribute) -> io::Result<bool>;

    fn open(&self, line: u32, attribute: Attribute, access: Access) -> io::Result<Self::Node>;

    fn export(&self, line: u32) -> io::Result<()>;

    fn unexport(&self, line: u32) -> io::Result<()>;

    /// Open, read and close `attribute` in one go.
    fn read(&self, line: u32, attribute: Attribute, buf: &mut [u8]) -> io::Result<usize> {
        self.open(line, attribute, Access::ReadOnly)?
            .read_from_start(buf)
    }

    /// Open, write and close `attribute` in one go.
    fn write(&self, line: u32, attribute: Attribute, buf: &[u8]) -> io::Result<usize> {
        self.open(line, attribute, Access::WriteOnly)?
            .write_from_start(buf)
    }

    /// Is `line` currently exported (does its `value` node exist)?
    fn is_exported(&self, line: u32) -> io::Result<bool> {
        self.exists(line, Attribute::Value)
    }

    /// Does the exported `line` have a `direction` node?
    fn alterable_direction(&self, line: u32) -> Result<bool> {
        oneshot::probe(self, line, Attribute::Direction)
    }

    /// Does the exported `line` have an `edge` node?
    fn alterable_edge(&self, line: u32) -> Result<bool> {
        oneshot::probe(self, line, Attribute::Edge)
    }

    fn get_direction(&self, line: u32) -> Result<Direction> {
        oneshot::get_direction(self, line)
    }

    fn set_direction_input(&self, line: u32) -> Result<()> {
        oneshot::write_text(self, line, Attribute::Direction, b"in")
    }

    /// Switch `line` to output, driving `level` from the moment it switches.
    fn set_direction_output(&self, line: u32, level: Level) -> Result<()> {
        oneshot::write_text(self, line, Attribute::Direction, oneshot::output_word(level))
    }

    fn get_value(&self, line: u32) -> Result<Level> {
        oneshot::read_digit(self, line, Attribute::Value).map(Level::new)
    }

    fn set_value(&self, line: u32, level: Level) -> Result<()> {
        oneshot::write_text(self, line, Attribute::Value, &[level.digit()])
    }

    fn get_active_low(&self, line: u32) -> Result<bool> {
        oneshot::read_digit(self, line, Attribute::ActiveLow)
    }

    fn set_active_low(&self, line: u32, active_low: bool) -> Result<()> {
        oneshot::write_text(
            self,
            line,
            Attribute::ActiveLow,
            &oneshot::digit_text(active_low),
        )
    }

    fn get_edge(&self, line: u32) -> Result<Trigger> {
        oneshot::get_edge(self, line)
    }

    fn set_edge(&self, line: u32, trigger: Trigger) -> Result<()> {
        oneshot::write_text(self, line, Attribute::Edge, trigger.name().as_bytes())
    }

    /// Acquire `line`, exporting it if nobody has yet.
    ///
    /// No handles are opened; see [`Line::open`].
    #[inline(always)]
    fn request(&self, line: u32, label: &str) -> Result<Line<'_, Self>>
    where
        Self: Sized,
    {
        Line::request(self, line, label)
    }

    /// Acquire `line` and apply `config` to it.
    ///
    /// If configuring fails, an export performed by this call is undone.
    #[inline(always)]
    fn request_one(&self, line: u32, config: LineConfig, label: &str) -> Result<Line<'_, Self>>
    where
        Self: Sized,
    {
        Line::request_one(self, line, config, label)
    }

    /// Acquire every line in `requests` in order, or none of them.
    #[inline(always)]
    fn request_array(
        &self,
        requests: &[LineRequest<'_>],
    ) -> std::result::Result<LineArray<'_, Self>, array::ArrayError>
    where
        Self: Sized,
    {
        LineArray::request(self, requests)
    }
}

/// The kernel's GPIO sysfs interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    /// Use the interface at [`DEFAULT_ROOT`]
    pub fn new() -> Self {
        Self::with_root(DEFAULT_ROOT)
    }

    /// Use a GPIO class directory mounted somewhere other than [`DEFAULT_ROOT`]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Use the root named by `GPIO_SYSFS_ROOT`, falling back to [`DEFAULT_ROOT`]
    pub fn from_env() -> Self {
        match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => Self::with_root(root),
            _ => Self::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn line_dir(&self, line: u32) -> PathBuf {
        self.root.join(format!("gpio{line}"))
    }

    pub fn attribute_path(&self, line: u32, attribute: Attribute) -> PathBuf {
        self.line_dir(line).join(attribute.file_name())
    }

    fn write_control(&self, node: &str, line: u32) -> io::Result<()> {
        let mut text: heapless::String<16> = heapless::String::new();
        writeln!(text, "{line}").map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "line number does not fit")
        })?;

        let mut file = OpenOptions::new().write(true).open(self.root.join(node))?;
        let written = write_retrying(&mut file, text.as_bytes())?;
        if written != text.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("{node} accepted {written} of {} bytes", text.len()),
            ));
        }
        Ok(())
    }
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsAccess for Sysfs {
    type Node = SysfsNode;

    fn exists(&self, line: u32, attribute: Attribute) -> io::Result<bool> {
        match File::open(self.attribute_path(line, attribute)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn open(&self, line: u32, attribute: Attribute, access: Access) -> io::Result<SysfsNode> {
        SysfsNode::open(self.attribute_path(line, attribute), access)
    }

    fn export(&self, line: u32) -> io::Result<()> {
        self.write_control("export", line)
    }

    fn unexport(&self, line: u32) -> io::Result<()> {
        self.write_control("unexport", line)
    }
}

/// An attribute node opened through [`Sysfs`]
///
/// The descriptor is non-blocking at the OS level.
#[derive(Debug)]
pub struct SysfsNode {
    path: PathBuf,
    file: File,
    access: Access,
}

impl SysfsNode {
    fn open(path: PathBuf, access: Access) -> io::Result<Self> {
        let file = access
            .options()
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)?;
        Ok(Self { path, file, access })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Node for SysfsNode {
    fn access(&self) -> Access {
        self.access
    }

    /// Linux ignores access mode bits in `F_SETFL`, so the node is opened again with the
    /// new mode and the descriptor replaced. The old descriptor stays in place if the
    /// open fails.
    fn set_access(&mut self, access: Access) -> io::Result<()> {
        if access == self.access {
            return Ok(());
        }
        let Self { file, .. } = Self::open(self.path.clone(), access)?;
        self.file = file;
        self.access = access;
        Ok(())
    }

    fn read_from_start(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(0))?;
        read_retrying(&mut self.file, buf)
    }

    fn write_from_start(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(0))?;
        write_retrying(&mut self.file, buf)
    }
}

impl AsRawFd for SysfsNode {
    #[inline(always)]
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for SysfsNode {
    #[inline(always)]
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

#[inline]
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Read until `buf` is full or EOF, retrying interrupted and would-block reads.
pub(crate) fn read_retrying(src: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match src.read(&mut buf[n..]) {
            Ok(0) => break,
            Ok(read) => n += read,
            Err(e) if is_transient(&e) => (),
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}

/// Write all of `buf`, retrying interrupted and would-block writes.
///
/// Stops early if the destination accepts nothing.
pub(crate) fn write_retrying(dst: &mut impl Write, buf: &[u8]) -> io::Result<usize> {
    let mut n = 0;
    while n < buf.len() {
        match dst.write(&buf[n..]) {
            Ok(0) => break,
            Ok(written) => n += written,
            Err(e) if is_transient(&e) => (),
            Err(e) => return Err(e),
        }
    }
    Ok(n)
}
