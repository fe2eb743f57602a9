//! Typed transfers that open a node, use it once and close it again.
//!
//! These back the stateless per-line operations of [`SysfsAccess`] as well as the probing
//! and configuring a [`Line`](super::Line) does before it holds any handles.

use bstr::ByteSlice;

use super::{Direction, Level, Trigger};
use crate::{
    errors::{Error, ErrorKind, Result},
    sysfs::{Attribute, SysfsAccess},
};

/// Longest content of any attribute node, with its newline
pub(crate) const NODE_TEXT_MAX: usize = 16;

pub(crate) type NodeText = heapless::Vec<u8, NODE_TEXT_MAX>;

pub(crate) fn probe<A: SysfsAccess + ?Sized>(
    sysfs: &A,
    line: u32,
    attribute: Attribute,
) -> Result<bool> {
    sysfs
        .exists(line, attribute)
        .map_err(|e| Error::on(line, attribute, ErrorKind::ProbeFailed(e)))
}

pub(crate) fn read_text<A: SysfsAccess + ?Sized>(
    sysfs: &A,
    line: u32,
    attribute: Attribute,
) -> Result<NodeText> {
    let mut buf = [0; NODE_TEXT_MAX];
    let n = sysfs
        .read(line, attribute, &mut buf)
        .map_err(|e| Error::on(line, attribute, ErrorKind::Io(e)))?;
    node_text(line, attribute, &buf[..n])
}

pub(crate) fn write_text<A: SysfsAccess + ?Sized>(
    sysfs: &A,
    line: u32,
    attribute: Attribute,
    text: &[u8],
) -> Result<()> {
    let n = sysfs
        .write(line, attribute, text)
        .map_err(|e| Error::on(line, attribute, ErrorKind::Io(e)))?;
    check_written(line, attribute, text, n)
}

pub(crate) fn read_digit<A: SysfsAccess + ?Sized>(
    sysfs: &A,
    line: u32,
    attribute: Attribute,
) -> Result<bool> {
    let mut buf = [0; 1];
    let n = sysfs
        .read(line, attribute, &mut buf)
        .map_err(|e| Error::on(line, attribute, ErrorKind::Io(e)))?;
    parse_digit(line, attribute, &buf[..n])
}

pub(crate) fn get_direction<A: SysfsAccess + ?Sized>(sysfs: &A, line: u32) -> Result<Direction> {
    let text = read_text(sysfs, line, Attribute::Direction)?;
    parse_direction(line, &text)
}

pub(crate) fn get_edge<A: SysfsAccess + ?Sized>(sysfs: &A, line: u32) -> Result<Trigger> {
    let text = read_text(sysfs, line, Attribute::Edge)?;
    Trigger::decode(&text).map_err(|e| Error::on(line, Attribute::Edge, e.into()))
}

/// A single `0`/`1` digit; whatever follows it is ignored.
pub(crate) fn parse_digit(line: u32, attribute: Attribute, read: &[u8]) -> Result<bool> {
    match read.first() {
        None => Err(Error::on(
            line,
            attribute,
            ErrorKind::IncompleteTransfer {
                expected: 1,
                transferred: 0,
            },
        )),
        Some(b'0') => Ok(false),
        Some(b'1') => Ok(true),
        Some(&other) => Err(Error::on(
            line,
            attribute,
            ErrorKind::Malformed(char::from(other).to_string()),
        )),
    }
}

pub(crate) fn parse_direction(line: u32, text: &[u8]) -> Result<Direction> {
    let word = text.trim_end();
    match word {
        b"in" => Ok(Direction::Input),
        b"out" | b"low" | b"high" => Ok(Direction::Output),
        _ => Err(Error::on(
            line,
            Attribute::Direction,
            ErrorKind::Malformed(word.to_str_lossy().into_owned()),
        )),
    }
}

pub(crate) fn node_text(line: u32, attribute: Attribute, read: &[u8]) -> Result<NodeText> {
    if read.is_empty() {
        return Err(Error::on(
            line,
            attribute,
            ErrorKind::IncompleteTransfer {
                expected: 1,
                transferred: 0,
            },
        ));
    }
    // `read` never exceeds the buffer it came from
    heapless::Vec::from_slice(read).map_err(|()| {
        Error::on(
            line,
            attribute,
            ErrorKind::Malformed(read.to_str_lossy().into()),
        )
    })
}

pub(crate) fn check_written(
    line: u32,
    attribute: Attribute,
    text: &[u8],
    written: usize,
) -> Result<()> {
    if written == text.len() {
        Ok(())
    } else {
        Err(Error::on(
            line,
            attribute,
            ErrorKind::IncompleteTransfer {
                expected: text.len(),
                transferred: written,
            },
        ))
    }
}

/// The direction word that switches a line to output at `level`
pub(crate) fn output_word(level: Level) -> &'static [u8] {
    match level {
        Level::Low => &b"low"[..],
        Level::High => &b"high"[..],
    }
}

pub(crate) fn digit_text(value: bool) -> [u8; 1] {
    [Level::new(value).digit()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::mock::{Event, Fault, MockLine, MockSysfs};

    #[test]
    fn stateless_operations_round_trip() {
        let sysfs = MockSysfs::new().with_exported(12, MockLine::FULL);

        assert!(sysfs.alterable_direction(12).unwrap());
        assert!(sysfs.alterable_edge(12).unwrap());
        assert_eq!(sysfs.get_direction(12).unwrap(), Direction::Input);

        sysfs.set_direction_output(12, Level::High).unwrap();
        assert_eq!(sysfs.get_direction(12).unwrap(), Direction::Output);
        assert_eq!(sysfs.get_value(12).unwrap(), Level::High);
        sysfs.set_value(12, Level::Low).unwrap();
        assert_eq!(sysfs.contents(12, Attribute::Value).unwrap(), b"0\n");

        sysfs.set_active_low(12, true).unwrap();
        assert!(sysfs.get_active_low(12).unwrap());

        sysfs.set_edge(12, Trigger::Falling).unwrap();
        assert_eq!(sysfs.get_edge(12).unwrap(), Trigger::Falling);

        sysfs.set_direction_input(12).unwrap();
        assert_eq!(sysfs.contents(12, Attribute::Direction).unwrap(), b"in\n");
    }

    #[test]
    fn stateless_operations_close_what_they_open() {
        let sysfs = MockSysfs::new().with_exported(12, MockLine::FULL);
        sysfs.clear_events();

        sysfs.get_value(12).unwrap();
        sysfs.set_edge(12, Trigger::Both).unwrap();

        let events = sysfs.events();
        let opens = events
            .iter()
            .filter(|e| matches!(e, Event::Open { .. }))
            .count();
        let closes = events
            .iter()
            .filter(|e| matches!(e, Event::Close { .. }))
            .count();
        assert_eq!((opens, closes), (2, 2));
        assert!(!events.iter().any(|e| matches!(e, Event::Export(_))));
    }

    #[test]
    fn fixed_line_has_no_optional_nodes() {
        let sysfs = MockSysfs::new().with_exported(3, MockLine::FIXED);

        assert!(!sysfs.alterable_direction(3).unwrap());
        assert!(!sysfs.alterable_edge(3).unwrap());

        let err = sysfs.set_edge(3, Trigger::Rising).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
        assert_eq!(err.attribute(), Some(Attribute::Edge));
    }

    #[test]
    fn probe_errors_are_not_absence() {
        let sysfs = MockSysfs::new().with_exported(3, MockLine::FULL);
        sysfs.inject(Fault::Probe(3, Attribute::Edge));

        let err = sysfs.alterable_edge(3).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ProbeFailed(_)));
    }

    #[test]
    fn unreadable_contents_are_errors() {
        let sysfs = MockSysfs::new().with_exported(4, MockLine::FULL);

        sysfs.set_contents(4, Attribute::Direction, b"sideways\n");
        assert!(matches!(
            sysfs.get_direction(4).unwrap_err().kind(),
            ErrorKind::Malformed(_)
        ));

        sysfs.set_contents(4, Attribute::Edge, b"up\n");
        assert!(matches!(
            sysfs.get_edge(4).unwrap_err().kind(),
            ErrorKind::UnrecognizedTrigger(_)
        ));

        sysfs.inject(Fault::ShortRead(4, Attribute::ActiveLow));
        assert!(matches!(
            sysfs.get_active_low(4).unwrap_err().kind(),
            ErrorKind::IncompleteTransfer {
                expected: 1,
                transferred: 0
            }
        ));
    }

    #[test]
    fn value_of_input_cannot_be_written() {
        let sysfs = MockSysfs::new().with_exported(4, MockLine::FULL);
        let err = sysfs.set_value(4, Level::High).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
        assert_eq!(err.attribute(), Some(Attribute::Value));
    }

    #[test]
    fn parse_direction_accepts_kernel_words() {
        assert_eq!(parse_direction(0, b"in\n").unwrap(), Direction::Input);
        for word in [&b"out\n"[..], b"low", b"high\n"] {
            assert_eq!(parse_direction(0, word).unwrap(), Direction::Output);
        }
        assert!(parse_direction(0, b"").is_err());
    }
}
