//! Requesting several lines as a unit.

use log::{debug, warn};

use super::{Line, LineConfig};
use crate::{errors::Error, sysfs::SysfsAccess};

/// One entry of a [`LineArray::request`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest<'s> {
    pub line: u32,
    pub config: LineConfig,
    pub label: &'s str,
}

impl<'s> LineRequest<'s> {
    pub fn new(line: u32, config: impl Into<LineConfig>, label: &'s str) -> Self {
        Self {
            line,
            config: config.into(),
            label,
        }
    }
}

/// A request in a [`LineArray::request`] call failed
///
/// Every line requested before `index` has been released again.
#[derive(Debug, thiserror::Error)]
#[error("requesting line array entry {index} failed: {error}")]
pub struct ArrayError {
    pub index: usize,
    #[source]
    pub error: Error,
}

/// Lines acquired together, in request order
#[derive(Debug)]
pub struct LineArray<'a, A: SysfsAccess> {
    lines: Vec<Line<'a, A>>,
}

impl<'a, A: SysfsAccess> LineArray<'a, A> {
    /// Request and configure every entry of `requests` in order.
    ///
    /// On the first failure the lines already acquired are released, last acquired
    /// first, and the failing entry's index is returned with its error.  Entries after it
    /// are never attempted.
    pub fn request(sysfs: &'a A, requests: &[LineRequest<'_>]) -> Result<Self, ArrayError> {
        let mut lines = Vec::with_capacity(requests.len());

        for (index, req) in requests.iter().enumerate() {
            match Line::request_one(sysfs, req.line, req.config, req.label) {
                Ok(line) => lines.push(line),
                Err(error) => {
                    warn!(
                        "line array entry {index} (gpio{}) failed, unwinding {} lines",
                        req.line,
                        lines.len()
                    );
                    free_array(lines);
                    return Err(ArrayError { index, error });
                }
            }
        }

        debug!("requested line array of {} lines", lines.len());
        Ok(Self { lines })
    }

    /// Release every line, last first, ignoring individual failures.
    pub fn free(self) {
        free_array(self.lines)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Line<'a, A>> {
        self.lines.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Line<'a, A>> {
        self.lines.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Line<'a, A>> {
        self.lines.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Line<'a, A>> {
        self.lines.iter_mut()
    }

    /// Take the lines out; releasing them becomes the caller's job.
    pub fn into_lines(self) -> Vec<Line<'a, A>> {
        self.lines
    }
}

impl<'a, 'b, A: SysfsAccess> IntoIterator for &'b LineArray<'a, A> {
    type Item = &'b Line<'a, A>;
    type IntoIter = std::slice::Iter<'b, Line<'a, A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 'b, A: SysfsAccess> IntoIterator for &'b mut LineArray<'a, A> {
    type Item = &'b mut Line<'a, A>;
    type IntoIter = std::slice::IterMut<'b, Line<'a, A>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Release every line in `lines`, last first, ignoring individual failures.
pub fn free_array<A: SysfsAccess>(mut lines: Vec<Line<'_, A>>) {
    while let Some(mut line) = lines.pop() {
        if let Err(e) = line.release() {
            warn!("releasing gpio{} failed: {e}", line.line());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::ErrorKind,
        line::{Level, RequestFlags, Trigger},
        sysfs::{
            mock::{Event, Fault, MockLine, MockSysfs},
            Attribute,
        },
    };

    fn sysfs() -> MockSysfs {
        MockSysfs::new()
            .with_line(1, MockLine::FULL)
            .with_line(2, MockLine::FULL)
            .with_line(3, MockLine::FULL)
    }

    fn control_events(sysfs: &MockSysfs) -> Vec<Event> {
        sysfs
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Export(_) | Event::Unexport(_)))
            .collect()
    }

    #[test]
    fn requests_every_line_in_order() {
        let sysfs = sysfs();
        let requests = [
            LineRequest::new(1, RequestFlags::IN, "button"),
            LineRequest::new(2, RequestFlags::OUT_INIT_HIGH, "led"),
            LineRequest::new(3, LineConfig::input().with_trigger(Trigger::Both), "irq"),
        ];
        let mut array = LineArray::request(&sysfs, &requests).unwrap();

        assert_eq!(array.len(), 3);
        let lines: Vec<_> = array.iter().map(|l| l.line()).collect();
        assert_eq!(lines, [1, 2, 3]);
        assert_eq!(array.get(2).unwrap().trigger(), Some(Trigger::Both));
        assert_eq!(sysfs.contents(2, Attribute::Value).unwrap(), b"1\n");

        let led = array.get_mut(1).unwrap();
        led.open().unwrap();
        led.set_value(Level::Low).unwrap();

        array.free();
        assert_eq!(
            control_events(&sysfs),
            [
                Event::Export(1),
                Event::Export(2),
                Event::Export(3),
                Event::Unexport(3),
                Event::Unexport(2),
                Event::Unexport(1),
            ]
        );
    }

    #[test]
    fn failure_unwinds_in_reverse() {
        let sysfs = sysfs();
        sysfs.inject(Fault::Write(2, Attribute::Direction));
        let requests = [
            LineRequest::new(1, RequestFlags::IN, ""),
            LineRequest::new(2, RequestFlags::IN, ""),
            LineRequest::new(3, RequestFlags::IN, ""),
        ];

        let err = sysfs.request_array(&requests).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.error.line(), 2);
        assert!(matches!(err.error.kind(), ErrorKind::Io(_)));

        assert!(!sysfs.exported(1));
        assert!(!sysfs.exported(2));
        assert!(!sysfs.exported(3));
        assert_eq!(
            control_events(&sysfs),
            [
                Event::Export(1),
                Event::Export(2),
                Event::Unexport(2),
                Event::Unexport(1),
            ]
        );
    }

    #[test]
    fn unwind_leaves_foreign_exports() {
        let sysfs = sysfs().with_exported(4, MockLine::FULL);
        sysfs.inject(Fault::Export(3));
        let requests = [
            LineRequest::new(4, RequestFlags::IN, ""),
            LineRequest::new(1, RequestFlags::IN, ""),
            LineRequest::new(3, RequestFlags::IN, ""),
        ];

        let err = LineArray::request(&sysfs, &requests).unwrap_err();
        assert_eq!(err.index, 2);
        assert!(matches!(err.error.kind(), ErrorKind::ExportFailed(_)));
        assert!(sysfs.exported(4));
        assert!(!sysfs.exported(1));
    }

    #[test]
    fn free_continues_past_failures() {
        let sysfs = sysfs();
        let requests = [
            LineRequest::new(1, RequestFlags::IN, ""),
            LineRequest::new(2, RequestFlags::IN, ""),
            LineRequest::new(3, RequestFlags::IN, ""),
        ];
        let array = LineArray::request(&sysfs, &requests).unwrap();
        sysfs.inject(Fault::Unexport(2));

        free_array(array.into_lines());
        assert!(!sysfs.exported(1));
        assert!(sysfs.exported(2));
        assert!(!sysfs.exported(3));
    }

    #[test]
    fn empty_request_is_empty_array() {
        let sysfs = sysfs();
        let array = LineArray::request(&sysfs, &[]).unwrap();
        assert!(array.is_empty());
        array.free();
        assert!(sysfs.events().is_empty());
    }
}
