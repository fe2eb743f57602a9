//! Error type shared by every operation in the crate.
//!
//! Each error names the line it happened on, the attribute node involved (if any) and
//! the kind of failure, so callers can decide whether to retry, abort or report.

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IOError;

use crate::line::trigger::UnrecognizedTrigger;
use crate::sysfs::Attribute;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    line: u32,
    attribute: Option<Attribute>,
    kind: ErrorKind,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An existence or capability check failed for a reason other than "not found"
    #[error("probe failed: {0}")]
    ProbeFailed(#[source] IOError),
    #[error("export failed: {0}")]
    ExportFailed(#[source] IOError),
    #[error("unexport failed: {0}")]
    UnexportFailed(#[source] IOError),
    #[error(transparent)]
    UnrecognizedTrigger(#[from] UnrecognizedTrigger),
    #[error("handle is not open")]
    NotOpen,
    /// The line does not expose the attribute at all
    #[error("attribute is not alterable on this line")]
    Unsupported,
    #[error("incomplete transfer: {transferred} of {expected} bytes")]
    IncompleteTransfer { expected: usize, transferred: usize },
    #[error("unexpected contents {0:?}")]
    Malformed(String),
    #[error(transparent)]
    Io(IOError),
}

impl Error {
    pub(crate) const fn new(line: u32, kind: ErrorKind) -> Self {
        Self {
            line,
            attribute: None,
            kind,
        }
    }

    pub(crate) const fn on(line: u32, attribute: Attribute, kind: ErrorKind) -> Self {
        Self {
            line,
            attribute: Some(attribute),
            kind,
        }
    }

    /// The line number the failing operation targeted
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// The attribute node involved, `None` for export control operations
    pub const fn attribute(&self) -> Option<Attribute> {
        self.attribute
    }

    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.attribute {
            Some(attribute) => write!(f, "gpio{}/{}: {}", self.line, attribute, self.kind),
            None => write!(f, "gpio{}: {}", self.line, self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::ProbeFailed(err)
            | ErrorKind::ExportFailed(err)
            | ErrorKind::UnexportFailed(err)
            | ErrorKind::Io(err) => Some(err),
            ErrorKind::UnrecognizedTrigger(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Error> for IOError {
    fn from(err: Error) -> Self {
        let kind = match &err.kind {
            ErrorKind::ProbeFailed(e)
            | ErrorKind::ExportFailed(e)
            | ErrorKind::UnexportFailed(e)
            | ErrorKind::Io(e) => e.kind(),
            ErrorKind::UnrecognizedTrigger(_) | ErrorKind::Malformed(_) => {
                std::io::ErrorKind::InvalidData
            }
            ErrorKind::NotOpen => std::io::ErrorKind::NotConnected,
            ErrorKind::Unsupported => std::io::ErrorKind::Unsupported,
            ErrorKind::IncompleteTransfer { .. } => std::io::ErrorKind::UnexpectedEof,
        };
        IOError::new(kind, err)
    }
}
