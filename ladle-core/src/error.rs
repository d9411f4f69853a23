use crate::Error;
use std::fmt::{self, Display, Formatter};

/// Category of a failure surfaced while opening or reading a cursor.
///
/// The kind travels inside the [`Error`] as context, use [`ErrorKind::of`] to read it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The parameters were rejected before any connection was touched.
    InvalidParameters,
    /// The pool could not hand out a connection.
    AcquisitionFailure,
    /// A connection was acquired but the query could not be started on it.
    CursorCreationFailure,
    /// Row production failed after the cursor was opened.
    StreamFailure,
}

impl ErrorKind {
    pub fn of(error: &Error) -> Option<ErrorKind> {
        error.downcast_ref::<ErrorKind>().copied()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::InvalidParameters => "Invalid query parameters",
            ErrorKind::AcquisitionFailure => "Could not acquire a connection from the pool",
            ErrorKind::CursorCreationFailure => "Could not open a cursor on the connection",
            ErrorKind::StreamFailure => "Error while reading rows from the cursor",
        })
    }
}

/// Normalizes errors coming from the pool or a connection before they reach the caller.
pub trait ErrorFormatter: Send + Sync {
    fn format(&self, kind: ErrorKind, error: Error) -> Error;
}

/// Attaches the [`ErrorKind`] as context and logs the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextFormatter;

impl ErrorFormatter for ContextFormatter {
    fn format(&self, kind: ErrorKind, error: Error) -> Error {
        let error = if ErrorKind::of(&error) == Some(kind) {
            error
        } else {
            error.context(kind)
        };
        log::error!("{:#}", error);
        error
    }
}
