//! Error types for seglog.

use std::io;
use thiserror::Error;

/// Result type alias for seglog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for log operations.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(String),

    /// The requested offset is not held by the log.
    #[error("offset out of range: {0}")]
    OffsetOutOfRange(u64),

    /// A store or index read reached past the end of its data.
    #[error("end of file")]
    EndOfFile,

    /// The index has no room for another entry.
    #[error("index is full")]
    IndexFull,

    /// Data corruption detected.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// The log (or one of its components) has been closed.
    #[error("log is closed")]
    Closed,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl Error {
    /// Create a corruption error with the given message.
    pub fn corruption<S: Into<String>>(msg: S) -> Self {
        Error::Corruption(msg.into())
    }

    /// Create an internal error.
    pub(crate) fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error indicates corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }

    /// Check if this error means the requested offset is not in the log.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::OffsetOutOfRange(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::OffsetOutOfRange(42);
        assert_eq!(format!("{}", err), "offset out of range: 42");

        let err = Error::corruption("bad frame");
        assert_eq!(format!("{}", err), "corruption detected: bad frame");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::corruption("bad").is_corruption());
        assert!(!Error::EndOfFile.is_corruption());
        assert!(Error::OffsetOutOfRange(0).is_out_of_range());
        assert!(!Error::IndexFull.is_out_of_range());
    }
}
