//! Error taxonomy shared by every layer of the client.
//!
//! Transports translate their native failures (io errors, WebHDFS remote
//! exceptions, HTTP statuses) into [`Error`] so callers can branch on
//! [`Error::kind`] without knowing which backend served the request.

use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Flat discriminant of [`Error`], convenient for `match` and assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    InvalidSession,
    NotFound,
    AlreadyExists,
    NotADirectory,
    IsADirectory,
    DirectoryNotEmpty,
    ClosedHandle,
    Unsupported,
    PermissionDenied,
    InvalidArgument,
    Timeout,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("invalid session: {0}")]
    InvalidSession(String),

    #[error("{0}: no such file or directory")]
    NotFound(String),

    #[error("{0}: already exists")]
    AlreadyExists(String),

    #[error("{0}: not a directory")]
    NotADirectory(String),

    #[error("{0}: is a directory")]
    IsADirectory(String),

    #[error("{0}: directory not empty")]
    DirectoryNotEmpty(String),

    #[error("{0}: file handle is closed")]
    ClosedHandle(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("transfer interrupted after {transferred} bytes")]
    Partial {
        transferred: u64,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::InvalidSession(_) => ErrorKind::InvalidSession,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::NotADirectory(_) => ErrorKind::NotADirectory,
            Error::IsADirectory(_) => ErrorKind::IsADirectory,
            Error::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            Error::ClosedHandle(_) => ErrorKind::ClosedHandle,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            Error::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Io(_) => ErrorKind::Io,
            Error::Partial { source, .. } => source.kind(),
        }
    }

    /// Transient failures a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::Timeout | ErrorKind::Io
        )
    }

    /// Bytes moved before the failure, for interrupted transfers.
    pub fn transferred(&self) -> Option<u64> {
        match self {
            Error::Partial { transferred, .. } => Some(*transferred),
            _ => None,
        }
    }

    pub(crate) fn io(msg: impl Into<String>) -> Self {
        Error::Io(io::Error::other(msg.into()))
    }

    /// Wraps `self` with the number of bytes already transferred. A zero
    /// count leaves the error untouched.
    pub(crate) fn after(self, transferred: u64) -> Self {
        if transferred == 0 {
            return self;
        }
        match self {
            Error::Partial { source, .. } => Error::Partial {
                transferred,
                source,
            },
            other => Error::Partial {
                transferred,
                source: Box::new(other),
            },
        }
    }

    /// Translates an io error raised while touching `path`.
    pub(crate) fn from_io(err: io::Error, path: &str) -> Self {
        let path = path.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path),
            io::ErrorKind::AlreadyExists => Error::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(path),
            io::ErrorKind::NotADirectory => Error::NotADirectory(path),
            io::ErrorKind::IsADirectory => Error::IsADirectory(path),
            io::ErrorKind::DirectoryNotEmpty => Error::DirectoryNotEmpty(path),
            io::ErrorKind::TimedOut => Error::Timeout(path),
            _ => Error::Io(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Io(io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
