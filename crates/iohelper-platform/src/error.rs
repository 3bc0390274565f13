use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsError>;

/// Failure of a single filesystem operation, classified for the caller.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path does not exist, or is not the kind the operation expects
    /// (a directory where a file was required, or the reverse).
    #[error("not found: {path}")]
    NotFound { path: String },
    /// Directory creation target already exists.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },
    #[error("i/o error on {path}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Payload-free view of [`FsError`] for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    NotFound,
    AlreadyExists,
    Io,
}

impl FsError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `io::Error`, promoting `ErrorKind::NotFound` to [`FsError::NotFound`].
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::not_found(path)
        } else {
            Self::io(path, source)
        }
    }

    pub fn kind(&self) -> FsErrorKind {
        match self {
            Self::NotFound { .. } => FsErrorKind::NotFound,
            Self::AlreadyExists { .. } => FsErrorKind::AlreadyExists,
            Self::Io { .. } => FsErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FsErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == FsErrorKind::AlreadyExists
    }

    /// The path the failed operation was acting on.
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path } | Self::AlreadyExists { path } | Self::Io { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_from_io_promotes_not_found() {
        let err = FsError::from_io("a.txt", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), FsErrorKind::NotFound);
        assert_eq!(err.path(), "a.txt");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_io_keeps_other_kinds_as_io() {
        let err = FsError::from_io("a.txt", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), FsErrorKind::Io);
        let source = err.source().unwrap();
        assert!(source.to_string().to_lowercase().contains("permission"));
    }

    #[test]
    fn test_already_exists_is_distinct() {
        let err = FsError::already_exists("tmp");
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "already exists: tmp");
    }
}
