use std::{io, path::PathBuf};

/// Error type shared by the core crate and the `trxsh` binary.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// File system I/O failure.
    #[error("I/O error while accessing {0}")]
    Io(PathBuf, #[source] io::Error),

    /// A path could not be made absolute or could not be inspected.
    #[error("cannot resolve path {0}")]
    PathResolution(PathBuf, #[source] io::Error),

    /// A path is invalid for the current operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An encoded trash name does not follow the `name__dir__stamp#n` layout.
    #[error("invalid encoded name: {0}")]
    InvalidToken(String),

    /// No live record carries this id.
    #[error("record with ID {0} not found")]
    RecordNotFound(u64),

    /// The registry file exists but cannot be parsed.
    #[error("registry file {0} is corrupt")]
    RegistryCorrupt(PathBuf, #[source] serde_json::Error),

    /// A metadata file lacks the mandatory `Path=` line.
    #[error("trash info file {0} has no Path entry")]
    InvalidTrashInfo(PathBuf),

    /// Mount point lookup failed.
    #[error("volume lookup failed: {0}")]
    VolumeLookup(String),

    /// A required input is missing.
    #[error("missing required value: {0}")]
    MissingValue(String),

    /// An operation was rejected due to configuration/argument issues.
    #[error("invalid command input: {0}")]
    InvalidInput(String),

    /// A cross-device move copied the object but could not remove the
    /// source. The copy at the destination is complete; the source may be
    /// partly deleted.
    #[error("copied to {0} but could not remove the source")]
    SourceNotRemoved(PathBuf, #[source] Box<CoreError>),

    /// A conflict prevented the operation from proceeding.
    #[error("resource conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingValue(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid_token(token: impl Into<String>) -> Self {
        Self::InvalidToken(token.into())
    }

    pub fn io(path: impl Into<PathBuf>, error: io::Error) -> Self {
        Self::Io(path.into(), error)
    }

    /// Returns the underlying I/O error, if any.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Io(_, err) | Self::PathResolution(_, err) => Some(err),
            Self::SourceNotRemoved(_, err) => err.io_error(),
            _ => None,
        }
    }
}

/// Shared result alias for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
