//! Error types shared by every vfskit crate.

use thiserror::Error;

/// The error type returned by block devices, filesystem backends, and the VFS mediator.
#[derive(Error, Debug)]
pub enum Error {
    /// Device read/write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path component does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Expected a directory, found a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file, found a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Name violates the backend's naming constraints (length, charset).
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// FAT exhausted, or the directory region is full.
    #[error("no space left on device: {0}")]
    NoSpace(String),

    /// Invalid signature, reserved cluster value, or FAT mirror mismatch.
    #[error("corrupt filesystem: {0}")]
    Corrupt(String),

    /// No registered backend recognizes this device.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Malformed textual path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Resource already exists where a fresh one was expected.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Operation is not valid in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with a custom message.
    #[error("{0}")]
    Custom(String),
}

/// Result type alias used throughout vfskit.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a custom error from a string.
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a not-a-directory error.
    pub fn not_a_directory(msg: impl Into<String>) -> Self {
        Error::NotADirectory(msg.into())
    }

    /// Create an is-a-directory error.
    pub fn is_a_directory(msg: impl Into<String>) -> Self {
        Error::IsADirectory(msg.into())
    }

    /// Create an invalid-name error.
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Error::InvalidName(msg.into())
    }

    /// Create a no-space error.
    pub fn no_space(msg: impl Into<String>) -> Self {
        Error::NoSpace(msg.into())
    }

    /// Create a corrupt-filesystem error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create an invalid-path error.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Error::InvalidPath(msg.into())
    }

    /// Create an already-exists error.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Error::AlreadyExists(msg.into())
    }

    /// Create an invalid-operation error.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Error::InvalidOperation(msg.into())
    }
}
