//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Path carries a scheme no backend is registered for.
    #[error("unknown scheme: {0}")]
    UnknownScheme(String),

    /// A backend is already registered for this scheme.
    #[error("scheme already registered: {0}")]
    DuplicateScheme(String),

    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend exists but cannot service requests right now.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend does not implement the requested capability.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    /// Seek would place the cursor before the start of the stream.
    #[error("invalid seek to offset {offset}")]
    InvalidSeek {
        /// The absolute offset the seek would have produced.
        offset: i64,
    },

    /// Operation on a handle after close().
    #[error("handle is closed")]
    HandleClosed,

    /// Source and destination resolve to different backends.
    ///
    /// Raised by backend `rename` when it cannot move the data itself.
    /// Never escapes the public API: [`Vfs::rename`](crate::Vfs::rename)
    /// resolves it via the copy-then-delete fallback.
    #[error("source and destination are on different backends")]
    CrossBackend,

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    /// Create an UnknownScheme error.
    pub fn unknown_scheme(scheme: impl Into<String>) -> Self {
        Self::UnknownScheme(scheme.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a PermissionDenied error.
    pub fn permission_denied(path: impl Into<String>) -> Self {
        Self::PermissionDenied(path.into())
    }

    /// Create a BackendUnavailable error.
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(op: impl Into<String>) -> Self {
        Self::Unsupported(op.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::UnknownScheme(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::DuplicateScheme(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::PermissionDenied(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            VfsError::BackendUnavailable(msg) => {
                io::Error::new(io::ErrorKind::ConnectionRefused, msg)
            }
            VfsError::Unsupported(msg) => io::Error::new(io::ErrorKind::Unsupported, msg),
            VfsError::InvalidSeek { offset } => io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid seek to offset {offset}"),
            ),
            VfsError::HandleClosed => {
                io::Error::new(io::ErrorKind::InvalidInput, "handle is closed")
            }
            VfsError::CrossBackend => {
                io::Error::other("source and destination are on different backends")
            }
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            VfsError::Io(e) => e,
            VfsError::Other(msg) => io::Error::other(msg),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
