//! Backend capability traits.
//!
//! A [`Backend`] owns all filesystem semantics for one scheme. Paths handed
//! to a backend are backend-local: the [`PathResolver`](crate::PathResolver)
//! has already stripped the `scheme://` prefix. Backends are registered once
//! and shared for the process lifetime, so every method takes `&self`.

use std::io::SeekFrom;

use crate::error::{VfsError, VfsResult};
use crate::types::{DirectoryListing, OpenMode, StatRecord};

/// An open byte stream provided by a backend.
///
/// Streams carry their own cursor. They are single-owner: the
/// [`FileHandle`](crate::FileHandle) wrapping a stream is the only caller.
/// Dropping a stream releases the underlying backend resource.
pub trait Stream: Send {
    /// Read up to `buf.len()` bytes at the cursor.
    ///
    /// Returns the number of bytes read; 0 means end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize>;

    /// Write bytes at the cursor, returning how many were accepted.
    ///
    /// Partial writes are allowed here; the handle layer loops until the
    /// whole buffer is written.
    fn write(&mut self, buf: &[u8]) -> VfsResult<usize>;

    /// Move the cursor, returning the new absolute offset.
    ///
    /// A seek that would place the cursor before offset 0 fails with
    /// [`VfsError::InvalidSeek`].
    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64>;

    /// Current total byte length of the underlying resource.
    ///
    /// This is the resource size, not the bytes remaining after the cursor.
    fn len(&self) -> VfsResult<u64>;
}

/// Capability interface implemented by storage backends.
///
/// A backend need not support every capability: write-class methods on a
/// read-only backend should return [`VfsError::PermissionDenied`] or
/// [`VfsError::Unsupported`]. `copy_native` is optional by default.
///
/// `rename` may return [`VfsError::CrossBackend`] when it detects the move
/// cannot be done natively (e.g. crossing device boundaries); the routing
/// layer then falls back to copy-then-delete.
pub trait Backend: Send + Sync {
    /// Open a stream for the given path.
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn Stream>>;

    /// Stat the given path in a single call.
    fn stat(&self, path: &str) -> VfsResult<StatRecord>;

    /// Backend-native copy, when the backend can do better than a streamed
    /// transfer. The default declines, forcing the read/write fallback.
    fn copy_native(&self, src: &str, dst: &str) -> VfsResult<bool> {
        let _ = (src, dst);
        Err(VfsError::unsupported("copy_native"))
    }

    /// Remove a single file. Returns false if the path is a directory or
    /// does not exist.
    fn delete(&self, path: &str) -> VfsResult<bool>;

    /// Rename within this backend. Fails with [`VfsError::NotFound`] if the
    /// source is missing.
    fn rename(&self, src: &str, dst: &str) -> VfsResult<bool>;

    /// True if the path exists as a file or a directory. A missing path is
    /// a plain false, never an error.
    fn exists(&self, path: &str) -> bool;

    /// Create exactly one directory level. Returns false if the parent does
    /// not exist or the path is already taken.
    fn mkdir(&self, path: &str) -> VfsResult<bool>;

    /// Create all missing directory levels. Returns true if the full path
    /// already exists as a directory, false if blocked by a file.
    fn mkdirs(&self, path: &str) -> VfsResult<bool>;

    /// Remove a directory. Without `force` the directory must be empty;
    /// with `force` contents are removed recursively first.
    fn rmdir(&self, path: &str, force: bool) -> VfsResult<bool>;

    /// Enumerate a directory. Fails with [`VfsError::NotFound`] if the path
    /// is not a directory.
    fn listdir(&self, path: &str) -> VfsResult<DirectoryListing>;
}
