//! The public VFS operation surface.
//!
//! Every operation resolves its path(s) to a backend first, then delegates,
//! then wraps the backend's result into the normalized shapes. Cross-backend
//! copy and rename pass the data through this layer in chunks.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{VfsError, VfsResult};
use crate::handle::{FileHandle, write_full};
use crate::registry::BackendRegistry;
use crate::resolver::PathResolver;
use crate::types::{DirectoryListing, OpenMode, StatRecord};

const COPY_CHUNK: usize = 64 * 1024;

/// The virtual filesystem: scheme-routed file and directory operations.
///
/// Constructed over an explicit [`BackendRegistry`]; there is no ambient
/// global state, so tests can build isolated instances.
///
/// Boolean-returning operations encode recoverable "did not happen"
/// outcomes as `Ok(false)`; failures at the backend-selection stage
/// (unknown scheme), permission denials and mid-transfer I/O faults are
/// errors.
///
/// Known race: cross-backend `copy` and `rename` hold no cross-operation
/// lock. Two callers operating on the same path concurrently get a
/// last-writer-wins outcome, not a detected conflict.
#[derive(Debug, Clone)]
pub struct Vfs {
    resolver: PathResolver,
}

impl Vfs {
    /// Create a VFS over the given registry.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            resolver: PathResolver::new(registry),
        }
    }

    /// The resolver this VFS routes through.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Open a file, returning a backend-agnostic handle.
    ///
    /// Read mode requires the file to exist ([`VfsError::NotFound`]
    /// otherwise); Write truncates or creates; Append creates if missing
    /// with the cursor at the end.
    pub fn open(&self, path: &str, mode: OpenMode) -> VfsResult<FileHandle> {
        let (backend, local) = self.resolver.resolve(path)?;
        let stream = backend.open(&local, mode)?;
        Ok(FileHandle::new(stream, path))
    }

    /// Take a metadata snapshot of a path.
    ///
    /// All fields are populated before this returns; the record does not
    /// track later changes. Fails with [`VfsError::NotFound`] if the path
    /// does not exist.
    pub fn stat(&self, path: &str) -> VfsResult<StatRecord> {
        let (backend, local) = self.resolver.resolve(path)?;
        backend.stat(&local)
    }

    /// Copy a file. An existing destination is overwritten.
    ///
    /// When source and destination share a backend, a backend-native copy
    /// is attempted first; otherwise (or when the backend declines) the
    /// data is streamed through this layer. A missing source is
    /// [`VfsError::NotFound`].
    pub fn copy(&self, src: &str, dst: &str) -> VfsResult<bool> {
        let (src_backend, src_local) = self.resolver.resolve(src)?;
        let (dst_backend, dst_local) = self.resolver.resolve(dst)?;

        if Arc::ptr_eq(&src_backend, &dst_backend) {
            match src_backend.copy_native(&src_local, &dst_local) {
                Err(VfsError::Unsupported(_)) => {}
                other => return other,
            }
        }

        Self::stream_copy(&*src_backend, &src_local, &*dst_backend, &dst_local)?;
        Ok(true)
    }

    /// Remove a single file.
    ///
    /// Returns `Ok(false)` if the path is a directory or does not exist.
    pub fn delete(&self, path: &str) -> VfsResult<bool> {
        let (backend, local) = self.resolver.resolve(path)?;
        backend.delete(&local)
    }

    /// Rename a file, moving data across backends when needed.
    ///
    /// A backend-native rename is attempted first. When source and
    /// destination resolve to different backends (or the backend reports
    /// the move crosses devices), the fallback copies the data and deletes
    /// the source only after a destination stat confirms the byte count.
    /// On partial failure the half-written destination is removed
    /// best-effort and the source is left intact.
    pub fn rename(&self, src: &str, dst: &str) -> VfsResult<bool> {
        let (src_backend, src_local) = self.resolver.resolve(src)?;
        let (dst_backend, dst_local) = self.resolver.resolve(dst)?;

        if Arc::ptr_eq(&src_backend, &dst_backend) {
            match src_backend.rename(&src_local, &dst_local) {
                Err(VfsError::CrossBackend) => {}
                other => return other,
            }
        }

        debug!(src, dst, "cross-backend rename, copying then deleting source");
        let expected = src_backend.stat(&src_local)?.size;

        if let Err(e) = Self::stream_copy(&*src_backend, &src_local, &*dst_backend, &dst_local) {
            if let Err(cleanup) = dst_backend.delete(&dst_local) {
                warn!(dst, error = %cleanup, "failed to remove partial rename destination");
            }
            return Err(e);
        }

        let written = dst_backend.stat(&dst_local)?.size;
        if written != expected {
            if let Err(cleanup) = dst_backend.delete(&dst_local) {
                warn!(dst, error = %cleanup, "failed to remove partial rename destination");
            }
            return Err(VfsError::other(format!(
                "cross-backend rename transferred {written} of {expected} bytes"
            )));
        }

        if !src_backend.delete(&src_local)? {
            warn!(src, "rename source already gone before delete");
        }
        Ok(true)
    }

    /// True if the path exists as a file or a directory.
    ///
    /// A missing path is a valid `Ok(false)`, never an error; only
    /// resolution failures (unknown scheme) surface as errors.
    pub fn exists(&self, path: &str) -> VfsResult<bool> {
        let (backend, local) = self.resolver.resolve(path)?;
        Ok(backend.exists(&local))
    }

    /// Create exactly one directory level.
    ///
    /// Returns `Ok(false)` if the parent does not exist or the path is
    /// already taken.
    pub fn mkdir(&self, path: &str) -> VfsResult<bool> {
        let (backend, local) = self.resolver.resolve(path)?;
        backend.mkdir(&local)
    }

    /// Create all missing directory levels.
    ///
    /// A no-op `Ok(true)` if the full path already exists as a directory;
    /// `Ok(false)` if blocked by an existing file.
    pub fn mkdirs(&self, path: &str) -> VfsResult<bool> {
        let (backend, local) = self.resolver.resolve(path)?;
        backend.mkdirs(&local)
    }

    /// Remove a directory.
    ///
    /// Without `force`, a non-empty directory is refused with `Ok(false)`
    /// and its contents are left in place. With `force`, contents are
    /// removed recursively first.
    pub fn rmdir(&self, path: &str, force: bool) -> VfsResult<bool> {
        let (backend, local) = self.resolver.resolve(path)?;
        backend.rmdir(&local, force)
    }

    /// List a directory's subdirectory and file names.
    ///
    /// Fails with [`VfsError::NotFound`] if the path is not a directory.
    pub fn listdir(&self, path: &str) -> VfsResult<DirectoryListing> {
        let (backend, local) = self.resolver.resolve(path)?;
        backend.listdir(&local)
    }

    /// Stream one file's bytes from a source backend to a destination
    /// backend in fixed-size chunks.
    fn stream_copy(
        src_backend: &dyn Backend,
        src: &str,
        dst_backend: &dyn Backend,
        dst: &str,
    ) -> VfsResult<()> {
        let mut src_stream = src_backend.open(src, OpenMode::Read)?;
        let mut dst_stream = dst_backend.open(dst, OpenMode::Write)?;

        let mut buf = vec![0u8; COPY_CHUNK];
        loop {
            let n = src_stream.read(&mut buf)?;
            if n == 0 {
                break;
            }
            write_full(&mut *dst_stream, &buf[..n])?;
        }
        Ok(())
    }
}
