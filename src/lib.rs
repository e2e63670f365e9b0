//! # schemefs
//!
//! Scheme-routed virtual filesystem core. A uniform interface for file and
//! directory operations that dispatches to pluggable storage backends based
//! on a path's `scheme://` prefix. Key components:
//!
//! - [`Vfs`] - The public operation surface (open/stat/copy/rename/...)
//! - [`BackendRegistry`] - Process-wide scheme → backend table
//! - [`PathResolver`] - Splits paths and selects backends
//! - [`FileHandle`] - Backend-agnostic open file with cursor
//! - [`Backend`]/[`Stream`] - Capability traits backends implement
//! - [`MemoryBackend`] - In-memory filesystem (scratch, testing)
//! - [`LocalBackend`] - Local disk access rooted at a directory
//!
//! ## Design decisions
//!
//! - **Explicit registry, no globals**: the scheme table is an injected
//!   object, so tests build isolated instances.
//! - **Scheme-less paths are local**: a path without `://` routes to the
//!   backend registered under [`LOCAL_SCHEME`], passed through unchanged.
//! - **Cross-backend moves degrade safely**: rename falls back to
//!   copy-then-delete and never drops the source until the destination is
//!   verified complete.
//! - **Scoped resources**: dropping a [`FileHandle`] releases its backend
//!   stream; nothing relies on a collector to close files eventually.
//!
//! ```
//! use std::sync::Arc;
//! use schemefs::{BackendRegistry, MemoryBackend, OpenMode, Vfs};
//!
//! let registry = Arc::new(BackendRegistry::new());
//! registry.register("scratch", MemoryBackend::new()).unwrap();
//! let vfs = Vfs::new(registry);
//!
//! let mut f = vfs.open("scratch://notes.txt", OpenMode::Write).unwrap();
//! f.write(b"hello").unwrap();
//! f.close().unwrap();
//!
//! assert_eq!(vfs.stat("scratch://notes.txt").unwrap().st_size(), 5);
//! ```

pub mod backend;
pub mod backends;
mod error;
mod handle;
mod ops;
mod registry;
mod resolver;
mod types;

pub use backend::{Backend, Stream};
pub use backends::{LocalBackend, MemoryBackend};
pub use error::{VfsError, VfsResult};
pub use handle::FileHandle;
pub use ops::Vfs;
pub use registry::{BackendRegistry, LOCAL_SCHEME};
pub use resolver::PathResolver;
pub use types::{DirectoryListing, FileKind, OpenMode, SeekWhence, StatRecord};
