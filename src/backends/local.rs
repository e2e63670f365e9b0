//! Local filesystem backend.
//!
//! Provides access to real filesystem paths under a root directory, with
//! path security to prevent escaping the root via `..`.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use crate::backend::{Backend, Stream};
use crate::error::{VfsError, VfsResult};
use crate::types::{DirectoryListing, FileKind, OpenMode, StatRecord};

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/home/amy/project`, then `open("src/main.rs", ..)` opens
/// `/home/amy/project/src/main.rs`. Backend-local paths are normalized
/// lexically; a path whose `..` segments would leave the root is rejected
/// with a permission error.
///
/// A read-only instance rejects write-class operations.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    read_only: bool,
}

impl LocalBackend {
    /// Create a local backend rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self {
            root,
            read_only: false,
        }
    }

    /// Create a read-only local backend.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        let mut backend = Self::new(root);
        backend.read_only = true;
        backend
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a backend-local path to an absolute path under the root.
    ///
    /// Purely lexical: `.` and `..` are folded without touching the disk,
    /// so paths that do not exist yet resolve too. Escaping the root is a
    /// permission error.
    fn resolve(&self, path: &str) -> VfsResult<PathBuf> {
        let mut depth: i64 = 0;
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
                Component::ParentDir => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(VfsError::permission_denied(format!(
                            "path escapes root: {path}"
                        )));
                    }
                    resolved.pop();
                }
                Component::Normal(s) => {
                    depth += 1;
                    resolved.push(s);
                }
            }
        }
        Ok(resolved)
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::permission_denied("backend is read-only"))
        } else {
            Ok(())
        }
    }

    fn map_io(path: &str, e: io::Error) -> VfsError {
        match e.kind() {
            io::ErrorKind::NotFound => VfsError::not_found(path),
            io::ErrorKind::PermissionDenied => VfsError::permission_denied(path),
            _ => VfsError::Io(e),
        }
    }

    fn metadata_to_stat(meta: &fs::Metadata) -> StatRecord {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            StatRecord {
                mode: meta.mode(),
                inode: meta.ino(),
                dev: meta.dev(),
                nlink: meta.nlink(),
                uid: meta.uid(),
                gid: meta.gid(),
                size: meta.size(),
                atime: meta.atime(),
                mtime: meta.mtime(),
                ctime: meta.ctime(),
            }
        }

        #[cfg(not(unix))]
        {
            use crate::types::{S_IFDIR, S_IFREG};
            fn epoch_secs(t: io::Result<std::time::SystemTime>) -> i64 {
                t.ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0)
            }
            let kind = if meta.is_dir() { S_IFDIR } else { S_IFREG };
            StatRecord {
                mode: kind | if meta.permissions().readonly() { 0o444 } else { 0o644 },
                inode: 0,
                dev: 0,
                nlink: 1,
                uid: 0,
                gid: 0,
                size: meta.len(),
                atime: epoch_secs(meta.accessed()),
                mtime: epoch_secs(meta.modified()),
                ctime: epoch_secs(meta.created()),
            }
        }
    }
}

impl Backend for LocalBackend {
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn Stream>> {
        let full = self.resolve(path)?;

        let mut options = fs::OpenOptions::new();
        match mode {
            OpenMode::Read => {
                options.read(true);
            }
            OpenMode::Write => {
                self.check_writable()?;
                options.read(true).write(true).create(true).truncate(true);
            }
            OpenMode::Append => {
                self.check_writable()?;
                options.read(true).append(true).create(true);
            }
        }

        if mode != OpenMode::Read {
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).map_err(|e| Self::map_io(path, e))?;
            }
        }

        let file = options.open(&full).map_err(|e| Self::map_io(path, e))?;
        Ok(Box::new(LocalStream { file }))
    }

    fn stat(&self, path: &str) -> VfsResult<StatRecord> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| Self::map_io(path, e))?;
        Ok(Self::metadata_to_stat(&meta))
    }

    fn copy_native(&self, src: &str, dst: &str) -> VfsResult<bool> {
        self.check_writable()?;
        let src_full = self.resolve(src)?;
        let dst_full = self.resolve(dst)?;
        if let Some(parent) = dst_full.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::map_io(dst, e))?;
        }
        fs::copy(&src_full, &dst_full).map_err(|e| Self::map_io(src, e))?;
        Ok(true)
    }

    fn delete(&self, path: &str) -> VfsResult<bool> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        match fs::metadata(&full) {
            Ok(meta) if meta.is_dir() => return Ok(false),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Self::map_io(path, e)),
        }
        match fs::remove_file(&full) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io(path, e)),
        }
    }

    fn rename(&self, src: &str, dst: &str) -> VfsResult<bool> {
        self.check_writable()?;
        let src_full = self.resolve(src)?;
        let dst_full = self.resolve(dst)?;
        if let Some(parent) = dst_full.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::map_io(dst, e))?;
        }
        match fs::rename(&src_full, &dst_full) {
            Ok(()) => Ok(true),
            // Crossing OS filesystems within the root: let the routing
            // layer run its copy-then-delete fallback
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => Err(VfsError::CrossBackend),
            Err(e) => Err(Self::map_io(src, e)),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path)
            .map(|full| full.exists())
            .unwrap_or(false)
    }

    fn mkdir(&self, path: &str) -> VfsResult<bool> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        match fs::create_dir(&full) {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::AlreadyExists
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(Self::map_io(path, e)),
        }
    }

    fn mkdirs(&self, path: &str) -> VfsResult<bool> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        match fs::create_dir_all(&full) {
            Ok(()) => Ok(true),
            // A file somewhere in the chain blocks the directory
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotADirectory => Ok(false),
            Err(e) => Err(Self::map_io(path, e)),
        }
    }

    fn rmdir(&self, path: &str, force: bool) -> VfsResult<bool> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        let result = if force {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_dir(&full)
        };
        match result {
            Ok(()) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound
                        | io::ErrorKind::DirectoryNotEmpty
                        | io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(Self::map_io(path, e)),
        }
    }

    fn listdir(&self, path: &str) -> VfsResult<DirectoryListing> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| Self::map_io(path, e))?;
        if !meta.is_dir() {
            return Err(VfsError::not_found(path));
        }

        let mut listing = DirectoryListing::new();
        let read_dir = fs::read_dir(&full).map_err(|e| Self::map_io(path, e))?;
        for entry in read_dir {
            let entry = entry.map_err(VfsError::Io)?;
            let file_type = entry.file_type().map_err(VfsError::Io)?;
            let kind = if file_type.is_dir() {
                FileKind::Directory
            } else {
                FileKind::File
            };
            listing.push(entry.file_name().to_string_lossy().into_owned(), kind);
        }
        Ok(listing)
    }
}

/// Stream over a real file.
struct LocalStream {
    file: fs::File,
}

impl Stream for LocalStream {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        self.file.read(buf).map_err(VfsError::Io)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<usize> {
        self.file.write(buf).map_err(VfsError::Io)
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        self.file.seek(pos).map_err(|e| {
            if e.kind() == io::ErrorKind::InvalidInput {
                let offset = match pos {
                    SeekFrom::Start(o) => o as i64,
                    SeekFrom::Current(o) | SeekFrom::End(o) => o,
                };
                VfsError::InvalidSeek { offset }
            } else {
                VfsError::Io(e)
            }
        })
    }

    fn len(&self) -> VfsResult<u64> {
        Ok(self.file.metadata().map_err(VfsError::Io)?.len())
    }
}
