//! In-memory filesystem backend.
//!
//! The reference backend for tests and scratch space. All data is ephemeral
//! and lost when the backend is dropped.

use std::collections::HashMap;
use std::io::SeekFrom;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::backend::{Backend, Stream};
use crate::error::{VfsError, VfsResult};
use crate::types::{DirectoryListing, FileKind, OpenMode, S_IFDIR, S_IFREG, StatRecord};

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Shared contents of one file. Streams hold an `Arc` to this so writes are
/// visible to later opens and to `stat`.
struct FileBody {
    data: RwLock<Vec<u8>>,
    mtime: AtomicI64,
}

impl FileBody {
    fn new() -> Self {
        Self {
            data: RwLock::new(Vec::new()),
            mtime: AtomicI64::new(now_epoch()),
        }
    }
}

enum Node {
    File {
        ino: u64,
        ctime: i64,
        body: Arc<FileBody>,
    },
    Directory {
        ino: u64,
        ctime: i64,
    },
}

impl Node {
    fn is_dir(&self) -> bool {
        matches!(self, Node::Directory { .. })
    }
}

/// In-memory filesystem backend.
///
/// Thread-safe via an internal `RwLock`. Paths are normalized on entry:
/// leading slashes are stripped and `.`/`..` segments resolved, so
/// `a/b/../c` and `/a/c` name the same entry. Opening a file for writing
/// creates missing parent directories, matching local-disk convenience;
/// `mkdir` stays strict.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Node>>,
    next_ino: AtomicU64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            String::new(),
            Node::Directory {
                ino: 1,
                ctime: now_epoch(),
            },
        );
        Self {
            entries: RwLock::new(entries),
            next_ino: AtomicU64::new(2),
        }
    }

    fn alloc_ino(&self) -> u64 {
        self.next_ino.fetch_add(1, Ordering::Relaxed)
    }

    /// Normalize a path: strip leading `/`, resolve `.` and `..`.
    fn normalize(path: &str) -> String {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        segments.join("/")
    }

    fn parent_of(path: &str) -> &str {
        path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    /// Create any missing directories above `path`. An existing file in the
    /// chain blocks the whole path: nothing can live beneath a file.
    fn ensure_parents(
        entries: &mut HashMap<String, Node>,
        path: &str,
        next_ino: &AtomicU64,
    ) -> VfsResult<()> {
        let parent = Self::parent_of(path);
        if parent.is_empty() {
            return Ok(());
        }
        let mut current = String::new();
        for segment in parent.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            match entries.get(&current) {
                Some(node) if node.is_dir() => {}
                Some(_) => return Err(VfsError::not_a_directory(current)),
                None => {
                    entries.insert(
                        current.clone(),
                        Node::Directory {
                            ino: next_ino.fetch_add(1, Ordering::Relaxed),
                            ctime: now_epoch(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn direct_children<'a>(
        entries: &'a HashMap<String, Node>,
        dir: &str,
    ) -> impl Iterator<Item = (&'a str, &'a Node)> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        entries.iter().filter_map(move |(key, node)| {
            if key.is_empty() {
                return None;
            }
            let rest = key.strip_prefix(&prefix)?;
            if rest.is_empty() || rest.contains('/') {
                None
            } else {
                Some((rest, node))
            }
        })
    }
}

impl Backend for MemoryBackend {
    fn open(&self, path: &str, mode: OpenMode) -> VfsResult<Box<dyn Stream>> {
        let norm = Self::normalize(path);
        match mode {
            OpenMode::Read => {
                let entries = self.entries.read();
                match entries.get(&norm) {
                    Some(Node::File { body, .. }) => Ok(Box::new(MemoryStream {
                        body: Arc::clone(body),
                        pos: 0,
                        writable: false,
                    })),
                    Some(Node::Directory { .. }) => Err(VfsError::is_a_directory(norm)),
                    None => Err(VfsError::not_found(norm)),
                }
            }
            OpenMode::Write | OpenMode::Append => {
                let mut entries = self.entries.write();
                Self::ensure_parents(&mut entries, &norm, &self.next_ino)?;

                let body = match entries.get(&norm) {
                    Some(Node::File { body, .. }) => {
                        if mode == OpenMode::Write {
                            body.data.write().clear();
                            body.mtime.store(now_epoch(), Ordering::Relaxed);
                        }
                        Arc::clone(body)
                    }
                    Some(Node::Directory { .. }) => {
                        return Err(VfsError::is_a_directory(norm));
                    }
                    None => {
                        let body = Arc::new(FileBody::new());
                        entries.insert(
                            norm.clone(),
                            Node::File {
                                ino: self.alloc_ino(),
                                ctime: now_epoch(),
                                body: Arc::clone(&body),
                            },
                        );
                        body
                    }
                };

                let pos = if mode == OpenMode::Append {
                    body.data.read().len() as u64
                } else {
                    0
                };
                Ok(Box::new(MemoryStream {
                    body,
                    pos,
                    writable: true,
                }))
            }
        }
    }

    fn stat(&self, path: &str) -> VfsResult<StatRecord> {
        let norm = Self::normalize(path);
        let entries = self.entries.read();
        match entries.get(&norm) {
            Some(Node::File { ino, ctime, body }) => {
                let mtime = body.mtime.load(Ordering::Relaxed);
                Ok(StatRecord {
                    mode: S_IFREG | 0o644,
                    inode: *ino,
                    dev: 0,
                    nlink: 1,
                    uid: 0,
                    gid: 0,
                    size: body.data.read().len() as u64,
                    atime: mtime,
                    mtime,
                    ctime: *ctime,
                })
            }
            Some(Node::Directory { ino, ctime }) => Ok(StatRecord {
                mode: S_IFDIR | 0o755,
                inode: *ino,
                dev: 0,
                nlink: 2,
                uid: 0,
                gid: 0,
                size: 0,
                atime: *ctime,
                mtime: *ctime,
                ctime: *ctime,
            }),
            None => Err(VfsError::not_found(norm)),
        }
    }

    fn delete(&self, path: &str) -> VfsResult<bool> {
        let norm = Self::normalize(path);
        let mut entries = self.entries.write();
        match entries.get(&norm) {
            Some(Node::File { .. }) => {
                entries.remove(&norm);
                Ok(true)
            }
            Some(Node::Directory { .. }) | None => Ok(false),
        }
    }

    fn rename(&self, src: &str, dst: &str) -> VfsResult<bool> {
        let src_norm = Self::normalize(src);
        let dst_norm = Self::normalize(dst);
        let mut entries = self.entries.write();

        if !entries.contains_key(&src_norm) {
            return Err(VfsError::not_found(src_norm));
        }
        // Check the destination chain before touching the source so a
        // blocked rename leaves the tree untouched
        Self::ensure_parents(&mut entries, &dst_norm, &self.next_ino)?;

        let node = entries
            .remove(&src_norm)
            .ok_or_else(|| VfsError::not_found(src_norm.clone()))?;

        // Directories carry their subtree with them
        if node.is_dir() {
            let prefix = format!("{src_norm}/");
            let children: Vec<String> = entries
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            for child in children {
                if let Some(child_node) = entries.remove(&child) {
                    let relative = &child[prefix.len()..];
                    entries.insert(format!("{dst_norm}/{relative}"), child_node);
                }
            }
        }

        entries.insert(dst_norm, node);
        Ok(true)
    }

    fn exists(&self, path: &str) -> bool {
        let norm = Self::normalize(path);
        self.entries.read().contains_key(&norm)
    }

    fn mkdir(&self, path: &str) -> VfsResult<bool> {
        let norm = Self::normalize(path);
        if norm.is_empty() {
            return Ok(false);
        }
        let mut entries = self.entries.write();
        if entries.contains_key(&norm) {
            return Ok(false);
        }
        match entries.get(Self::parent_of(&norm)) {
            Some(node) if node.is_dir() => {}
            _ => return Ok(false),
        }
        entries.insert(
            norm,
            Node::Directory {
                ino: self.alloc_ino(),
                ctime: now_epoch(),
            },
        );
        Ok(true)
    }

    fn mkdirs(&self, path: &str) -> VfsResult<bool> {
        let norm = Self::normalize(path);
        if norm.is_empty() {
            return Ok(true);
        }
        let mut entries = self.entries.write();
        let mut current = String::new();
        for segment in norm.split('/') {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);
            match entries.get(&current) {
                Some(node) if node.is_dir() => {}
                Some(_) => return Ok(false),
                None => {
                    entries.insert(
                        current.clone(),
                        Node::Directory {
                            ino: self.alloc_ino(),
                            ctime: now_epoch(),
                        },
                    );
                }
            }
        }
        Ok(true)
    }

    fn rmdir(&self, path: &str, force: bool) -> VfsResult<bool> {
        let norm = Self::normalize(path);
        if norm.is_empty() {
            return Ok(false);
        }
        let mut entries = self.entries.write();
        match entries.get(&norm) {
            Some(Node::Directory { .. }) => {}
            Some(_) | None => return Ok(false),
        }

        let prefix = format!("{norm}/");
        let children: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();

        if !children.is_empty() && !force {
            return Ok(false);
        }
        for child in children {
            entries.remove(&child);
        }
        entries.remove(&norm);
        Ok(true)
    }

    fn listdir(&self, path: &str) -> VfsResult<DirectoryListing> {
        let norm = Self::normalize(path);
        let entries = self.entries.read();
        match entries.get(&norm) {
            Some(node) if node.is_dir() => {}
            _ => return Err(VfsError::not_found(norm)),
        }

        let mut listing = DirectoryListing::new();
        let mut names: Vec<(String, FileKind)> = Self::direct_children(&entries, &norm)
            .map(|(name, node)| {
                let kind = if node.is_dir() {
                    FileKind::Directory
                } else {
                    FileKind::File
                };
                (name.to_string(), kind)
            })
            .collect();
        // Enumeration order: lexicographic, so listings are deterministic.
        // Names are unique within a directory, so the kind never tiebreaks.
        names.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, kind) in names {
            listing.push(name, kind);
        }
        Ok(listing)
    }
}

/// Stream over a memory file. Shares the file body with the backend; holds
/// its own cursor.
struct MemoryStream {
    body: Arc<FileBody>,
    pos: u64,
    writable: bool,
}

impl Stream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> VfsResult<usize> {
        let data = self.body.data.read();
        let start = (self.pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos = (start + n) as u64;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> VfsResult<usize> {
        if !self.writable {
            return Err(VfsError::permission_denied("stream not opened for writing"));
        }
        let mut data = self.body.data.write();
        let start = self.pos as usize;
        let end = start + buf.len();
        if end > data.len() {
            // Zero-fill any gap left by a seek past the end
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        self.body.mtime.store(now_epoch(), Ordering::Relaxed);
        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> VfsResult<u64> {
        let len = self.body.data.read().len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => len + offset,
        };
        if target < 0 {
            return Err(VfsError::InvalidSeek { offset: target });
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    fn len(&self) -> VfsResult<u64> {
        Ok(self.body.data.read().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::write_full;

    fn write_file(fs: &MemoryBackend, path: &str, data: &[u8]) {
        let mut stream = fs.open(path, OpenMode::Write).unwrap();
        write_full(&mut *stream, data).unwrap();
    }

    fn read_file(fs: &MemoryBackend, path: &str) -> Vec<u8> {
        let mut stream = fs.open(path, OpenMode::Read).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    }

    #[test]
    fn test_create_and_read() {
        let fs = MemoryBackend::new();
        write_file(&fs, "test.txt", b"hello world");
        assert_eq!(read_file(&fs, "test.txt"), b"hello world");
    }

    #[test]
    fn test_open_missing_for_read() {
        let fs = MemoryBackend::new();
        assert!(matches!(
            fs.open("nope.txt", OpenMode::Read),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_write_truncates_existing() {
        let fs = MemoryBackend::new();
        write_file(&fs, "test.txt", b"a longer first version");
        write_file(&fs, "test.txt", b"short");
        assert_eq!(read_file(&fs, "test.txt"), b"short");
        assert_eq!(fs.stat("test.txt").unwrap().size, 5);
    }

    #[test]
    fn test_stat_fields() {
        let fs = MemoryBackend::new();
        write_file(&fs, "file.txt", b"12345");
        fs.mkdir("sub").unwrap();

        let file = fs.stat("file.txt").unwrap();
        assert!(file.is_file());
        assert_eq!(file.size, 5);
        assert_eq!(file.nlink, 1);
        assert!(file.inode >= 2);
        assert!(file.mtime > 0);
        // Concepts with no meaning here stat as zero
        assert_eq!(file.dev, 0);
        assert_eq!(file.uid, 0);
        assert_eq!(file.gid, 0);

        let dir = fs.stat("sub").unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir.nlink, 2);

        let root = fs.stat("").unwrap();
        assert!(root.is_dir());
        assert_eq!(root.inode, 1);
    }

    #[test]
    fn test_mkdir_requires_parent() {
        let fs = MemoryBackend::new();
        assert!(!fs.mkdir("a/b").unwrap());
        assert!(fs.mkdir("a").unwrap());
        assert!(fs.mkdir("a/b").unwrap());
        // Second mkdir of the same path did not happen
        assert!(!fs.mkdir("a").unwrap());
    }

    #[test]
    fn test_mkdirs() {
        let fs = MemoryBackend::new();
        assert!(fs.mkdirs("a/b/c").unwrap());
        assert!(fs.stat("a/b/c").unwrap().is_dir());
        // No-op true when the chain already exists
        assert!(fs.mkdirs("a/b/c").unwrap());
        // Blocked by a file
        write_file(&fs, "a/file", b"x");
        assert!(!fs.mkdirs("a/file/d").unwrap());
    }

    #[test]
    fn test_delete() {
        let fs = MemoryBackend::new();
        write_file(&fs, "test.txt", b"x");
        fs.mkdir("dir").unwrap();

        assert!(fs.delete("test.txt").unwrap());
        assert!(!fs.exists("test.txt"));
        // Directories and missing paths are a false, not an error
        assert!(!fs.delete("dir").unwrap());
        assert!(!fs.delete("missing").unwrap());
    }

    #[test]
    fn test_rmdir() {
        let fs = MemoryBackend::new();
        fs.mkdir("empty").unwrap();
        assert!(fs.rmdir("empty", false).unwrap());
        assert!(!fs.exists("empty"));

        fs.mkdirs("full/sub").unwrap();
        write_file(&fs, "full/file.txt", b"x");
        assert!(!fs.rmdir("full", false).unwrap());
        assert!(fs.exists("full/file.txt"));

        assert!(fs.rmdir("full", true).unwrap());
        assert!(!fs.exists("full"));
        assert!(!fs.exists("full/file.txt"));
    }

    #[test]
    fn test_rename_file_and_directory() {
        let fs = MemoryBackend::new();
        write_file(&fs, "old.txt", b"content");
        assert!(fs.rename("old.txt", "new.txt").unwrap());
        assert!(!fs.exists("old.txt"));
        assert_eq!(read_file(&fs, "new.txt"), b"content");

        fs.mkdirs("dir/sub").unwrap();
        write_file(&fs, "dir/sub/deep.txt", b"deep");
        assert!(fs.rename("dir", "moved").unwrap());
        assert!(!fs.exists("dir/sub/deep.txt"));
        assert_eq!(read_file(&fs, "moved/sub/deep.txt"), b"deep");
    }

    #[test]
    fn test_rename_missing_source() {
        let fs = MemoryBackend::new();
        assert!(matches!(
            fs.rename("ghost", "anywhere"),
            Err(VfsError::NotFound(_))
        ));
    }

    #[test]
    fn test_listdir() {
        let fs = MemoryBackend::new();
        fs.mkdir("a").unwrap();
        fs.mkdir("b").unwrap();
        write_file(&fs, "x.txt", b"x");
        write_file(&fs, "a/nested.txt", b"n");

        let listing = fs.listdir("").unwrap();
        assert_eq!(listing.dirs, vec!["a", "b"]);
        assert_eq!(listing.files, vec!["x.txt"]);

        let sub = fs.listdir("a").unwrap();
        assert!(sub.dirs.is_empty());
        assert_eq!(sub.files, vec!["nested.txt"]);

        assert!(matches!(fs.listdir("x.txt"), Err(VfsError::NotFound(_))));
        assert!(matches!(fs.listdir("ghost"), Err(VfsError::NotFound(_))));
    }

    #[test]
    fn test_path_normalization() {
        let fs = MemoryBackend::new();
        write_file(&fs, "/a/b/c.txt", b"x");

        assert!(fs.exists("a/b/c.txt"));
        assert!(fs.exists("/a/b/c.txt"));
        assert!(fs.exists("a/./b/c.txt"));
        assert!(fs.exists("a/b/../b/c.txt"));
    }

    #[test]
    fn test_open_blocked_by_file_in_chain() {
        let fs = MemoryBackend::new();
        write_file(&fs, "blocker", b"i am a file");

        // Nothing can be created beneath a file
        assert!(matches!(
            fs.open("blocker/child.txt", OpenMode::Write),
            Err(VfsError::NotADirectory(_))
        ));
        assert!(!fs.exists("blocker/child.txt"));
        assert!(fs.stat("blocker").unwrap().is_file());

        // A blocked rename destination leaves the source untouched
        write_file(&fs, "keep.txt", b"content");
        assert!(matches!(
            fs.rename("keep.txt", "blocker/keep.txt"),
            Err(VfsError::NotADirectory(_))
        ));
        assert_eq!(read_file(&fs, "keep.txt"), b"content");
        assert!(!fs.exists("blocker/keep.txt"));
    }

    #[test]
    fn test_sparse_write_after_seek() {
        let fs = MemoryBackend::new();
        let mut stream = fs.open("sparse.bin", OpenMode::Write).unwrap();
        stream.seek(SeekFrom::Start(4)).unwrap();
        stream.write(b"tail").unwrap();

        assert_eq!(fs.stat("sparse.bin").unwrap().size, 8);
        assert_eq!(read_file(&fs, "sparse.bin"), b"\0\0\0\0tail");
    }
}
