//! Core VFS types.
//!
//! Plain data shapes shared by the routing layer and the backends. The
//! record types derive serde so callers can ship them over RPC unchanged.

use serde::{Deserialize, Serialize};

/// File-type bits of a stat mode (mask).
pub const S_IFMT: u32 = 0o170000;
/// Mode bits marking a directory.
pub const S_IFDIR: u32 = 0o040000;
/// Mode bits marking a regular file.
pub const S_IFREG: u32 = 0o100000;

/// How a file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading (the default).
    #[default]
    Read,
    /// Open for writing; creates the file or truncates an existing one.
    Write,
    /// Open for writing with the cursor at the end; creates if missing.
    Append,
}

/// Origin for a seek, matching the classic 0/1/2 whence encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// From the start of the stream.
    Start,
    /// From the current cursor position.
    Current,
    /// From the end of the stream.
    End,
}

impl SeekWhence {
    /// Decode a raw whence value (0 = start, 1 = current, 2 = end).
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Start),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

/// Kind of directory entry, for backends building listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Normalized metadata snapshot for one path.
///
/// Immutable once constructed: later changes to the underlying file are not
/// reflected, call [`Vfs::stat`](crate::Vfs::stat) again for a fresh record.
/// Every field is populated eagerly from a single backend stat call; a
/// backend supplies zero where a concept does not apply (no inode numbers on
/// an in-memory backend, for example).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    /// File protection and type bits.
    pub mode: u32,
    /// Inode number.
    pub inode: u64,
    /// ID of the device containing the file.
    pub dev: u64,
    /// Number of hard links.
    pub nlink: u64,
    /// User ID of the owner.
    pub uid: u32,
    /// Group ID of the owner.
    pub gid: u32,
    /// Total size in bytes.
    pub size: u64,
    /// Time of last access, seconds since the Unix epoch.
    pub atime: i64,
    /// Time of last modification, seconds since the Unix epoch.
    pub mtime: i64,
    /// Time of last status change, seconds since the Unix epoch.
    pub ctime: i64,
}

impl StatRecord {
    /// File protection bits.
    pub fn st_mode(&self) -> u32 {
        self.mode
    }

    /// Inode number.
    pub fn st_ino(&self) -> u64 {
        self.inode
    }

    /// ID of the device containing the file.
    pub fn st_dev(&self) -> u64 {
        self.dev
    }

    /// Number of hard links.
    pub fn st_nlink(&self) -> u64 {
        self.nlink
    }

    /// User ID of the owner.
    pub fn st_uid(&self) -> u32 {
        self.uid
    }

    /// Group ID of the owner.
    pub fn st_gid(&self) -> u32 {
        self.gid
    }

    /// Total size in bytes.
    pub fn st_size(&self) -> u64 {
        self.size
    }

    /// Time of last access.
    pub fn atime(&self) -> i64 {
        self.atime
    }

    /// Time of last modification.
    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    /// Time of last status change.
    pub fn ctime(&self) -> i64 {
        self.ctime
    }

    /// Returns true if the mode bits describe a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Returns true if the mode bits describe a regular file.
    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }
}

/// Contents of one directory: subdirectory names and file names.
///
/// Names are relative (no full paths). Order is the backend's enumeration
/// order and is not guaranteed sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    /// Subdirectory names.
    pub dirs: Vec<String>,
    /// File names.
    pub files: Vec<String>,
}

impl DirectoryListing {
    /// Create an empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry of the given kind, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, kind: FileKind) {
        match kind {
            FileKind::Directory => self.dirs.push(name.into()),
            FileKind::File => self.files.push(name.into()),
        }
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.dirs.len() + self.files.len()
    }

    /// Returns true if the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}
