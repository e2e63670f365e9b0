//! Backend-agnostic open-file handle.

use std::io::SeekFrom;

use crate::backend::Stream;
use crate::error::{VfsError, VfsResult};
use crate::types::SeekWhence;

const READ_CHUNK: usize = 64 * 1024;

/// Write an entire buffer to a stream, looping over partial writes.
///
/// A stream that accepts zero bytes while data remains is reported as a
/// definite error; a partial write is never a supported outcome.
pub(crate) fn write_full(stream: &mut dyn Stream, mut buf: &[u8]) -> VfsResult<()> {
    while !buf.is_empty() {
        let n = stream.write(buf)?;
        if n == 0 {
            return Err(VfsError::Io(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "stream accepted zero bytes",
            )));
        }
        buf = &buf[n..];
    }
    Ok(())
}

/// An open file on some backend.
///
/// Owns exactly one backend-provided stream plus its cursor. Created by
/// [`Vfs::open`](crate::Vfs::open), destroyed by [`close`](Self::close) or
/// by being dropped — the stream is released either way, so abandoning a
/// handle never leaks the backend resource.
///
/// A handle has a single logical owner: all mutating operations take
/// `&mut self`, and sharing across threads requires external
/// synchronization.
///
/// `close` is idempotent: the second and later calls are no-ops. Every
/// other operation after close fails with [`VfsError::HandleClosed`].
pub struct FileHandle {
    stream: Option<Box<dyn Stream>>,
    path: String,
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("closed", &self.stream.is_none())
            .finish()
    }
}

impl FileHandle {
    pub(crate) fn new(stream: Box<dyn Stream>, path: impl Into<String>) -> Self {
        Self {
            stream: Some(stream),
            path: path.into(),
        }
    }

    /// The path this handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn stream_mut(&mut self) -> VfsResult<&mut dyn Stream> {
        match self.stream.as_deref_mut() {
            Some(stream) => Ok(stream),
            None => Err(VfsError::HandleClosed),
        }
    }

    /// Read up to `max_bytes` from the cursor; 0 means read to end.
    ///
    /// Returns an empty vec at end-of-stream. Reaching the end is never an
    /// error by itself.
    pub fn read(&mut self, max_bytes: u64) -> VfsResult<Vec<u8>> {
        let stream = self.stream_mut()?;
        let mut out = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let want = if max_bytes == 0 {
                chunk.len()
            } else {
                let remaining = (max_bytes as usize).saturating_sub(out.len());
                if remaining == 0 {
                    break;
                }
                remaining.min(chunk.len())
            };

            let n = stream.read(&mut chunk[..want])?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }

        Ok(out)
    }

    /// Write the entire buffer or fail.
    ///
    /// Partial writes are retried internally until complete; any shortfall
    /// the stream cannot resolve becomes a definite error.
    pub fn write(&mut self, buf: &[u8]) -> VfsResult<()> {
        let stream = self.stream_mut()?;
        write_full(stream, buf)
    }

    /// Move the cursor; returns the new absolute offset.
    ///
    /// Fails with [`VfsError::InvalidSeek`] if the resulting offset would
    /// be negative.
    pub fn seek(&mut self, offset: i64, whence: SeekWhence) -> VfsResult<u64> {
        let stream = self.stream_mut()?;
        let pos = match whence {
            SeekWhence::Start => {
                if offset < 0 {
                    return Err(VfsError::InvalidSeek { offset });
                }
                SeekFrom::Start(offset as u64)
            }
            SeekWhence::Current => SeekFrom::Current(offset),
            SeekWhence::End => SeekFrom::End(offset),
        };
        stream.seek(pos)
    }

    /// Current total byte length of the underlying resource.
    pub fn size(&self) -> VfsResult<u64> {
        match self.stream.as_deref() {
            Some(stream) => stream.len(),
            None => Err(VfsError::HandleClosed),
        }
    }

    /// Close the handle, releasing the backend stream.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub fn close(&mut self) -> VfsResult<()> {
        self.stream.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::backends::MemoryBackend;
    use crate::types::OpenMode;

    fn open(backend: &MemoryBackend, path: &str, mode: OpenMode) -> FileHandle {
        FileHandle::new(backend.open(path, mode).unwrap(), path)
    }

    #[test]
    fn test_write_seek_read_round_trip() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);

        handle.write(b"hello world").unwrap();
        assert_eq!(handle.seek(0, SeekWhence::Start).unwrap(), 0);
        assert_eq!(handle.read(11).unwrap(), b"hello world");
    }

    #[test]
    fn test_size_after_write() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);

        handle.write(b"12345").unwrap();
        assert_eq!(handle.size().unwrap(), 5);
    }

    #[test]
    fn test_read_to_end_and_eof() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);
        handle.write(b"abcdef").unwrap();
        handle.seek(0, SeekWhence::Start).unwrap();

        // 0 means read to end.
        assert_eq!(handle.read(0).unwrap(), b"abcdef");
        // At EOF, reads return empty rather than failing.
        assert_eq!(handle.read(0).unwrap(), b"");
        assert_eq!(handle.read(16).unwrap(), b"");
    }

    #[test]
    fn test_read_bounded() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);
        handle.write(b"abcdef").unwrap();
        handle.seek(0, SeekWhence::Start).unwrap();

        assert_eq!(handle.read(3).unwrap(), b"abc");
        assert_eq!(handle.read(3).unwrap(), b"def");
    }

    #[test]
    fn test_seek_whence() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);
        handle.write(b"0123456789").unwrap();

        assert_eq!(handle.seek(2, SeekWhence::Start).unwrap(), 2);
        assert_eq!(handle.seek(3, SeekWhence::Current).unwrap(), 5);
        assert_eq!(handle.seek(-4, SeekWhence::End).unwrap(), 6);
        assert_eq!(handle.read(0).unwrap(), b"6789");
    }

    #[test]
    fn test_invalid_seek() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);
        handle.write(b"abc").unwrap();

        assert!(matches!(
            handle.seek(-1, SeekWhence::Start),
            Err(VfsError::InvalidSeek { offset: -1 })
        ));
        assert!(matches!(
            handle.seek(-10, SeekWhence::End),
            Err(VfsError::InvalidSeek { .. })
        ));
        // Failed seeks leave the cursor usable.
        assert_eq!(handle.seek(0, SeekWhence::Start).unwrap(), 0);
        assert_eq!(handle.read(0).unwrap(), b"abc");
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);

        handle.close().unwrap();
        handle.close().unwrap();
    }

    #[test]
    fn test_operations_after_close_fail() {
        let backend = MemoryBackend::new();
        let mut handle = open(&backend, "test.txt", OpenMode::Write);
        handle.write(b"data").unwrap();
        handle.close().unwrap();

        assert!(matches!(handle.read(0), Err(VfsError::HandleClosed)));
        assert!(matches!(handle.write(b"x"), Err(VfsError::HandleClosed)));
        assert!(matches!(
            handle.seek(0, SeekWhence::Start),
            Err(VfsError::HandleClosed)
        ));
        assert!(matches!(handle.size(), Err(VfsError::HandleClosed)));
    }

    #[test]
    fn test_read_mode_rejects_write() {
        let backend = MemoryBackend::new();
        let mut writer = open(&backend, "test.txt", OpenMode::Write);
        writer.write(b"data").unwrap();
        writer.close().unwrap();

        let mut reader = open(&backend, "test.txt", OpenMode::Read);
        assert!(matches!(
            reader.write(b"nope"),
            Err(VfsError::PermissionDenied(_))
        ));
        assert_eq!(reader.read(0).unwrap(), b"data");
    }

    #[test]
    fn test_append_mode() {
        let backend = MemoryBackend::new();
        let mut writer = open(&backend, "test.txt", OpenMode::Write);
        writer.write(b"hello").unwrap();
        writer.close().unwrap();

        let mut appender = open(&backend, "test.txt", OpenMode::Append);
        appender.write(b" world").unwrap();
        appender.seek(0, SeekWhence::Start).unwrap();
        assert_eq!(appender.read(0).unwrap(), b"hello world");
    }
}
