//! The random-access I/O boundary the editor is built against.
//!
//! The core never opens files itself; a caller supplies something that
//! implements [`Readable`] + [`Writable`] + [`Closeable`], the way the
//! teacher crate this was built from is handed an already-open
//! `BufReader<File>` rather than a path. [`FileIo`] is the concrete,
//! `std::fs::File`-backed collaborator the CLI uses; [`SliceIo`] is an
//! in-memory one used by tests (and usable by any embedder that already has
//! the image in memory).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Error, Result};

/// A byte-addressable random-access source.
///
/// `read(pos, len)` must return exactly `len` bytes; a short read is an
/// I/O error, not a short `Vec`.
pub trait Readable {
    fn read(&mut self, pos: u64, len: usize) -> Result<Vec<u8>>;
}

/// A byte-addressable random-access sink. `write` must write all of `bytes`.
pub trait Writable {
    fn write(&mut self, pos: u64, bytes: &[u8]) -> Result<()>;
}

/// Releases the underlying handle. Must be called on every exit path.
pub trait Closeable {
    fn close(&mut self) -> Result<()>;
}

/// The concrete file-backed I/O collaborator used by the CLI.
pub struct FileIo {
    file: Option<File>,
}

impl FileIo {
    pub fn open_read_write(path: &std::path::Path) -> Result<FileIo> {
        let file = std::fs::OpenOptions::new().read(true).write(true).open(path)?;
        Ok(FileIo { file: Some(file) })
    }

    fn file_mut(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::IOError(std::io::Error::new(std::io::ErrorKind::NotConnected, "handle already closed")))
    }
}

impl Readable for FileIo {
    fn read(&mut self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(pos))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }
}

impl Writable for FileIo {
    fn write(&mut self, pos: u64, bytes: &[u8]) -> Result<()> {
        let file = self.file_mut()?;
        file.seek(SeekFrom::Start(pos))?;
        file.write_all(bytes)?;
        Ok(())
    }
}

impl Closeable for FileIo {
    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for FileIo {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// An in-memory `Readable`/`Writable`/`Closeable` over a growable `Vec<u8>`,
/// used by the core's own tests so they can exercise the full
/// read-mutate-write pipeline without touching the filesystem.
#[derive(Debug, Default, Clone)]
pub struct SliceIo {
    buffer: Vec<u8>,
    closed: bool,
}

impl SliceIo {
    pub fn new(buffer: Vec<u8>) -> SliceIo {
        SliceIo { buffer, closed: false }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

impl Readable for SliceIo {
    fn read(&mut self, pos: u64, len: usize) -> Result<Vec<u8>> {
        let start = pos as usize;
        let end = start
            .checked_add(len)
            .ok_or_else(|| Error::IOError(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "read out of range")))?;
        if end > self.buffer.len() {
            return Err(Error::IOError(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read: wanted {} bytes at {}, buffer is {} bytes", len, pos, self.buffer.len()),
            )));
        }
        Ok(self.buffer[start..end].to_vec())
    }
}

impl Writable for SliceIo {
    fn write(&mut self, pos: u64, bytes: &[u8]) -> Result<()> {
        let start = pos as usize;
        let end = start + bytes.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[start..end].copy_from_slice(bytes);
        Ok(())
    }
}

impl Closeable for SliceIo {
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_io_round_trips_writes() {
        let mut io = SliceIo::new(vec![0u8; 16]);
        io.write(4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(io.read(4, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn slice_io_grows_on_write_past_end() {
        let mut io = SliceIo::new(vec![]);
        io.write(8, &[0xAA]).unwrap();
        assert_eq!(io.as_slice().len(), 9);
        assert_eq!(io.as_slice()[8], 0xAA);
    }

    #[test]
    fn slice_io_short_read_is_an_error() {
        let mut io = SliceIo::new(vec![0u8; 4]);
        assert!(io.read(0, 8).is_err());
    }
}
