//! Append-only store of length-prefixed record frames.
//!
//! The store file is a concatenation of frames, each an 8-byte big-endian
//! length followed by that many body bytes. Appends go through a write
//! buffer to amortize syscalls on small records; every read flushes the
//! buffer first so it always observes complete frames.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::{Error, Result};

/// Bytes used for the length prefix of each frame.
pub(crate) const LEN_WIDTH: u64 = 8;

/// Append-only framed byte store over a single file.
///
/// All operations are serialized under a mutex: the write buffer is
/// shared mutable state between appends and reads.
pub(crate) struct Store {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    writer: BufWriter<File>,
    size: u64,
    closed: bool,
}

impl StoreInner {
    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

impl Store {
    /// Open (creating if absent) the store file at `path`.
    ///
    /// The current file length becomes the store size, so a store
    /// reopened over existing data appends after the last frame.
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();

        Ok(Store {
            path,
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
                closed: false,
            }),
        })
    }

    /// Append a frame holding `body` and return `(bytes_written, position)`.
    ///
    /// `position` is the byte offset of the frame's length prefix; it is
    /// what the index records for the appended record.
    pub fn append(&self, body: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        inner.check_open()?;

        let position = inner.size;
        let len_prefix = (body.len() as u64).to_be_bytes();
        let write = match inner.writer.write_all(&len_prefix) {
            Ok(()) => inner.writer.write_all(body),
            Err(err) => Err(err),
        };
        if let Err(err) = write {
            // The buffer may now hold a partial frame; the store is no
            // longer safe to append to.
            inner.closed = true;
            return Err(err.into());
        }

        let written = LEN_WIDTH + body.len() as u64;
        inner.size += written;
        Ok((written, position))
    }

    /// Read the frame body stored at `position`.
    pub fn read(&self, position: u64) -> Result<Bytes> {
        let mut inner = self.inner.lock();
        inner.check_open()?;
        inner.writer.flush()?;

        let size = inner.size;
        if position.saturating_add(LEN_WIDTH) > size {
            return Err(Error::EndOfFile);
        }

        let file = inner.writer.get_mut();
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.seek(SeekFrom::Start(position))?;
        file.read_exact(&mut len_buf)?;

        let len = u64::from_be_bytes(len_buf);
        match (position + LEN_WIDTH).checked_add(len) {
            Some(end) if end <= size => {}
            _ => {
                return Err(Error::corruption(format!(
                    "frame at position {} claims {} bytes past the store end",
                    position, len
                )))
            }
        }

        let mut body = vec![0u8; len as usize];
        file.read_exact(&mut body)?;
        Ok(Bytes::from(body))
    }

    /// Read raw store bytes starting at `offset` into `buf`.
    ///
    /// Returns the number of bytes read; 0 signals the end of the store.
    /// This is the primitive behind the whole-log reader.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut inner = self.inner.lock();
        inner.check_open()?;
        inner.writer.flush()?;

        if offset >= inner.size {
            return Ok(0);
        }

        let file = inner.writer.get_mut();
        file.seek(SeekFrom::Start(offset))?;
        Ok(file.read(buf)?)
    }

    /// Current store size in bytes (the position of the next append).
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the write buffer, sync the file, and close the store.
    ///
    /// Idempotent; every operation after close fails with `Closed`.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        inner.closed = true;
        Ok(())
    }
}
