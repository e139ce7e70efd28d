//! Memory-mapped offset index.
//!
//! The index is a dense array of fixed-width entries mapping a record's
//! relative offset to its byte position in the store:
//!
//! ```text
//! [rel_offset: u32 BE][position: u64 BE]   (12 bytes per entry)
//! ```
//!
//! A mapped file cannot change length, so the file is grown to its
//! maximum size up front and the logical size (entries in use) is
//! tracked out of band. Closing the index truncates the file back to the
//! logical size; reopening after a clean close therefore recovers the
//! entry count from the file length alone. After an unclean shutdown the
//! file keeps its pre-grown length and the entry count is lost; size
//! recovery assumes clean shutdown.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::{Error, Result};

/// Bytes used for the relative-offset field of an entry.
pub(crate) const OFFSET_WIDTH: u64 = 4;

/// Bytes used for the store-position field of an entry.
pub(crate) const POSITION_WIDTH: u64 = 8;

/// Total bytes per index entry.
pub(crate) const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// Fixed-width, memory-mapped offset index for one segment.
///
/// The index carries no lock of its own; callers serialize access at the
/// log level.
pub(crate) struct Index {
    file: File,
    path: PathBuf,
    mmap: Option<MmapMut>,
    size: u64,
}

impl Index {
    /// Open (creating if absent) the index file at `path`, pre-growing
    /// it to `max_index_bytes` and mapping it read-write.
    ///
    /// The file's length before growing becomes the logical size, which
    /// is how a cleanly closed index recovers its entry count.
    pub fn open(path: impl AsRef<Path>, max_index_bytes: u64) -> Result<Index> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        // If the configured maximum shrank since the last run, entries
        // past the new mapping are unreachable; keep size on an entry
        // boundary inside the mapping.
        let size = file.metadata()?.len().min(max_index_bytes) / ENTRY_WIDTH * ENTRY_WIDTH;

        file.set_len(max_index_bytes)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Index {
            file,
            path,
            mmap: Some(mmap),
            size,
        })
    }

    /// Append an entry. Fails with `IndexFull` when the mapped region
    /// has no room for another entry.
    pub fn write(&mut self, rel_offset: u32, position: u64) -> Result<()> {
        let size = self.size;
        let map = self.mmap.as_mut().ok_or(Error::Closed)?;
        if size + ENTRY_WIDTH > map.len() as u64 {
            return Err(Error::IndexFull);
        }

        let at = size as usize;
        let mid = at + OFFSET_WIDTH as usize;
        let end = at + ENTRY_WIDTH as usize;
        map[at..mid].copy_from_slice(&rel_offset.to_be_bytes());
        map[mid..end].copy_from_slice(&position.to_be_bytes());
        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Read the entry for relative offset `rel`.
    ///
    /// Fails with `EndOfFile` when the index is empty or `rel` lies past
    /// the last entry.
    pub fn read(&self, rel: u64) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(Error::EndOfFile);
        }
        let end = rel
            .checked_add(1)
            .and_then(|n| n.checked_mul(ENTRY_WIDTH))
            .ok_or(Error::EndOfFile)?;
        if end > self.size {
            return Err(Error::EndOfFile);
        }

        let map = self.mmap.as_ref().ok_or(Error::Closed)?;
        let at = (rel * ENTRY_WIDTH) as usize;
        let mid = at + OFFSET_WIDTH as usize;
        let rel_offset = u32::from_be_bytes(map[at..mid].try_into().unwrap());
        let position = u64::from_be_bytes(map[mid..at + ENTRY_WIDTH as usize].try_into().unwrap());
        Ok((rel_offset, position))
    }

    /// Read the last entry, from which a segment recovers its next
    /// offset on open.
    pub fn read_last(&self) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(Error::EndOfFile);
        }
        self.read(self.size / ENTRY_WIDTH - 1)
    }

    /// Whether the mapped region has no room for another entry.
    pub fn is_full(&self) -> bool {
        match &self.mmap {
            Some(map) => self.size + ENTRY_WIDTH > map.len() as u64,
            None => true,
        }
    }

    /// Logical size in bytes (entries in use times entry width).
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and drop the mapping, sync the file, and truncate it to the
    /// logical size so the entry count survives reopening.
    ///
    /// Idempotent; reads and writes after close fail with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        if let Some(map) = self.mmap.take() {
            map.flush()?;
            // The mapping must be gone before the file can shrink.
            drop(map);
            self.file.sync_all()?;
            self.file.set_len(self.size)?;
        }
        Ok(())
    }
}
