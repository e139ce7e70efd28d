//! A segment couples one store with one index under a base offset.
//!
//! The log appends to its active segment; the segment assigns offsets,
//! writes the encoded record to the store, and records the offset-to-
//! position mapping in the index.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error};

use crate::index::Index;
use crate::options::Options;
use crate::record::Record;
use crate::store::Store;
use crate::util::filename::{index_file_path, store_file_path};
use crate::{Error, Result};

/// A store/index pair covering the contiguous offset range
/// `[base_offset, next_offset)`.
pub(crate) struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    max_store_bytes: u64,
    max_index_bytes: u64,
    poisoned: bool,
}

impl Segment {
    /// Open (creating if absent) the segment based at `base_offset` in
    /// `dir`.
    ///
    /// The next offset to assign is recovered from the index's last
    /// entry; an empty index means the segment holds no records yet.
    pub fn open(dir: &Path, base_offset: u64, options: &Options) -> Result<Segment> {
        let store = Arc::new(Store::open(store_file_path(dir, base_offset))?);
        let index = Index::open(index_file_path(dir, base_offset), options.max_index_bytes)?;

        let next_offset = match index.read_last() {
            Ok((rel, _)) => base_offset + u64::from(rel) + 1,
            Err(Error::EndOfFile) => base_offset,
            Err(err) => return Err(err),
        };
        debug!(base_offset, next_offset, "segment opened");

        Ok(Segment {
            store,
            index,
            base_offset,
            next_offset,
            max_store_bytes: options.max_store_bytes,
            max_index_bytes: options.max_index_bytes,
            poisoned: false,
        })
    }

    /// Append `value` as the next record and return its offset.
    ///
    /// If the index write fails after the store write succeeded, the
    /// store holds a record with no index entry. The segment is then
    /// poisoned: the failed offset is not consumed, further appends are
    /// refused, and `is_maxed` reports true so the log rolls over to a
    /// fresh segment based at the same offset. The orphaned store bytes
    /// are never served.
    pub fn append(&mut self, value: &[u8]) -> Result<u64> {
        if self.poisoned {
            return Err(Error::Closed);
        }

        let offset = self.next_offset;
        let record = Record::new(offset, Bytes::copy_from_slice(value));
        let (_, position) = self.store.append(&record.encode())?;

        let rel = (offset - self.base_offset) as u32;
        if let Err(err) = self.index.write(rel, position) {
            self.poisoned = true;
            error!(
                base_offset = self.base_offset,
                offset,
                %err,
                "index write failed after store append; segment poisoned"
            );
            return Err(err);
        }

        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        if !self.contains(offset) {
            return Err(Error::OffsetOutOfRange(offset));
        }

        let (_, position) = self.index.read(offset - self.base_offset)?;
        let record = Record::decode(self.store.read(position)?)?;
        if record.offset != offset {
            return Err(Error::corruption(format!(
                "index entry for offset {} points at record {}",
                offset, record.offset
            )));
        }
        Ok(record)
    }

    /// Whether `offset` falls inside this segment's range.
    pub fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    /// Whether the segment can take no more appends.
    pub fn is_maxed(&self) -> bool {
        self.poisoned
            || self.store.size() >= self.max_store_bytes
            || self.index.size() >= self.max_index_bytes
            || self.index.is_full()
    }

    /// Offset of the segment's first record.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Offset the next appended record will receive.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Shared handle to the segment's store, for the whole-log reader.
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Close the index, then the store.
    ///
    /// Both closes are attempted even if the first fails; the first
    /// error is returned.
    pub fn close(&mut self) -> Result<()> {
        let index = self.index.close();
        let store = self.store.close();
        index.and(store)
    }

    /// Close the segment and delete both of its files.
    pub fn remove(&mut self) -> Result<()> {
        debug!(base_offset = self.base_offset, "removing segment");
        self.close()?;
        fs::remove_file(self.index.path())?;
        fs::remove_file(self.store.path())?;
        Ok(())
    }
}
