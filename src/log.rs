//! The log: an ordered directory of segments.
//!
//! Appends go to the active (tail) segment, rolling over to a fresh
//! segment when the active one fills up. Reads locate the segment owning
//! the requested offset. Old segments can be dropped as whole prefixes
//! for bounded retention, and the raw store bytes of the entire log can
//! be streamed for snapshotting or replication.
//!
//! # Thread Safety
//!
//! The log is thread-safe and can be shared across threads using Arc.
//! Appends, truncation, and lifecycle operations take the writer side of
//! a reader-writer lock; reads and offset queries take the reader side.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::options::Options;
use crate::record::Record;
use crate::segment::Segment;
use crate::store::Store;
use crate::util::filename::list_base_offsets;
use crate::{Error, Result};

/// A durable, segmented, append-only commit log.
pub struct Log {
    dir: PathBuf,
    options: Options,
    inner: RwLock<LogInner>,
}

struct LogInner {
    segments: Vec<Segment>,
    closed: bool,
}

impl LogInner {
    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn active(&self) -> Result<&Segment> {
        self.segments
            .last()
            .ok_or_else(|| Error::internal("log holds no segments"))
    }

    fn active_mut(&mut self) -> Result<&mut Segment> {
        self.segments
            .last_mut()
            .ok_or_else(|| Error::internal("log holds no segments"))
    }

    fn highest_offset(&self) -> Result<u64> {
        let next = self.active()?.next_offset();
        Ok(if next == 0 { 0 } else { next - 1 })
    }
}

impl Log {
    /// Open (creating if absent) the log stored in `dir`.
    ///
    /// Existing segments are discovered from the directory contents; an
    /// empty directory gets one segment based at the configured initial
    /// offset. Zero-valued size options are replaced by their defaults.
    pub fn open(dir: impl AsRef<Path>, options: Options) -> Result<Log> {
        let dir = dir.as_ref().to_path_buf();
        let options = options.normalized();
        options.validate()?;
        fs::create_dir_all(&dir)?;

        let segments = Self::load_segments(&dir, &options)?;
        Ok(Log {
            dir,
            options,
            inner: RwLock::new(LogInner {
                segments,
                closed: false,
            }),
        })
    }

    fn load_segments(dir: &Path, options: &Options) -> Result<Vec<Segment>> {
        let bases = list_base_offsets(dir)?;
        let mut segments = Vec::with_capacity(bases.len().max(1));
        for base in bases {
            segments.push(Segment::open(dir, base, options)?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(dir, options.initial_offset, options)?);
        }

        info!(
            dir = %dir.display(),
            segments = segments.len(),
            "log opened"
        );
        Ok(segments)
    }

    /// Append `value` to the log and return its assigned offset.
    ///
    /// Rolls over to a new segment first when the active one is maxed.
    pub fn append(&self, value: &[u8]) -> Result<u64> {
        let mut inner = self.inner.write();
        inner.check_open()?;

        if inner.active()?.is_maxed() {
            // next_offset equals highest_offset + 1 for a non-empty log
            // and 0 for a log that has never been written.
            let base = inner.active()?.next_offset();
            debug!(base_offset = base, "active segment maxed; rolling over");
            let segment = Segment::open(&self.dir, base, &self.options)?;
            inner.segments.push(segment);
        }

        inner.active_mut()?.append(value)
    }

    /// Read the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read();
        inner.check_open()?;

        let segment = inner
            .segments
            .iter()
            .find(|s| s.contains(offset))
            .ok_or(Error::OffsetOutOfRange(offset))?;
        segment.read(offset)
    }

    /// Offset of the oldest record still held by the log.
    pub fn lowest_offset(&self) -> Result<u64> {
        let inner = self.inner.read();
        inner.check_open()?;
        inner
            .segments
            .first()
            .map(Segment::base_offset)
            .ok_or_else(|| Error::internal("log holds no segments"))
    }

    /// Offset of the newest record held by the log, or 0 when nothing
    /// has ever been appended.
    pub fn highest_offset(&self) -> Result<u64> {
        let inner = self.inner.read();
        inner.check_open()?;
        inner.highest_offset()
    }

    /// Drop every segment whose records all have offsets at or below
    /// `lowest`.
    ///
    /// If that leaves no segments, a fresh one is installed at the old
    /// next offset so subsequent appends continue the dense offset
    /// sequence.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut inner = self.inner.write();
        inner.check_open()?;

        let next_offset = inner.active()?.next_offset();
        let mut retained = Vec::with_capacity(inner.segments.len());
        let mut first_err = None;
        for mut segment in std::mem::take(&mut inner.segments) {
            if segment.next_offset() <= lowest.saturating_add(1) {
                if let Err(err) = segment.remove() {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            } else {
                retained.push(segment);
            }
        }

        if retained.is_empty() {
            retained.push(Segment::open(&self.dir, next_offset, &self.options)?);
        }
        debug!(lowest, segments = retained.len(), "log truncated");
        inner.segments = retained;

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Return a reader over the concatenated raw store bytes of every
    /// segment, in order, each from byte 0.
    ///
    /// The stream is the exact on-disk frame layout and can be used to
    /// snapshot or replicate the log. The reader snapshots the segment
    /// list at creation time.
    pub fn reader(&self) -> Result<LogReader> {
        let inner = self.inner.read();
        inner.check_open()?;
        Ok(LogReader {
            stores: inner.segments.iter().map(Segment::store).collect(),
            current: 0,
            position: 0,
        })
    }

    /// Close every segment. Idempotent; operations after close fail
    /// with `Closed`.
    ///
    /// On failure the remaining segments are still closed best-effort
    /// and the first error is returned.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;

        let mut first_err = None;
        for segment in inner.segments.iter_mut() {
            if let Err(err) = segment.close() {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Close the log and delete its directory.
    pub fn remove(&self) -> Result<()> {
        self.close()?;
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Remove the log, then re-initialize it empty and ready for use.
    pub fn reset(&self) -> Result<()> {
        self.remove()?;

        let mut inner = self.inner.write();
        fs::create_dir_all(&self.dir)?;
        inner.segments = Self::load_segments(&self.dir, &self.options)?;
        inner.closed = false;
        Ok(())
    }

    /// The directory holding the log's segment files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The normalized options the log runs with.
    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// Streaming reader over the whole log's raw store bytes.
///
/// Created by [`Log::reader`]. Yields the stores of every segment in
/// order, as they were at creation time. A segment removed by a
/// concurrent truncation is treated as exhausted: its store yields no
/// further bytes and the stream continues with the remaining segments.
pub struct LogReader {
    stores: Vec<Arc<Store>>,
    current: usize,
    position: u64,
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.current < self.stores.len() {
            match self.stores[self.current].read_at(buf, self.position) {
                Ok(0) => {}
                Ok(n) => {
                    self.position += n as u64;
                    return Ok(n);
                }
                // Truncation closed this store out from under us; it has
                // nothing more to yield.
                Err(Error::Closed) => {}
                Err(err) => {
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, err));
                }
            }
            self.current += 1;
            self.position = 0;
        }
        Ok(0)
    }
}
