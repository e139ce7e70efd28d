//! Configuration options for seglog.

use crate::index::ENTRY_WIDTH;
use crate::{Error, Result};

/// Default store size (in bytes) that triggers segment rollover.
pub const DEFAULT_MAX_STORE_BYTES: u64 = 1024;

/// Default pre-grown size (in bytes) of each index file.
pub const DEFAULT_MAX_INDEX_BYTES: u64 = 1024;

/// Log configuration options.
///
/// A zero value for `max_store_bytes` or `max_index_bytes` is normalized
/// to the corresponding default when the log opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Store size triggering segment rollover.
    pub max_store_bytes: u64,

    /// Pre-grown size of each index file; caps entries per segment at
    /// `max_index_bytes / 12`.
    pub max_index_bytes: u64,

    /// Base offset used when creating the first segment of an empty log.
    pub initial_offset: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_MAX_STORE_BYTES,
            max_index_bytes: DEFAULT_MAX_INDEX_BYTES,
            initial_offset: 0,
        }
    }
}

impl Options {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with zero sizes replaced by the defaults.
    pub(crate) fn normalized(&self) -> Self {
        let mut opts = self.clone();
        if opts.max_store_bytes == 0 {
            opts.max_store_bytes = DEFAULT_MAX_STORE_BYTES;
        }
        if opts.max_index_bytes == 0 {
            opts.max_index_bytes = DEFAULT_MAX_INDEX_BYTES;
        }
        opts
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.max_index_bytes < ENTRY_WIDTH {
            return Err(Error::InvalidConfiguration(format!(
                "max_index_bytes must hold at least one {}-byte entry",
                ENTRY_WIDTH
            )));
        }
        Ok(())
    }
}

/// Builder for Options.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max_store_bytes.
    pub fn max_store_bytes(mut self, bytes: u64) -> Self {
        self.options.max_store_bytes = bytes;
        self
    }

    /// Set max_index_bytes.
    pub fn max_index_bytes(mut self, bytes: u64) -> Self {
        self.options.max_index_bytes = bytes;
        self
    }

    /// Set initial_offset.
    pub fn initial_offset(mut self, offset: u64) -> Self {
        self.options.initial_offset = offset;
        self
    }

    /// Build the options.
    pub fn build(self) -> Result<Options> {
        let options = self.options.normalized();
        options.validate()?;
        Ok(options)
    }
}
