//! CRC32 checksum utilities.

use crc32fast::Hasher;

/// Compute CRC32 checksum of multiple data slices, as if concatenated.
pub fn crc32_multi(slices: &[&[u8]]) -> u32 {
    let mut hasher = Hasher::new();
    for slice in slices {
        hasher.update(slice);
    }
    hasher.finalize()
}
