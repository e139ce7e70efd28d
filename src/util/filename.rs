//! Segment file naming conventions.
//!
//! A log directory contains two files per segment, both named after the
//! segment's base offset in plain decimal: `<base_offset>.store` and
//! `<base_offset>.index`. No other files are expected in the directory.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Extension of the store (record data) file of a segment.
pub const STORE_EXT: &str = "store";

/// Extension of the index file of a segment.
pub const INDEX_EXT: &str = "index";

/// Generate the store file path for a segment.
pub fn store_file_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{}.{}", base_offset, STORE_EXT))
}

/// Generate the index file path for a segment.
pub fn index_file_path(dir: &Path, base_offset: u64) -> PathBuf {
    dir.join(format!("{}.{}", base_offset, INDEX_EXT))
}

/// Parse a file name and return the base offset it belongs to.
///
/// Returns `None` if the name doesn't match the `<u64>.store` /
/// `<u64>.index` pattern.
pub fn parse_base_offset(name: &str) -> Option<u64> {
    let (stem, ext) = name.rsplit_once('.')?;
    if ext != STORE_EXT && ext != INDEX_EXT {
        return None;
    }
    stem.parse::<u64>().ok()
}

/// List the base offsets of all segments in a log directory, sorted
/// ascending and deduplicated.
///
/// Each segment contributes its base offset twice (once per file);
/// deduplication collapses the pair. Files that don't follow the segment
/// naming convention are skipped with a warning.
pub fn list_base_offsets(dir: &Path) -> std::io::Result<Vec<u64>> {
    let mut bases = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        match parse_base_offset(&name) {
            Some(base) => bases.push(base),
            None => warn!(file = %name, "ignoring unrecognized file in log directory"),
        }
    }

    bases.sort_unstable();
    bases.dedup();
    Ok(bases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_paths() {
        let dir = Path::new("/data/log");

        assert_eq!(store_file_path(dir, 0), Path::new("/data/log/0.store"));
        assert_eq!(index_file_path(dir, 0), Path::new("/data/log/0.index"));
        assert_eq!(
            store_file_path(dir, 1234),
            Path::new("/data/log/1234.store")
        );
        assert_eq!(
            index_file_path(dir, 1234),
            Path::new("/data/log/1234.index")
        );
    }

    #[test]
    fn test_parse_base_offset() {
        assert_eq!(parse_base_offset("0.store"), Some(0));
        assert_eq!(parse_base_offset("0.index"), Some(0));
        assert_eq!(parse_base_offset("18446744073709551615.store"), Some(u64::MAX));

        assert_eq!(parse_base_offset("0.log"), None);
        assert_eq!(parse_base_offset("abc.store"), None);
        assert_eq!(parse_base_offset("store"), None);
        assert_eq!(parse_base_offset("-1.index"), None);
        assert_eq!(parse_base_offset(""), None);
    }

    #[test]
    fn test_list_base_offsets() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();

        std::fs::write(store_file_path(dir, 0), "").unwrap();
        std::fs::write(index_file_path(dir, 0), "").unwrap();
        std::fs::write(store_file_path(dir, 17), "").unwrap();
        std::fs::write(index_file_path(dir, 17), "").unwrap();
        std::fs::write(store_file_path(dir, 5), "").unwrap();
        std::fs::write(index_file_path(dir, 5), "").unwrap();
        std::fs::write(dir.join("notes.txt"), "").unwrap();

        let bases = list_base_offsets(dir).unwrap();
        assert_eq!(bases, vec![0, 5, 17]);
    }

    #[test]
    fn test_list_base_offsets_empty() {
        let temp_dir = tempdir().unwrap();
        let bases = list_base_offsets(temp_dir.path()).unwrap();
        assert!(bases.is_empty());
    }
}
