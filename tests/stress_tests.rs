//! Stress tests for concurrency and durability.

use std::io::Read;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use seglog::{Log, OptionsBuilder};
use tempfile::TempDir;

/// Many appender threads: every append gets a unique offset and the
/// final offset sequence is dense.
#[test]
fn stress_concurrent_appenders() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(
        Log::open(
            dir.path(),
            OptionsBuilder::new()
                .max_store_bytes(4096)
                .max_index_bytes(4096)
                .build()
                .unwrap(),
        )
        .unwrap(),
    );

    let num_threads = 8;
    let appends_per_thread = 250;

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                let mut offsets = Vec::with_capacity(appends_per_thread);
                for i in 0..appends_per_thread {
                    let payload = format!("thread{:02}_record{:04}", t, i);
                    offsets.push(log.append(payload.as_bytes()).unwrap());
                }
                offsets
            })
        })
        .collect();

    let mut offsets: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    offsets.sort_unstable();

    let total = (num_threads * appends_per_thread) as u64;
    let expected: Vec<u64> = (0..total).collect();
    assert_eq!(offsets, expected);
    assert_eq!(log.highest_offset().unwrap(), total - 1);
}

/// Readers chasing a single writer always observe committed records
/// intact.
#[test]
fn stress_readers_chase_writer() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(
        Log::open(
            dir.path(),
            OptionsBuilder::new()
                .max_store_bytes(1024)
                .max_index_bytes(1024)
                .build()
                .unwrap(),
        )
        .unwrap(),
    );

    let total = 500u64;

    let writer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for i in 0..total {
                let payload = format!("record_{:04}", i);
                assert_eq!(log.append(payload.as_bytes()).unwrap(), i);
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                let mut seen = 0u64;
                while seen < total {
                    let highest = log.highest_offset().unwrap();
                    for offset in 0..=highest.min(total - 1) {
                        // highest_offset is 0 for an empty log too; the
                        // read is only guaranteed once the offset exists.
                        if let Ok(record) = log.read(offset) {
                            assert_eq!(record.offset, offset);
                            assert_eq!(
                                record.value,
                                Bytes::from(format!("record_{:04}", offset))
                            );
                            seen = seen.max(offset + 1);
                        }
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

/// The whole-log reader taken mid-write yields only complete frames.
#[test]
fn stress_reader_sees_complete_frames() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(
        Log::open(
            dir.path(),
            OptionsBuilder::new()
                .max_store_bytes(512)
                .max_index_bytes(512)
                .build()
                .unwrap(),
        )
        .unwrap(),
    );

    let writer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for i in 0..400 {
                let payload = format!("payload_{:04}", i);
                log.append(payload.as_bytes()).unwrap();
            }
        })
    };

    for _ in 0..10 {
        let mut bytes = Vec::new();
        log.reader().unwrap().read_to_end(&mut bytes).unwrap();

        let mut at = 0;
        while at < bytes.len() {
            assert!(at + 8 <= bytes.len(), "torn length prefix");
            let len = u64::from_be_bytes(bytes[at..at + 8].try_into().unwrap()) as usize;
            at += 8;
            assert!(at + len <= bytes.len(), "torn frame body");
            at += len;
        }
        thread::yield_now();
    }

    writer.join().unwrap();
}

/// Heavy append volume across many segments survives a restart.
#[test]
fn stress_restart_after_many_segments() {
    let dir = TempDir::new().unwrap();
    let options = OptionsBuilder::new()
        .max_store_bytes(256)
        .max_index_bytes(256)
        .build()
        .unwrap();

    let total = 1000u64;
    {
        let log = Log::open(dir.path(), options.clone()).unwrap();
        for i in 0..total {
            let payload = format!("record_{:04}", i);
            assert_eq!(log.append(payload.as_bytes()).unwrap(), i);
        }
        log.close().unwrap();
    }

    let log = Log::open(dir.path(), options).unwrap();
    assert_eq!(log.lowest_offset().unwrap(), 0);
    assert_eq!(log.highest_offset().unwrap(), total - 1);
    for offset in (0..total).step_by(97) {
        assert_eq!(
            log.read(offset).unwrap().value,
            Bytes::from(format!("record_{:04}", offset))
        );
    }
}
