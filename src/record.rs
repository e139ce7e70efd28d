//! Record type and its binary codec.
//!
//! A record is an opaque payload plus the offset the log assigned to it.
//! The codec produces the body stored inside a store frame:
//!
//! ```text
//! [offset: u64 BE][crc32: u32 BE][value bytes]
//! ```
//!
//! The checksum covers the offset field and the value, so a read that
//! lands on the wrong frame or on damaged bytes is detected at decode
//! time instead of being served to the caller.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::util::crc::crc32_multi;
use crate::{Error, Result};

/// Width of the offset field in an encoded record body.
const OFFSET_FIELD_WIDTH: usize = 8;

/// Width of the checksum field in an encoded record body.
const CRC_WIDTH: usize = 4;

/// Fixed header bytes preceding the value in an encoded record body.
pub(crate) const RECORD_HEADER_WIDTH: usize = OFFSET_FIELD_WIDTH + CRC_WIDTH;

/// A single log record: an opaque value and its assigned offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Offset assigned by the log.
    pub offset: u64,
    /// Opaque payload bytes.
    pub value: Bytes,
}

impl Record {
    /// Create a record with the given offset and value.
    pub fn new(offset: u64, value: impl Into<Bytes>) -> Self {
        Self {
            offset,
            value: value.into(),
        }
    }

    /// Encode the record into a store-frame body.
    pub fn encode(&self) -> Bytes {
        let offset_bytes = self.offset.to_be_bytes();
        let mut buf = BytesMut::with_capacity(RECORD_HEADER_WIDTH + self.value.len());
        buf.put_u64(self.offset);
        buf.put_u32(crc32_multi(&[&offset_bytes[..], &self.value[..]]));
        buf.put_slice(&self.value);
        buf.freeze()
    }

    /// Decode a record from a store-frame body, verifying its checksum.
    pub fn decode(mut body: Bytes) -> Result<Record> {
        if body.len() < RECORD_HEADER_WIDTH {
            return Err(Error::corruption(format!(
                "record body too short: {} bytes",
                body.len()
            )));
        }

        let offset = body.get_u64();
        let stored = body.get_u32();
        let offset_bytes = offset.to_be_bytes();
        let computed = crc32_multi(&[&offset_bytes[..], &body[..]]);
        if stored != computed {
            return Err(Error::corruption(format!(
                "record checksum mismatch at offset {}: stored {:#010x}, computed {:#010x}",
                offset, stored, computed
            )));
        }

        Ok(Record {
            offset,
            value: body,
        })
    }
}
