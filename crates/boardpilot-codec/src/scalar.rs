//! Fixed-width scalar fields: sensitivities, timeouts and the device clock

use serde::{Deserialize, Serialize};

use crate::record::{RecordReader, RecordWriter};
use crate::{CodecError, CodecResult};

/// Size of the `DATETIME` payload in bytes
pub const DATETIME_LEN: usize = 8;

fn expect_len(record: &'static str, bytes: &[u8], expected: usize) -> CodecResult<()> {
    if bytes.len() != expected {
        return Err(CodecError::LengthMismatch {
            record,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Decode a one-byte field such as a sensitivity.
pub fn decode_u8_scalar(record: &'static str, bytes: &[u8]) -> CodecResult<u8> {
    expect_len(record, bytes, 1)?;
    RecordReader::new(bytes).read_u8()
}

/// Decode a little-endian u16 field such as a sleep timeout.
pub fn decode_u16_scalar(record: &'static str, bytes: &[u8]) -> CodecResult<u16> {
    expect_len(record, bytes, 2)?;
    RecordReader::new(bytes).read_u16_le()
}

/// Device clock: unix timestamp plus the local UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateTimeValue {
    /// Seconds since the unix epoch
    pub unix_timestamp: i32,
    /// Local offset from UTC in seconds, east positive
    pub utc_offset_secs: i32,
}

impl DateTimeValue {
    pub fn new(unix_timestamp: i32, utc_offset_secs: i32) -> Self {
        Self {
            unix_timestamp,
            utc_offset_secs,
        }
    }

    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        expect_len("DateTime", bytes, DATETIME_LEN)?;
        let mut reader = RecordReader::new(bytes);
        Ok(Self {
            unix_timestamp: reader.read_i32_le()?,
            utc_offset_secs: reader.read_i32_le()?,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = RecordWriter::with_capacity(DATETIME_LEN);
        writer
            .write_i32_le(self.unix_timestamp)
            .write_i32_le(self.utc_offset_secs);
        writer.into_inner()
    }
}
