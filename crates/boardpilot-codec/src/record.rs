//! Bounded little-endian readers and writers for packed device records

use crate::{CodecError, CodecResult};

/// Sequential reader over a packed record buffer
///
/// Every read is bounds-checked; running past the end yields
/// [`CodecError::UnexpectedEnd`].
pub struct RecordReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn take<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let end = self.position.checked_add(N).ok_or(CodecError::UnexpectedEnd {
            offset: self.position,
            needed: N,
        })?;
        let bytes = self
            .buffer
            .get(self.position..end)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or(CodecError::UnexpectedEnd {
                offset: self.position,
                needed: N,
            })?;
        self.position = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let [b] = self.take::<1>()?;
        Ok(b)
    }

    pub fn read_u16_le(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    pub fn read_u32_le(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    pub fn read_i32_le(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.take::<4>()?))
    }

    pub fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count).min(self.buffer.len());
    }
}

/// Appending writer producing a packed record buffer
pub struct RecordWriter {
    buffer: Vec<u8>,
}

impl RecordWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_i32_le(&mut self, value: i32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Pad with `value` until the buffer is `len` bytes long
    pub fn fill_to(&mut self, len: usize, value: u8) -> &mut Self {
        if self.buffer.len() < len {
            self.buffer.resize(len, value);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for RecordWriter {
    fn default() -> Self {
        Self::with_capacity(32)
    }
}
