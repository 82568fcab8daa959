//! Keymap rebind table codec
//!
//! The device stores rebinds as a fixed table of packed 11-byte records:
//!
//! ```text
//! struct __attribute__((packed)) zmk_config_keymap_item {
//!     uint16_t key;      // bits 0..3 layer, bits 4..15 key position
//!     uint8_t  device;   // behavior id
//!     uint32_t param1;
//!     uint32_t param2;
//! };
//! ```
//!
//! Unused slots hold `0xFF` in every byte. A record whose first word is
//! [`EMPTY_SLOT_WORD`] is an empty slot and is always dropped when decoding.

use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::record::{RecordReader, RecordWriter};
use crate::{CodecError, CodecResult};

/// Size of one packed rebind record in bytes
pub const KEY_DEF_LEN: usize = 11;

/// Number of rebind slots the firmware reserves
pub const DEFAULT_REBIND_CAPACITY: usize = 64;

/// Packed key/layer word marking an empty slot
pub const EMPTY_SLOT_WORD: u16 = 0xFFFF;

/// Largest key position that fits the 12-bit field
pub const MAX_KEY: u16 = 0x0FFF;

/// Largest layer index that fits the 4-bit field
pub const MAX_LAYER: u8 = 0x0F;

/// One keymap rebind: the behavior bound to `key` on `layer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyDef {
    /// Key position index, 12 bits
    pub key: u16,
    /// Layer index, 4 bits
    pub layer: u8,
    /// Behavior id
    pub device: u8,
    /// First behavior parameter
    pub param1: u32,
    /// Second behavior parameter
    pub param2: u32,
}

impl KeyDef {
    /// Build a rebind, checking that key and layer fit their bit fields.
    pub fn new(key: u16, layer: u8, device: u8, param1: u32, param2: u32) -> CodecResult<Self> {
        let def = Self {
            key,
            layer,
            device,
            param1,
            param2,
        };
        def.validate()?;
        Ok(def)
    }

    pub fn validate(&self) -> CodecResult<()> {
        if self.key > MAX_KEY {
            return Err(CodecError::FieldOutOfRange {
                field: "key",
                value: u32::from(self.key),
                max: u32::from(MAX_KEY),
            });
        }
        if self.layer > MAX_LAYER {
            return Err(CodecError::FieldOutOfRange {
                field: "layer",
                value: u32::from(self.layer),
                max: u32::from(MAX_LAYER),
            });
        }
        Ok(())
    }

    /// Packed key/layer word: layer in the low nibble, key above it
    pub fn packed_word(&self) -> u16 {
        (u16::from(self.layer) & 0x000F) | ((self.key & MAX_KEY) << 4)
    }

    pub fn is_empty_slot(&self) -> bool {
        self.packed_word() == EMPTY_SLOT_WORD
    }

    pub fn behavior(&self) -> Option<Behavior> {
        Behavior::from_id(self.device)
    }

    fn read(reader: &mut RecordReader<'_>) -> CodecResult<Self> {
        let word = reader.read_u16_le()?;
        let device = reader.read_u8()?;
        let param1 = reader.read_u32_le()?;
        let param2 = reader.read_u32_le()?;
        Ok(Self {
            key: word >> 4,
            layer: (word & 0x000F) as u8,
            device,
            param1,
            param2,
        })
    }

    fn write(&self, writer: &mut RecordWriter) {
        writer
            .write_u16_le(self.packed_word())
            .write_u8(self.device)
            .write_u32_le(self.param1)
            .write_u32_le(self.param2);
    }
}

/// Decode a rebind table, dropping empty slots.
///
/// The buffer must hold a whole number of [`KEY_DEF_LEN`] records.
pub fn decode_key_defs(bytes: &[u8]) -> CodecResult<Vec<KeyDef>> {
    if bytes.len() % KEY_DEF_LEN != 0 {
        return Err(CodecError::MisalignedRecords {
            record: "KeyDef",
            stride: KEY_DEF_LEN,
            len: bytes.len(),
        });
    }

    let mut reader = RecordReader::new(bytes);
    let mut defs = Vec::with_capacity(bytes.len() / KEY_DEF_LEN);
    while reader.remaining() > 0 {
        let def = KeyDef::read(&mut reader)?;
        if !def.is_empty_slot() {
            defs.push(def);
        }
    }
    Ok(defs)
}

/// Encode rebinds into a `capacity`-slot table padded with empty slots.
pub fn encode_key_defs(defs: &[KeyDef], capacity: usize) -> CodecResult<Vec<u8>> {
    if defs.len() > capacity {
        return Err(CodecError::CapacityExceeded {
            capacity,
            requested: defs.len(),
        });
    }

    let total = capacity
        .checked_mul(KEY_DEF_LEN)
        .ok_or(CodecError::CapacityExceeded {
            capacity,
            requested: defs.len(),
        })?;

    let mut writer = RecordWriter::with_capacity(total);
    for (index, def) in defs.iter().enumerate() {
        def.validate()?;
        if def.is_empty_slot() {
            return Err(CodecError::ReservedSlot { index });
        }
        def.write(&mut writer);
    }
    writer.fill_to(total, 0xFF);
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_word_layout() -> CodecResult<()> {
        let def = KeyDef::new(100, 5, 6, 0x1234_5678, 0)?;
        assert_eq!(def.packed_word(), 1605);
        assert_eq!(def.packed_word(), 0x0645);
        Ok(())
    }

    #[test]
    fn test_encode_first_record_bytes() -> CodecResult<()> {
        let def = KeyDef::new(100, 5, 6, 0x1234_5678, 0)?;
        let bytes = encode_key_defs(&[def], DEFAULT_REBIND_CAPACITY)?;

        assert_eq!(bytes.len(), DEFAULT_REBIND_CAPACITY * KEY_DEF_LEN);
        assert_eq!(bytes.get(..2), Some(&[0x45, 0x06][..]));
        assert_eq!(bytes.get(2), Some(&6));
        assert_eq!(bytes.get(3..7), Some(&[0x78, 0x56, 0x34, 0x12][..]));
        assert_eq!(bytes.get(7..11), Some(&[0, 0, 0, 0][..]));
        assert!(bytes.iter().skip(KEY_DEF_LEN).all(|b| *b == 0xFF));
        Ok(())
    }

    #[test]
    fn test_decode_drops_sentinel_regardless_of_payload() -> CodecResult<()> {
        let mut bytes = vec![0xFF, 0xFF, 0x06, 0x01, 0x02, 0x03, 0x04, 0, 0, 0, 9];
        bytes.extend_from_slice(&[0x0D, 0x00, 0x06, 0x05, 0x00, 0x07, 0x00, 0, 0, 0, 0]);

        let defs = decode_key_defs(&bytes)?;
        assert_eq!(defs, vec![KeyDef::new(0, 13, 6, 0x0007_0005, 0)?]);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_misaligned_length() {
        let result = decode_key_defs(&[0u8; 5]);
        assert_eq!(
            result,
            Err(CodecError::MisalignedRecords {
                record: "KeyDef",
                stride: KEY_DEF_LEN,
                len: 5
            })
        );
    }

    #[test]
    fn test_decode_empty_buffer() -> CodecResult<()> {
        assert!(decode_key_defs(&[])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_encode_capacity_exceeded() -> CodecResult<()> {
        let def = KeyDef::new(1, 0, 6, 0, 0)?;
        let defs = vec![def; DEFAULT_REBIND_CAPACITY + 1];
        assert_eq!(
            encode_key_defs(&defs, DEFAULT_REBIND_CAPACITY),
            Err(CodecError::CapacityExceeded {
                capacity: 64,
                requested: 65
            })
        );
        Ok(())
    }

    #[test]
    fn test_encode_rejects_out_of_range_and_sentinel() {
        let too_wide = KeyDef {
            key: 0x1000,
            layer: 0,
            device: 0,
            param1: 0,
            param2: 0,
        };
        assert!(matches!(
            encode_key_defs(&[too_wide], 4),
            Err(CodecError::FieldOutOfRange { field: "key", .. })
        ));

        let sentinel = KeyDef {
            key: MAX_KEY,
            layer: MAX_LAYER,
            device: 6,
            param1: 0,
            param2: 0,
        };
        assert_eq!(
            encode_key_defs(&[sentinel], 4),
            Err(CodecError::ReservedSlot { index: 0 })
        );
    }

    #[test]
    fn test_new_rejects_wide_layer() {
        assert!(matches!(
            KeyDef::new(0, 16, 0, 0, 0),
            Err(CodecError::FieldOutOfRange { field: "layer", .. })
        ));
    }

    #[test]
    fn test_behavior_lookup() -> CodecResult<()> {
        let def = KeyDef::new(13, 0, 6, 0x0007_0005, 0)?;
        assert_eq!(def.behavior(), Some(Behavior::KeyPress));
        Ok(())
    }
}
