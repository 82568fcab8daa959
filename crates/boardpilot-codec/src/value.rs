//! Typed field payloads

use serde::{Deserialize, Serialize};

use crate::field::ConfigField;
use crate::keymap::{DEFAULT_REBIND_CAPACITY, KeyDef, decode_key_defs, encode_key_defs};
use crate::scalar::{DateTimeValue, decode_u8_scalar, decode_u16_scalar};
use crate::trackpad::TrackpadRegisters;
use crate::CodecResult;

/// Decoded payload of a config field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Keymap(Vec<KeyDef>),
    TrackpadRegisters(TrackpadRegisters),
    Sensitivity(u8),
    SleepTimeout(u16),
    ScrollDirection(u8),
    ClickType(u8),
    DateTime(DateTimeValue),
    /// Payload with no typed layout (device info, display code, unknown ids)
    Raw(Vec<u8>),
}

impl FieldValue {
    /// Encode back into the wire payload.
    ///
    /// Keymaps are written as a full table of [`DEFAULT_REBIND_CAPACITY`] slots.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        Ok(match self {
            FieldValue::Keymap(defs) => encode_key_defs(defs, DEFAULT_REBIND_CAPACITY)?,
            FieldValue::TrackpadRegisters(regs) => regs.encode().to_vec(),
            FieldValue::Sensitivity(v) | FieldValue::ScrollDirection(v) | FieldValue::ClickType(v) => {
                vec![*v]
            }
            FieldValue::SleepTimeout(v) => v.to_le_bytes().to_vec(),
            FieldValue::DateTime(dt) => dt.encode(),
            FieldValue::Raw(bytes) => bytes.clone(),
        })
    }
}

/// Decode the payload of `field` into its typed form.
///
/// Fields without a typed layout come back as [`FieldValue::Raw`].
pub fn decode_field_value(field: ConfigField, bytes: &[u8]) -> CodecResult<FieldValue> {
    let value = match field {
        ConfigField::Keymap => FieldValue::Keymap(decode_key_defs(bytes)?),
        ConfigField::CustomIqs5xxRegs => {
            FieldValue::TrackpadRegisters(TrackpadRegisters::decode(bytes)?)
        }
        ConfigField::MouseSensitivity
        | ConfigField::ScrollSensitivity
        | ConfigField::PanSensitivity => {
            FieldValue::Sensitivity(decode_u8_scalar("Sensitivity", bytes)?)
        }
        ConfigField::SleepTimeout | ConfigField::PeripheralSleepTimeout => {
            FieldValue::SleepTimeout(decode_u16_scalar("SleepTimeout", bytes)?)
        }
        ConfigField::ScrollDirection => {
            FieldValue::ScrollDirection(decode_u8_scalar("ScrollDirection", bytes)?)
        }
        ConfigField::TrackpadClickType => {
            FieldValue::ClickType(decode_u8_scalar("ClickType", bytes)?)
        }
        ConfigField::DateTime => FieldValue::DateTime(DateTimeValue::decode(bytes)?),
        ConfigField::Invalid
        | ConfigField::DeviceInfo
        | ConfigField::DisplayCode
        | ConfigField::Unknown(_) => FieldValue::Raw(bytes.to_vec()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodecError;

    #[test]
    fn test_sensitivity_field() -> CodecResult<()> {
        let value = decode_field_value(ConfigField::ScrollSensitivity, &[40])?;
        assert_eq!(value, FieldValue::Sensitivity(40));
        assert_eq!(value.encode()?, vec![40]);
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_raw() -> CodecResult<()> {
        let value = decode_field_value(ConfigField::Unknown(0x6001), &[1, 2, 3])?;
        assert_eq!(value, FieldValue::Raw(vec![1, 2, 3]));
        Ok(())
    }

    #[test]
    fn test_keymap_field_encodes_full_table() -> CodecResult<()> {
        let value = FieldValue::Keymap(vec![KeyDef::new(3, 1, 6, 4, 0)?]);
        let bytes = value.encode()?;
        assert_eq!(bytes.len(), 64 * 11);
        assert_eq!(decode_field_value(ConfigField::Keymap, &bytes)?, value);
        Ok(())
    }

    #[test]
    fn test_length_errors_surface() {
        assert!(matches!(
            decode_field_value(ConfigField::CustomIqs5xxRegs, &[0; 4]),
            Err(CodecError::LengthMismatch { .. })
        ));
        assert!(matches!(
            decode_field_value(ConfigField::DateTime, &[0; 4]),
            Err(CodecError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_serde_shape() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(FieldValue::SleepTimeout(15))?;
        assert_eq!(json, serde_json::json!({ "kind": "sleep_timeout", "value": 15 }));
        Ok(())
    }
}
