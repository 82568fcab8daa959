//! Config field registry
//!
//! Maps symbolic configuration field names to the stable 16-bit ids used on
//! the wire. Ids are never renumbered; new fields are only appended. Ids this
//! build does not know decode to [`ConfigField::Unknown`] so newer firmware
//! and services keep working.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Address class of a field id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRange {
    /// `0x0000`, never valid on the wire
    Invalid,
    /// `0x0001..=0x3FFF`, saved to non-volatile storage by the device
    Persisted,
    /// `0x4000..=0x7FFF`, volatile values such as the clock
    Transient,
    /// `0x8000..=0xFFFF`, vendor specific fields
    Custom,
}

impl FieldRange {
    pub fn of(id: u16) -> Self {
        match id {
            0x0000 => FieldRange::Invalid,
            0x0001..=0x3FFF => FieldRange::Persisted,
            0x4000..=0x7FFF => FieldRange::Transient,
            _ => FieldRange::Custom,
        }
    }
}

/// Configuration field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum ConfigField {
    /// Reserved invalid key
    Invalid,
    /// Device information (`struct zmk_config_device_info`)
    DeviceInfo,
    /// Sleep timeout, u16 (0 = never)
    SleepTimeout,
    /// Peripheral half sleep timeout, u16 (0 = never)
    PeripheralSleepTimeout,
    /// Keymap rebind table
    Keymap,
    /// Pointer sensitivity, u8
    MouseSensitivity,
    /// Vertical scroll sensitivity, u8
    ScrollSensitivity,
    /// Horizontal pan sensitivity, u8
    PanSensitivity,
    /// Scroll direction, u8
    ScrollDirection,
    /// Trackpad click type, u8 (0 = normal, 1 = left/right halves)
    TrackpadClickType,
    /// Display bitmap code
    DisplayCode,
    /// Clock: i32 unix timestamp followed by i32 UTC offset in seconds
    DateTime,
    /// IQS5xx trackpad IC register block
    CustomIqs5xxRegs,
    /// An id this build does not know about
    Unknown(u16),
}

impl ConfigField {
    /// Every named field, in id order
    pub const KNOWN: [ConfigField; 12] = [
        ConfigField::DeviceInfo,
        ConfigField::SleepTimeout,
        ConfigField::PeripheralSleepTimeout,
        ConfigField::Keymap,
        ConfigField::MouseSensitivity,
        ConfigField::ScrollSensitivity,
        ConfigField::PanSensitivity,
        ConfigField::ScrollDirection,
        ConfigField::TrackpadClickType,
        ConfigField::DisplayCode,
        ConfigField::DateTime,
        ConfigField::CustomIqs5xxRegs,
    ];

    pub const fn from_id(id: u16) -> Self {
        match id {
            0x0000 => ConfigField::Invalid,
            0x0001 => ConfigField::DeviceInfo,
            0x000A => ConfigField::SleepTimeout,
            0x000B => ConfigField::PeripheralSleepTimeout,
            0x0020 => ConfigField::Keymap,
            0x0040 => ConfigField::MouseSensitivity,
            0x0041 => ConfigField::ScrollSensitivity,
            0x0042 => ConfigField::PanSensitivity,
            0x0043 => ConfigField::ScrollDirection,
            0x0044 => ConfigField::TrackpadClickType,
            0x0060 => ConfigField::DisplayCode,
            0x4000 => ConfigField::DateTime,
            // 0x6001 was a short-lived alias for the IQS5xx block and is not accepted.
            0x8001 => ConfigField::CustomIqs5xxRegs,
            other => ConfigField::Unknown(other),
        }
    }

    pub const fn id(self) -> u16 {
        match self {
            ConfigField::Invalid => 0x0000,
            ConfigField::DeviceInfo => 0x0001,
            ConfigField::SleepTimeout => 0x000A,
            ConfigField::PeripheralSleepTimeout => 0x000B,
            ConfigField::Keymap => 0x0020,
            ConfigField::MouseSensitivity => 0x0040,
            ConfigField::ScrollSensitivity => 0x0041,
            ConfigField::PanSensitivity => 0x0042,
            ConfigField::ScrollDirection => 0x0043,
            ConfigField::TrackpadClickType => 0x0044,
            ConfigField::DisplayCode => 0x0060,
            ConfigField::DateTime => 0x4000,
            ConfigField::CustomIqs5xxRegs => 0x8001,
            ConfigField::Unknown(id) => id,
        }
    }

    /// Symbolic name, or `None` for unknown ids
    pub const fn name(self) -> Option<&'static str> {
        match self {
            ConfigField::Invalid => Some("INVALID"),
            ConfigField::DeviceInfo => Some("DEVICE_INFO"),
            ConfigField::SleepTimeout => Some("SLEEP_TIMEOUT"),
            ConfigField::PeripheralSleepTimeout => Some("PERIPHERAL_SLEEP_TIMEOUT"),
            ConfigField::Keymap => Some("KEYMAP"),
            ConfigField::MouseSensitivity => Some("MOUSE_SENSITIVITY"),
            ConfigField::ScrollSensitivity => Some("SCROLL_SENSITIVITY"),
            ConfigField::PanSensitivity => Some("PAN_SENSITIVITY"),
            ConfigField::ScrollDirection => Some("SCROLL_DIRECTION"),
            ConfigField::TrackpadClickType => Some("TP_CLICK_TYPE"),
            ConfigField::DisplayCode => Some("DISPLAY_CODE"),
            ConfigField::DateTime => Some("DATETIME"),
            ConfigField::CustomIqs5xxRegs => Some("CUSTOM_IQS5XX_REGS"),
            ConfigField::Unknown(_) => None,
        }
    }

    /// Parse a field from its symbolic name or numeric id.
    ///
    /// Names are matched case-insensitively with `-` treated as `_`. Numbers
    /// may be decimal or `0x` prefixed hex; unknown numeric ids are accepted.
    pub fn from_name(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return u16::from_str_radix(hex, 16).ok().map(Self::from_id);
        }
        if let Ok(id) = trimmed.parse::<u16>() {
            return Some(Self::from_id(id));
        }

        let normalized = trimmed.replace('-', "_").to_ascii_uppercase();
        Self::KNOWN
            .into_iter()
            .find(|field| field.name() == Some(normalized.as_str()))
    }

    pub const fn range(self) -> FieldRange {
        match self.id() {
            0x0000 => FieldRange::Invalid,
            0x0001..=0x3FFF => FieldRange::Persisted,
            0x4000..=0x7FFF => FieldRange::Transient,
            _ => FieldRange::Custom,
        }
    }

    /// Whether the device saves this field to non-volatile storage
    pub const fn is_persisted(self) -> bool {
        matches!(self.range(), FieldRange::Persisted)
    }

    /// Whether the device only holds this field in RAM; saving it is refused
    pub const fn is_transient(self) -> bool {
        matches!(self.range(), FieldRange::Transient)
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, ConfigField::Unknown(_))
    }
}

impl From<u16> for ConfigField {
    fn from(id: u16) -> Self {
        ConfigField::from_id(id)
    }
}

impl From<ConfigField> for u16 {
    fn from(field: ConfigField) -> Self {
        field.id()
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "UNKNOWN({:#06x})", self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids_are_stable() {
        assert_eq!(ConfigField::DeviceInfo.id(), 0x0001);
        assert_eq!(ConfigField::SleepTimeout.id(), 0x000A);
        assert_eq!(ConfigField::Keymap.id(), 0x0020);
        assert_eq!(ConfigField::MouseSensitivity.id(), 0x0040);
        assert_eq!(ConfigField::ScrollSensitivity.id(), 0x0041);
        assert_eq!(ConfigField::PanSensitivity.id(), 0x0042);
        assert_eq!(ConfigField::DisplayCode.id(), 0x0060);
        assert_eq!(ConfigField::DateTime.id(), 0x4000);
        assert_eq!(ConfigField::CustomIqs5xxRegs.id(), 0x8001);
    }

    #[test]
    fn test_id_round_trip_for_every_known_field() {
        for field in ConfigField::KNOWN {
            assert_eq!(ConfigField::from_id(field.id()), field);
            assert!(field.is_known());
        }
    }

    #[test]
    fn test_unknown_id_is_preserved() {
        let field = ConfigField::from_id(0x1234);
        assert_eq!(field, ConfigField::Unknown(0x1234));
        assert_eq!(field.id(), 0x1234);
        assert_eq!(field.name(), None);
        assert_eq!(field.to_string(), "UNKNOWN(0x1234)");
    }

    #[test]
    fn test_deprecated_iqs_alias_is_unknown() {
        assert_eq!(ConfigField::from_id(0x6001), ConfigField::Unknown(0x6001));
    }

    #[test]
    fn test_ranges() {
        assert_eq!(ConfigField::Invalid.range(), FieldRange::Invalid);
        assert_eq!(ConfigField::Keymap.range(), FieldRange::Persisted);
        assert_eq!(ConfigField::DateTime.range(), FieldRange::Transient);
        assert_eq!(ConfigField::CustomIqs5xxRegs.range(), FieldRange::Custom);
        assert_eq!(FieldRange::of(0x3FFF), FieldRange::Persisted);
        assert_eq!(FieldRange::of(0x8000), FieldRange::Custom);
        assert!(ConfigField::MouseSensitivity.is_persisted());
        assert!(!ConfigField::DateTime.is_persisted());
        assert!(ConfigField::DateTime.is_transient());
        assert!(!ConfigField::CustomIqs5xxRegs.is_transient());
        assert!(!ConfigField::Keymap.is_transient());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            ConfigField::from_name("MOUSE_SENSITIVITY"),
            Some(ConfigField::MouseSensitivity)
        );
        assert_eq!(
            ConfigField::from_name("mouse-sensitivity"),
            Some(ConfigField::MouseSensitivity)
        );
        assert_eq!(ConfigField::from_name("0x0020"), Some(ConfigField::Keymap));
        assert_eq!(ConfigField::from_name("64"), Some(ConfigField::MouseSensitivity));
        assert_eq!(
            ConfigField::from_name("0xBEEF"),
            Some(ConfigField::Unknown(0xBEEF))
        );
        assert_eq!(ConfigField::from_name("not-a-field"), None);
    }

    #[test]
    fn test_serde_uses_numeric_id() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&ConfigField::Keymap)?;
        assert_eq!(json, "32");

        let field: ConfigField = serde_json::from_str("32769")?;
        assert_eq!(field, ConfigField::CustomIqs5xxRegs);
        Ok(())
    }
}
