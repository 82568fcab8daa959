//! Command implementations for boardctl

pub mod config;
pub mod datetime;
pub mod device;
pub mod field;
pub mod keymap;
pub mod sensitivity;
pub mod trackpad;

use std::path::PathBuf;

use boardpilot_codec::{Behavior, ConfigField};
use clap::Subcommand;

use crate::config::AppConfig;

/// Options shared by every command
pub struct Context {
    pub json: bool,
    pub config: AppConfig,
    pub config_path: PathBuf,
    /// Serial given with `--device`
    pub device: Option<String>,
}

impl Context {
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

#[derive(Subcommand)]
pub enum DeviceCommands {
    /// List connected keyboards
    List {
        /// Show USB ids and connection details
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print connect and disconnect events until interrupted
    Watch,

    /// Make a keyboard the default target for later commands
    Select {
        /// Serial number
        serial: String,
    },
}

#[derive(Subcommand)]
pub enum FieldCommands {
    /// List known config fields
    List,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Read a config field
    Read {
        /// Field name or id, e.g. mouse_sensitivity or 0x40
        #[arg(value_parser = parse_field)]
        field: ConfigField,
        /// Print the payload as hex instead of decoding it
        #[arg(long)]
        raw: bool,
    },

    /// Write a raw hex payload to a config field
    Write {
        #[arg(value_parser = parse_field)]
        field: ConfigField,
        /// Payload as hex
        data: String,
        /// Apply without persisting to flash
        #[arg(long)]
        no_save: bool,
    },
}

#[derive(Subcommand)]
pub enum KeymapCommands {
    /// Show keymap rebinds
    Show,

    /// Bind a behavior to a key on a layer, replacing any existing rebind
    Set {
        /// Key position
        key: u16,
        /// Layer index
        layer: u8,
        /// Behavior name or id, e.g. KEY_PRESS or 6
        #[arg(value_parser = parse_behavior)]
        behavior: u8,
        /// First behavior parameter
        #[arg(default_value = "0", value_parser = parse_u32)]
        param1: u32,
        /// Second behavior parameter
        #[arg(default_value = "0", value_parser = parse_u32)]
        param2: u32,
        #[arg(long)]
        no_save: bool,
    },

    /// Remove one rebind, or all of them
    Clear {
        /// Key position; omit with --all
        #[arg(required_unless_present = "all", requires = "layer")]
        key: Option<u16>,
        /// Layer index
        layer: Option<u8>,
        /// Remove every rebind
        #[arg(long, conflicts_with = "key")]
        all: bool,
        #[arg(long)]
        no_save: bool,
    },
}

#[derive(Subcommand)]
pub enum TrackpadCommands {
    /// Show the trackpad register block
    Show,

    /// Change one register
    Set {
        /// Register name, e.g. tap_time
        register: String,
        #[arg(value_parser = parse_u32)]
        value: u32,
        #[arg(long)]
        no_save: bool,
    },

    /// Restore firmware default registers
    Defaults {
        #[arg(long)]
        no_save: bool,
    },
}

#[derive(Subcommand)]
pub enum SensitivityCommands {
    /// Show mouse, scroll and pan sensitivity
    Show,

    /// Set one sensitivity
    Set {
        #[arg(value_enum)]
        kind: SensitivityKind,
        value: u8,
        #[arg(long)]
        no_save: bool,
    },
}

#[derive(Subcommand)]
pub enum DatetimeCommands {
    /// Set the keyboard clock from the host clock
    Sync,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensitivityKind {
    Mouse,
    Scroll,
    Pan,
}

impl SensitivityKind {
    pub const ALL: [SensitivityKind; 3] = [
        SensitivityKind::Mouse,
        SensitivityKind::Scroll,
        SensitivityKind::Pan,
    ];

    pub fn field(self) -> ConfigField {
        match self {
            SensitivityKind::Mouse => ConfigField::MouseSensitivity,
            SensitivityKind::Scroll => ConfigField::ScrollSensitivity,
            SensitivityKind::Pan => ConfigField::PanSensitivity,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensitivityKind::Mouse => "mouse",
            SensitivityKind::Scroll => "scroll",
            SensitivityKind::Pan => "pan",
        }
    }
}

pub fn parse_field(input: &str) -> Result<ConfigField, String> {
    ConfigField::from_name(input).ok_or_else(|| format!("unknown config field '{input}'"))
}

/// Decimal or `0x` prefixed hex
pub fn parse_u32(input: &str) -> Result<u32, String> {
    let trimmed = input.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid number '{input}': {e}"))
}

pub fn parse_behavior(input: &str) -> Result<u8, String> {
    if let Some(behavior) = Behavior::from_name(input) {
        return Ok(behavior.id());
    }
    let id = parse_u32(input)?;
    u8::try_from(id)
        .ok()
        .and_then(Behavior::from_id)
        .map(Behavior::id)
        .ok_or_else(|| format!("unknown behavior '{input}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers() {
        assert_eq!(parse_u32("0x70005"), Ok(0x0007_0005));
        assert_eq!(parse_u32("42"), Ok(42));
        assert!(parse_u32("0xzz").is_err());
    }

    #[test]
    fn parse_behaviors_by_name_and_id() {
        assert_eq!(parse_behavior("key_press"), Ok(Behavior::KeyPress.id()));
        assert_eq!(parse_behavior("6"), Ok(6));
        assert!(parse_behavior("200").is_err());
        assert!(parse_behavior("nope").is_err());
    }

    #[test]
    fn parse_fields() {
        assert_eq!(parse_field("mouse-sensitivity"), Ok(ConfigField::MouseSensitivity));
        assert_eq!(parse_field("0x8001"), Ok(ConfigField::CustomIqs5xxRegs));
        assert!(parse_field("bogus").is_err());
    }
}
