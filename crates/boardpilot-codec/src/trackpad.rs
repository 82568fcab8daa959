//! IQS5xx trackpad register block
//!
//! Layout of `CUSTOM_IQS5XX_REGS`, 20 bytes little-endian:
//!
//! | Off | Type | Field |
//! |-----|------|-------|
//! | 0   | u16  | active refresh rate |
//! | 2   | u16  | idle refresh rate |
//! | 4   | u8   | single finger gestures |
//! | 5   | u8   | multi finger gestures |
//! | 6   | u16  | tap time |
//! | 8   | u16  | tap distance |
//! | 10  | u8   | touch multiplier |
//! | 11  | u8   | debounce |
//! | 12  | u8   | i2c timeout |
//! | 13  | u8   | filter settings |
//! | 14  | u8   | dynamic filter bottom beta |
//! | 15  | u8   | dynamic filter lower speed |
//! | 16  | u16  | dynamic filter upper speed |
//! | 18  | u16  | initial scroll distance |

use serde::{Deserialize, Serialize};

use crate::record::{RecordReader, RecordWriter};
use crate::{CodecError, CodecResult};

/// Size of the register block in bytes
pub const TRACKPAD_REGS_LEN: usize = 20;

/// Single finger gesture enable bits
pub mod single_finger {
    pub const SINGLE_TAP: u8 = 1 << 0;
    pub const TAP_AND_HOLD: u8 = 1 << 1;
    pub const SWIPE_X_NEG: u8 = 1 << 2;
    pub const SWIPE_X_POS: u8 = 1 << 3;
    pub const SWIPE_Y_POS: u8 = 1 << 4;
    pub const SWIPE_Y_NEG: u8 = 1 << 5;

    pub const LABELS: [(u8, &str); 6] = [
        (SINGLE_TAP, "single tap"),
        (TAP_AND_HOLD, "tap and hold"),
        (SWIPE_X_NEG, "swipe x-"),
        (SWIPE_X_POS, "swipe x+"),
        (SWIPE_Y_POS, "swipe y+"),
        (SWIPE_Y_NEG, "swipe y-"),
    ];
}

/// Multi finger gesture enable bits
pub mod multi_finger {
    pub const TWO_FINGER_TAP: u8 = 1 << 0;
    pub const SCROLL: u8 = 1 << 1;
    pub const ZOOM: u8 = 1 << 2;

    pub const LABELS: [(u8, &str); 3] = [
        (TWO_FINGER_TAP, "two finger tap"),
        (SCROLL, "scroll"),
        (ZOOM, "zoom"),
    ];
}

/// Touch filter enable bits
pub mod filter {
    pub const IIR_DYNAMIC: u8 = 1 << 0;
    pub const MAV: u8 = 1 << 1;
    pub const IIR_STATIC: u8 = 1 << 2;
    pub const ALP_COUNT: u8 = 1 << 3;

    pub const LABELS: [(u8, &str); 4] = [
        (IIR_DYNAMIC, "iir dynamic"),
        (MAV, "mav"),
        (IIR_STATIC, "iir static"),
        (ALP_COUNT, "alp count"),
    ];
}

/// Labels of the bits set in `mask`, in bit order
pub fn active_labels<const N: usize>(mask: u8, labels: &[(u8, &'static str); N]) -> Vec<&'static str> {
    labels
        .iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|(_, label)| *label)
        .collect()
}

/// Typed view of the IQS5xx register block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackpadRegisters {
    pub active_refresh_rate: u16,
    pub idle_refresh_rate: u16,
    pub single_finger_gestures: u8,
    pub multi_finger_gestures: u8,
    pub tap_time: u16,
    pub tap_distance: u16,
    pub touch_multiplier: u8,
    pub debounce: u8,
    pub i2c_timeout: u8,
    pub filter_settings: u8,
    pub filter_dyn_bottom_beta: u8,
    pub filter_dyn_lower_speed: u8,
    pub filter_dyn_upper_speed: u16,
    pub init_scroll_distance: u16,
}

impl Default for TrackpadRegisters {
    /// Firmware defaults
    fn default() -> Self {
        Self {
            active_refresh_rate: 10,
            idle_refresh_rate: 50,
            single_finger_gestures: single_finger::SINGLE_TAP | single_finger::TAP_AND_HOLD,
            multi_finger_gestures: multi_finger::TWO_FINGER_TAP | multi_finger::SCROLL,
            tap_time: 150,
            tap_distance: 25,
            touch_multiplier: 0,
            debounce: 0,
            i2c_timeout: 4,
            filter_settings: filter::IIR_DYNAMIC | filter::MAV,
            filter_dyn_bottom_beta: 5,
            filter_dyn_lower_speed: 5,
            filter_dyn_upper_speed: 512,
            init_scroll_distance: 25,
        }
    }
}

impl TrackpadRegisters {
    /// Decode the register block; the buffer must be exactly 20 bytes.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() != TRACKPAD_REGS_LEN {
            return Err(CodecError::LengthMismatch {
                record: "TrackpadRegisters",
                expected: TRACKPAD_REGS_LEN,
                actual: bytes.len(),
            });
        }

        let mut r = RecordReader::new(bytes);
        Ok(Self {
            active_refresh_rate: r.read_u16_le()?,
            idle_refresh_rate: r.read_u16_le()?,
            single_finger_gestures: r.read_u8()?,
            multi_finger_gestures: r.read_u8()?,
            tap_time: r.read_u16_le()?,
            tap_distance: r.read_u16_le()?,
            touch_multiplier: r.read_u8()?,
            debounce: r.read_u8()?,
            i2c_timeout: r.read_u8()?,
            filter_settings: r.read_u8()?,
            filter_dyn_bottom_beta: r.read_u8()?,
            filter_dyn_lower_speed: r.read_u8()?,
            filter_dyn_upper_speed: r.read_u16_le()?,
            init_scroll_distance: r.read_u16_le()?,
        })
    }

    pub fn encode(&self) -> [u8; TRACKPAD_REGS_LEN] {
        let mut w = RecordWriter::with_capacity(TRACKPAD_REGS_LEN);
        w.write_u16_le(self.active_refresh_rate)
            .write_u16_le(self.idle_refresh_rate)
            .write_u8(self.single_finger_gestures)
            .write_u8(self.multi_finger_gestures)
            .write_u16_le(self.tap_time)
            .write_u16_le(self.tap_distance)
            .write_u8(self.touch_multiplier)
            .write_u8(self.debounce)
            .write_u8(self.i2c_timeout)
            .write_u8(self.filter_settings)
            .write_u8(self.filter_dyn_bottom_beta)
            .write_u8(self.filter_dyn_lower_speed)
            .write_u16_le(self.filter_dyn_upper_speed)
            .write_u16_le(self.init_scroll_distance);

        let mut out = [0u8; TRACKPAD_REGS_LEN];
        for (slot, byte) in out.iter_mut().zip(w.as_slice()) {
            *slot = *byte;
        }
        out
    }

    pub fn single_finger_labels(&self) -> Vec<&'static str> {
        active_labels(self.single_finger_gestures, &single_finger::LABELS)
    }

    pub fn multi_finger_labels(&self) -> Vec<&'static str> {
        active_labels(self.multi_finger_gestures, &multi_finger::LABELS)
    }

    pub fn filter_labels(&self) -> Vec<&'static str> {
        active_labels(self.filter_settings, &filter::LABELS)
    }

    /// Set a register by its snake_case name.
    ///
    /// Returns `FieldOutOfRange` when `value` does not fit the register width
    /// and `None` when no register has that name.
    pub fn set_by_name(&mut self, name: &str, value: u32) -> Option<CodecResult<()>> {
        fn narrow_u8(field: &'static str, value: u32) -> CodecResult<u8> {
            u8::try_from(value).map_err(|_overflow| CodecError::FieldOutOfRange {
                field,
                value,
                max: u32::from(u8::MAX),
            })
        }
        fn narrow_u16(field: &'static str, value: u32) -> CodecResult<u16> {
            u16::try_from(value).map_err(|_overflow| CodecError::FieldOutOfRange {
                field,
                value,
                max: u32::from(u16::MAX),
            })
        }

        let result = match name {
            "active_refresh_rate" => {
                narrow_u16("active_refresh_rate", value).map(|v| self.active_refresh_rate = v)
            }
            "idle_refresh_rate" => {
                narrow_u16("idle_refresh_rate", value).map(|v| self.idle_refresh_rate = v)
            }
            "single_finger_gestures" => {
                narrow_u8("single_finger_gestures", value).map(|v| self.single_finger_gestures = v)
            }
            "multi_finger_gestures" => {
                narrow_u8("multi_finger_gestures", value).map(|v| self.multi_finger_gestures = v)
            }
            "tap_time" => narrow_u16("tap_time", value).map(|v| self.tap_time = v),
            "tap_distance" => narrow_u16("tap_distance", value).map(|v| self.tap_distance = v),
            "touch_multiplier" => {
                narrow_u8("touch_multiplier", value).map(|v| self.touch_multiplier = v)
            }
            "debounce" => narrow_u8("debounce", value).map(|v| self.debounce = v),
            "i2c_timeout" => narrow_u8("i2c_timeout", value).map(|v| self.i2c_timeout = v),
            "filter_settings" => {
                narrow_u8("filter_settings", value).map(|v| self.filter_settings = v)
            }
            "filter_dyn_bottom_beta" => {
                narrow_u8("filter_dyn_bottom_beta", value).map(|v| self.filter_dyn_bottom_beta = v)
            }
            "filter_dyn_lower_speed" => {
                narrow_u8("filter_dyn_lower_speed", value).map(|v| self.filter_dyn_lower_speed = v)
            }
            "filter_dyn_upper_speed" => narrow_u16("filter_dyn_upper_speed", value)
                .map(|v| self.filter_dyn_upper_speed = v),
            "init_scroll_distance" => {
                narrow_u16("init_scroll_distance", value).map(|v| self.init_scroll_distance = v)
            }
            _ => return None,
        };
        Some(result)
    }

    /// Register names accepted by [`TrackpadRegisters::set_by_name`], in wire order
    pub const REGISTER_NAMES: [&'static str; 14] = [
        "active_refresh_rate",
        "idle_refresh_rate",
        "single_finger_gestures",
        "multi_finger_gestures",
        "tap_time",
        "tap_distance",
        "touch_multiplier",
        "debounce",
        "i2c_timeout",
        "filter_settings",
        "filter_dyn_bottom_beta",
        "filter_dyn_lower_speed",
        "filter_dyn_upper_speed",
        "init_scroll_distance",
    ];
}
