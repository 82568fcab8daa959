//! Keymap behavior ids carried in the `device` byte of a rebind record

/// ZMK behavior referenced by a keymap rebind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Behavior {
    Transparent = 0,
    Backlight = 1,
    Bluetooth = 2,
    CapsWord = 3,
    ExtPower = 4,
    GraveEscape = 5,
    KeyPress = 6,
    KeyRepeat = 7,
    KeyToggle = 8,
    LayerTap = 9,
    MacroTap = 10,
    MacroPress = 11,
    MacroRelease = 12,
    MacroTapTime = 13,
    MacroWaitTime = 14,
    MacroWaitRelease = 15,
    ModTap = 16,
    MomentaryLayer = 17,
    MouseKeyPress = 18,
    MouseMove = 19,
    MouseScroll = 20,
    None = 21,
    Outputs = 22,
    Reset = 23,
    Bootloader = 24,
    RgbUnderglow = 25,
    EncoderKeyPress = 26,
    StickyKey = 27,
    StickyLayer = 28,
    ToLayer = 29,
    ToggleLayer = 30,
}

/// Short names as the firmware config tables spell them, indexed by id
const NAMES: [&str; 31] = [
    "TRANS",
    "BCKLGHT",
    "BLUETOOTH",
    "CAPS_WORD",
    "EXT_POWER",
    "GRAVE_ESCAPE",
    "KEY_PRESS",
    "KEY_REPEAT",
    "KEY_TOGGLE",
    "LAYER_TAP",
    "MAC_TAP",
    "MAC_PRESS",
    "MAC_REL",
    "MAC_TAP_TIME",
    "MAC_WAIT_TIME",
    "MAC_WAIT_REL",
    "MOD_TAP",
    "MO",
    "MOUSE_KEY_PRESS",
    "MOUSE_MOVE",
    "MOUSE_SCROLL",
    "NONE",
    "OUTPUTS",
    "RESET",
    "BOOTLOAD",
    "RGB_UG",
    "ENC_KEY_PRESS",
    "STICKY_KEY",
    "STICKY_LAYER",
    "TO_LAYER",
    "TOGGLE_LAYER",
];

const ALL: [Behavior; 31] = [
    Behavior::Transparent,
    Behavior::Backlight,
    Behavior::Bluetooth,
    Behavior::CapsWord,
    Behavior::ExtPower,
    Behavior::GraveEscape,
    Behavior::KeyPress,
    Behavior::KeyRepeat,
    Behavior::KeyToggle,
    Behavior::LayerTap,
    Behavior::MacroTap,
    Behavior::MacroPress,
    Behavior::MacroRelease,
    Behavior::MacroTapTime,
    Behavior::MacroWaitTime,
    Behavior::MacroWaitRelease,
    Behavior::ModTap,
    Behavior::MomentaryLayer,
    Behavior::MouseKeyPress,
    Behavior::MouseMove,
    Behavior::MouseScroll,
    Behavior::None,
    Behavior::Outputs,
    Behavior::Reset,
    Behavior::Bootloader,
    Behavior::RgbUnderglow,
    Behavior::EncoderKeyPress,
    Behavior::StickyKey,
    Behavior::StickyLayer,
    Behavior::ToLayer,
    Behavior::ToggleLayer,
];

impl Behavior {
    /// Look up a behavior id. The top bit is a firmware flag and is ignored.
    pub fn from_id(id: u8) -> Option<Self> {
        ALL.get(usize::from(id & 0x7F)).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        NAMES.get(usize::from(self.id())).copied().unwrap_or("?")
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        NAMES
            .iter()
            .position(|candidate| *candidate == upper)
            .and_then(|index| ALL.get(index).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        assert_eq!(Behavior::from_id(6), Some(Behavior::KeyPress));
        assert_eq!(Behavior::from_id(30), Some(Behavior::ToggleLayer));
        assert_eq!(Behavior::from_id(31), None);
    }

    #[test]
    fn test_flag_bit_is_masked() {
        assert_eq!(Behavior::from_id(0x80 | 6), Some(Behavior::KeyPress));
    }

    #[test]
    fn test_names_line_up_with_ids() {
        for (index, behavior) in ALL.iter().enumerate() {
            assert_eq!(usize::from(behavior.id()), index);
            assert_eq!(Behavior::from_name(behavior.name()), Some(*behavior));
        }
        assert_eq!(Behavior::KeyPress.name(), "KEY_PRESS");
        assert_eq!(Behavior::from_name("mo"), Some(Behavior::MomentaryLayer));
    }
}
