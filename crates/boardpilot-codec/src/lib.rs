//! Config field registry and packed record codecs for hid:ergo keyboards
//!
//! This crate converts device configuration data between the three shapes it
//! takes on its way to the keyboard firmware:
//!
//! - a hex string, which is how payloads travel inside the JSON envelopes
//!   exchanged with the background service ([`hex`])
//! - a raw byte buffer matching the on-device C struct layout ([`record`])
//! - a typed record ([`keymap`], [`trackpad`], [`scalar`], [`value`])
//!
//! Field identifiers live in [`field`]; behavior ids used by keymap rebinds
//! live in [`behavior`].
//!
//! The crate is I/O-free. Every decoder validates lengths up front and
//! returns [`CodecError`] instead of truncating or indexing out of bounds.
//!
//! # Example
//!
//! ```
//! use boardpilot_codec::{KeyDef, bytes_to_hex, decode_key_defs, encode_key_defs, hex_to_bytes};
//!
//! # fn main() -> Result<(), boardpilot_codec::CodecError> {
//! let defs = vec![KeyDef::new(13, 0, 6, 0x0007_0005, 0)?];
//! let bytes = encode_key_defs(&defs, 64)?;
//! let wire = bytes_to_hex(&bytes);
//! assert_eq!(decode_key_defs(&hex_to_bytes(&wire)?)?, defs);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod behavior;
pub mod field;
pub mod hex;
pub mod keymap;
pub mod record;
pub mod scalar;
pub mod trackpad;
pub mod value;

pub use behavior::Behavior;
pub use field::{ConfigField, FieldRange};
pub use hex::{bytes_to_hex, hex_to_bytes};
pub use keymap::{
    DEFAULT_REBIND_CAPACITY, EMPTY_SLOT_WORD, KEY_DEF_LEN, KeyDef, decode_key_defs,
    encode_key_defs,
};
pub use record::{RecordReader, RecordWriter};
pub use scalar::{DateTimeValue, decode_u8_scalar, decode_u16_scalar};
pub use trackpad::{TRACKPAD_REGS_LEN, TrackpadRegisters};
pub use value::{FieldValue, decode_field_value};

use thiserror::Error;

/// Errors produced while converting configuration payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Hex input had an odd number of digits
    #[error("Hex string has odd length {len}")]
    OddHexLength {
        /// Length of the rejected input in characters
        len: usize,
    },

    /// Hex input contained a character outside `[0-9a-fA-F]`
    #[error("Invalid hex digit {found:?} at position {position}")]
    InvalidHexDigit {
        /// Character offset of the offending digit
        position: usize,
        /// The offending character
        found: char,
    },

    /// Buffer is not a whole number of fixed-size records
    #[error("{record} buffer of {len} bytes is not a multiple of {stride}")]
    MisalignedRecords {
        /// Record kind being decoded
        record: &'static str,
        /// Size of one record in bytes
        stride: usize,
        /// Actual buffer length
        len: usize,
    },

    /// Buffer length does not match a fixed-size record
    #[error("{record} requires exactly {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Record kind being decoded
        record: &'static str,
        /// Required length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// More entries than the fixed slot table can hold
    #[error("{requested} entries exceed the capacity of {capacity} slots")]
    CapacityExceeded {
        /// Slots available
        capacity: usize,
        /// Entries supplied
        requested: usize,
    },

    /// A value does not fit its packed bit width
    #[error("{field} value {value} exceeds maximum {max}")]
    FieldOutOfRange {
        /// Name of the packed field
        field: &'static str,
        /// Rejected value
        value: u32,
        /// Largest value the field can hold
        max: u32,
    },

    /// An entry packs to the empty-slot sentinel and would be lost on read
    #[error("Entry {index} packs to the reserved empty-slot word 0xFFFF")]
    ReservedSlot {
        /// Index of the offending entry
        index: usize,
    },

    /// A read ran past the end of the buffer
    #[error("Unexpected end of data: need {needed} bytes at offset {offset}")]
    UnexpectedEnd {
        /// Read position
        offset: usize,
        /// Bytes the read required
        needed: usize,
    },
}

/// Specialized Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
