//! Property tests for the hex and keymap codecs

use proptest::prelude::*;

use boardpilot_codec::keymap::{MAX_KEY, MAX_LAYER};
use boardpilot_codec::{
    CodecError, DEFAULT_REBIND_CAPACITY, KEY_DEF_LEN, KeyDef, TrackpadRegisters, bytes_to_hex,
    decode_key_defs, encode_key_defs, hex_to_bytes,
};

fn key_def_strategy() -> impl Strategy<Value = KeyDef> {
    (0u16..=MAX_KEY, 0u8..=MAX_LAYER, any::<u8>(), any::<u32>(), any::<u32>())
        .prop_filter("empty-slot sentinel", |(key, layer, ..)| {
            !(*key == MAX_KEY && *layer == MAX_LAYER)
        })
        .prop_map(|(key, layer, device, param1, param2)| KeyDef {
            key,
            layer,
            device,
            param1,
            param2,
        })
}

proptest! {
    #[test]
    fn prop_hex_round_trip(bytes in prop::collection::vec(any::<u8>(), 0..=256)) {
        let hex = bytes_to_hex(&bytes);
        prop_assert_eq!(hex.len(), bytes.len() * 2);
        prop_assert_eq!(hex_to_bytes(&hex).expect("hex decode"), bytes.clone());
        prop_assert_eq!(hex_to_bytes(&hex.to_uppercase()).expect("upper decode"), bytes);
    }

    #[test]
    fn prop_key_defs_round_trip(
        defs in prop::collection::vec(key_def_strategy(), 0..=DEFAULT_REBIND_CAPACITY)
    ) {
        let bytes = encode_key_defs(&defs, DEFAULT_REBIND_CAPACITY).expect("encode");
        prop_assert_eq!(bytes.len(), DEFAULT_REBIND_CAPACITY * KEY_DEF_LEN);
        prop_assert_eq!(decode_key_defs(&bytes).expect("decode"), defs);
    }

    #[test]
    fn prop_sentinel_never_decoded(
        device in any::<u8>(),
        param1 in any::<u32>(),
        param2 in any::<u32>(),
        slot in 0usize..8,
    ) {
        let mut bytes = vec![0u8; 8 * KEY_DEF_LEN];
        let start = slot * KEY_DEF_LEN;
        let mut record = vec![0xFF, 0xFF, device];
        record.extend_from_slice(&param1.to_le_bytes());
        record.extend_from_slice(&param2.to_le_bytes());
        if let Some(dst) = bytes.get_mut(start..start + KEY_DEF_LEN) {
            dst.copy_from_slice(&record);
        }

        let defs = decode_key_defs(&bytes).expect("decode");
        prop_assert_eq!(defs.len(), 7);
        prop_assert!(defs.iter().all(|def| !def.is_empty_slot()));
    }

    #[test]
    fn prop_misaligned_lengths_rejected(len in 0usize..=512) {
        let result = decode_key_defs(&vec![0u8; len]);
        if len % KEY_DEF_LEN == 0 {
            prop_assert!(result.is_ok());
        } else {
            let is_misaligned = matches!(result, Err(CodecError::MisalignedRecords { .. }));
            prop_assert!(is_misaligned);
        }
    }

    #[test]
    fn prop_trackpad_decode_accepts_any_block(bytes in prop::array::uniform20(any::<u8>())) {
        let regs = TrackpadRegisters::decode(&bytes).expect("decode");
        prop_assert_eq!(regs.encode(), bytes);
    }
}

#[test]
fn test_capacity_enforced_at_65_entries() -> Result<(), CodecError> {
    let defs = vec![KeyDef::new(1, 2, 6, 0, 0)?; 65];
    let result = encode_key_defs(&defs, 64);
    assert_eq!(
        result,
        Err(CodecError::CapacityExceeded {
            capacity: 64,
            requested: 65
        })
    );
    Ok(())
}

#[test]
fn test_length_five_rejected() {
    let result = decode_key_defs(&[1, 2, 3, 4, 5]);
    assert!(matches!(
        result,
        Err(CodecError::MisalignedRecords { len: 5, .. })
    ));
}
