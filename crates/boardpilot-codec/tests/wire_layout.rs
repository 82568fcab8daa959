//! Byte layout checks against captured device payloads

use boardpilot_codec::{
    ConfigField, FieldValue, KeyDef, TrackpadRegisters, bytes_to_hex, decode_field_value,
    encode_key_defs, hex_to_bytes,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_bit_packing_example() -> TestResult {
    let def = KeyDef::new(100, 5, 6, 0x1234_5678, 0)?;
    let bytes = encode_key_defs(&[def], 64)?;
    let first_record = bytes.get(..11).ok_or("short buffer")?;

    insta::assert_snapshot!(bytes_to_hex(first_record), @"4506067856341200000000");
    Ok(())
}

#[test]
fn test_default_trackpad_block_hex() {
    let hex = bytes_to_hex(&TrackpadRegisters::default().encode());
    insta::assert_snapshot!(hex, @"0a00320003039600190000000403050500021900");
}

#[test]
fn test_read_reply_payload_decodes() -> TestResult {
    // Two rebinds followed by empty slots, as returned for KEYMAP.
    let mut hex = String::from("0d00060500070000000000");
    hex.push_str("0010060600000000000000");
    hex.push_str(&"ff".repeat(11 * 62));

    let bytes = hex_to_bytes(&hex)?;
    assert_eq!(bytes.len(), 64 * 11);
    let value = decode_field_value(ConfigField::Keymap, &bytes)?;
    let FieldValue::Keymap(defs) = value else {
        return Err("expected keymap".into());
    };
    assert_eq!(defs.len(), 2);
    assert_eq!(defs.first().map(|d| (d.key, d.layer)), Some((0, 13)));
    assert_eq!(defs.get(1).map(|d| (d.key, d.layer)), Some((256, 0)));
    Ok(())
}
