//! Unit tests for keyboard report serialization and character encoding.
//!
//! These tests run on the host (not embedded) and verify the pure
//! mapping from characters to boot-protocol reports.

use super::keyboard::{modifier, KeyboardReport};
use super::{encode, encode_ascii};

// ═══════════════════════════════════════════════════════════════════════════
// Keyboard Report Tests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn keyboard_report_empty() {
    let report = KeyboardReport::empty();
    assert!(report.is_empty());
    assert_eq!(report.modifier, 0);
    assert_eq!(report.keycodes, [0; 6]);
}

#[test]
fn keyboard_report_serialize_layout() {
    let report = KeyboardReport::key(modifier::LEFT_SHIFT, 0x04);

    let mut buf = [0xAAu8; 8];
    let written = report.serialize(&mut buf);

    assert_eq!(written, 8);
    assert_eq!(buf, [0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(report.to_bytes(), buf);
}

#[test]
fn keyboard_report_serialize_buffer_too_small() {
    let report = KeyboardReport::empty();
    let mut small_buf = [0u8; 4];
    let written = report.serialize(&mut small_buf);
    assert_eq!(written, 0); // Should fail gracefully
}

#[test]
fn keyboard_report_modifier_only_is_not_empty() {
    let report = KeyboardReport::key(modifier::LEFT_GUI, 0);
    assert!(!report.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// Encoder Tests
// ═══════════════════════════════════════════════════════════════════════════

fn pair(ch: char) -> (u8, u8) {
    let r = encode(ch);
    (r.modifier, r.keycodes[0])
}

#[test]
fn encode_digits() {
    assert_eq!(pair('1'), (0, 30));
    assert_eq!(pair('5'), (0, 34));
    assert_eq!(pair('9'), (0, 38));
    assert_eq!(pair('0'), (0, 39));
}

#[test]
fn shifted_digits_share_the_digit_key() {
    assert_eq!(pair('!').1, pair('1').1);
    assert_eq!(pair('(').1, pair('9').1);
    assert_eq!(pair(')').1, pair('0').1);
    // 29 is `z`, not a digit.
    assert_ne!(pair('1').1, pair('z').1);
}

#[test]
fn encode_lowercase_letters() {
    assert_eq!(pair('a'), (0, 4));
    assert_eq!(pair('m'), (0, 16));
    assert_eq!(pair('z'), (0, 29));
}

#[test]
fn encode_uppercase_letters_set_shift() {
    assert_eq!(pair('A'), (modifier::LEFT_SHIFT, 4));
    assert_eq!(pair('H'), (modifier::LEFT_SHIFT, 11));
    assert_eq!(pair('Z'), (modifier::LEFT_SHIFT, 29));
}

#[test]
fn encode_unshifted_symbols() {
    assert_eq!(pair(' '), (0, 44));
    assert_eq!(pair('='), (0, 46));
    assert_eq!(pair('\''), (0, 52));
    assert_eq!(pair('.'), (0, 55));
    assert_eq!(pair('/'), (0, 56));
    assert_eq!(pair('\n'), (0, 88));
}

#[test]
fn encode_shifted_symbols() {
    assert_eq!(pair(':'), (modifier::LEFT_SHIFT, 51));
    assert_eq!(pair('?'), (modifier::LEFT_SHIFT, 56));
    assert_eq!(pair('('), (modifier::LEFT_SHIFT, 38));
    assert_eq!(pair(')'), (modifier::LEFT_SHIFT, 39));
    assert_eq!(pair('!'), (modifier::LEFT_SHIFT, 30));
}

#[test]
fn encode_chords() {
    assert_eq!(pair('@'), (0x08, 0));
    assert_eq!(pair('#'), (0x01, 22));
    assert_eq!(pair('&'), (0x04, 61));
}

#[test]
fn encode_only_fills_first_slot() {
    for b in 0u8..=127 {
        let r = encode_ascii(b);
        assert_eq!(r.reserved, 0);
        assert_eq!(&r.keycodes[1..], &[0; 5]);
    }
}

#[test]
fn encode_unsupported_is_empty() {
    for ch in ['\t', '\r', '\0', '-', ',', ';', '"', '$', '%', '*', '+', '~', 'é', '€'] {
        assert_eq!(encode(ch), KeyboardReport::empty(), "char {:?}", ch);
    }
}

#[test]
fn encode_is_deterministic() {
    for b in 0u8..=127 {
        assert_eq!(encode_ascii(b), encode_ascii(b));
        assert_eq!(encode(b as char), encode_ascii(b));
    }
}
