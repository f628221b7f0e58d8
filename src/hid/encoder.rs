//! Character → boot keyboard report encoding.
//!
//! US layout only, and only the characters the scripts need. Anything
//! else encodes to an empty report, which the host sees as "no key".
//!
//! Three characters are chords rather than text:
//!
//! | char | modifier   | key | effect        |
//! |------|------------|-----|---------------|
//! | `@`  | Left GUI   | -   | open launcher |
//! | `#`  | Left Ctrl  | S   | save          |
//! | `&`  | Left Alt   | F4  | close window  |

use super::keyboard::{modifier, KeyboardReport};

const KEY_S: u8 = 22;
/// Base added to the digit value; `1` maps to 30.
const KEY_1_BASE: u8 = 29;
const KEY_1: u8 = 30;
const KEY_9: u8 = 38;
const KEY_0: u8 = 39;
const KEY_SPACE: u8 = 44;
const KEY_EQUAL: u8 = 46;
const KEY_SEMICOLON: u8 = 51;
const KEY_APOSTROPHE: u8 = 52;
const KEY_DOT: u8 = 55;
const KEY_SLASH: u8 = 56;
const KEY_F4: u8 = 61;
const KEY_KEYPAD_ENTER: u8 = 88;

/// Distance from ASCII `A` (65) down to usage ID 4.
const UPPER_OFFSET: u8 = 61;
/// Distance from ASCII `a` (97) down to usage ID 4.
const LOWER_OFFSET: u8 = 93;

/// Encode one character. Non-ASCII characters are unsupported.
pub fn encode(ch: char) -> KeyboardReport {
    if ch.is_ascii() {
        encode_ascii(ch as u8)
    } else {
        KeyboardReport::empty()
    }
}

/// Encode one ASCII byte.
pub fn encode_ascii(byte: u8) -> KeyboardReport {
    use modifier::{LEFT_ALT, LEFT_CTRL, LEFT_GUI, LEFT_SHIFT};

    match byte {
        b'0' => KeyboardReport::key(0, KEY_0),
        b'1'..=b'9' => KeyboardReport::key(0, KEY_1_BASE + (byte - b'0')),
        b'A'..=b'Z' => KeyboardReport::key(LEFT_SHIFT, byte - UPPER_OFFSET),
        b'a'..=b'z' => KeyboardReport::key(0, byte - LOWER_OFFSET),
        b' ' => KeyboardReport::key(0, KEY_SPACE),
        b'=' => KeyboardReport::key(0, KEY_EQUAL),
        b'\'' => KeyboardReport::key(0, KEY_APOSTROPHE),
        b'.' => KeyboardReport::key(0, KEY_DOT),
        b'/' => KeyboardReport::key(0, KEY_SLASH),
        b'\n' => KeyboardReport::key(0, KEY_KEYPAD_ENTER),
        b':' => KeyboardReport::key(LEFT_SHIFT, KEY_SEMICOLON),
        b'?' => KeyboardReport::key(LEFT_SHIFT, KEY_SLASH),
        b'(' => KeyboardReport::key(LEFT_SHIFT, KEY_9),
        b')' => KeyboardReport::key(LEFT_SHIFT, KEY_0),
        b'!' => KeyboardReport::key(LEFT_SHIFT, KEY_1),
        b'@' => KeyboardReport::key(LEFT_GUI, 0),
        b'#' => KeyboardReport::key(LEFT_CTRL, KEY_S),
        b'&' => KeyboardReport::key(LEFT_ALT, KEY_F4),
        _ => KeyboardReport::empty(),
    }
}
