//! HID keyboard reports and the character encoder that fills them.

pub mod class;
pub mod encoder;
pub mod keyboard;

#[cfg(test)]
mod tests;

pub use class::{BootKeyboard, Protocol};
pub use encoder::{encode, encode_ascii};
pub use keyboard::{KeyboardReport, KEYBOARD_REPORT_SIZE};
