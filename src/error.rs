//! Unified error type for keyscript.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (behind the `defmt` feature) for efficient
//! on-target logging.

/// Top-level error type used across the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Storage
    /// A block store access was rejected.
    Block(BlockError),

    // Scheduler
    /// The keystroke script could not be built.
    Script(ScriptError),

    // Mass storage
    /// A Bulk-Only Transport wrapper was malformed.
    Bot(BotError),

    // USB
    /// USB endpoint was disabled or the transfer failed.
    Usb,
}

/// Errors returned by the block store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockError {
    /// `lba + count` runs past the last sector.
    OutOfRange { lba: u32, count: u32 },
    /// The caller's buffer does not hold exactly `count` sectors.
    BufferLength { expected: usize, actual: usize },
}

/// Errors raised while building a keystroke script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScriptError {
    /// Payload `index` does not start strictly after the one before it.
    DelayNotIncreasing { index: usize },
    /// More payloads than the script table can hold.
    TooManyPayloads,
}

/// Malformed Command Block Wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BotError {
    /// Transfer was not exactly 31 bytes.
    BadLength,
    /// Signature was not `USBC`.
    BadSignature,
    /// Addressed a LUN other than 0.
    BadLun,
    /// Command block length outside 1..=16.
    BadCommandLength,
    /// The host ended an OUT data stage before the command's data was in.
    ShortDataStage,
}

// Convenience conversions

impl From<BlockError> for Error {
    fn from(e: BlockError) -> Self {
        Error::Block(e)
    }
}

impl From<ScriptError> for Error {
    fn from(e: ScriptError) -> Self {
        Error::Script(e)
    }
}

impl From<BotError> for Error {
    fn from(e: BotError) -> Self {
        Error::Bot(e)
    }
}
