//! Host-testable core of keyscript.
//!
//! This crate holds the pure logic shared by both firmware variants:
//! the character encoder, the keystroke scheduler, the RAM disk and the
//! mass-storage framing. Nothing here touches hardware, so it all runs
//! under `cargo test` on the host.
//!
//! Usage: `cargo test --lib` or `cargo test`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and pulls this library in with the `embedded` feature.

#![cfg_attr(not(test), no_std)]

// Must come first: the logging macros are used by every module below.
#[macro_use]
mod fmt;

pub mod config;
pub mod control;
pub mod error;
pub mod hid;
pub mod msc;
pub mod scheduler;
pub mod storage;

pub use error::{BlockError, BotError, Error, ScriptError};
pub use hid::KeyboardReport;
pub use scheduler::{Payload, Scheduler, Script};
pub use storage::{BlockDevice, RamDisk};

/// RAM disk with the configured geometry.
pub type DefaultRamDisk = RamDisk<{ config::RAMDISK_SECTORS }, { config::RAMDISK_SECTOR_SIZE }>;

/// Scheduler sized for the configured script table.
pub type DefaultScheduler = Scheduler<{ config::MAX_PAYLOADS }>;

/// Scheduler over [`config::DEFAULT_SCRIPT`].
pub fn default_scheduler() -> Result<DefaultScheduler, ScriptError> {
    Script::new(config::DEFAULT_SCRIPT).map(Scheduler::new)
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════
