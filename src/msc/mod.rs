//! USB Mass Storage, Bulk-Only Transport with the SCSI transparent
//! command set.
//!
//! - [`bot`]: Command Block / Command Status Wrapper framing
//! - [`scsi`]: command decoding against a [`crate::storage::BlockDevice`]
//!
//! The endpoint pump that moves these over USB lives in the firmware
//! binary (`usb::msc`).

pub mod bot;
pub mod scsi;

/// Interface class / subclass / protocol of a BOT SCSI disk.
pub const CLASS_MASS_STORAGE: u8 = 0x08;
pub const SUBCLASS_SCSI_TRANSPARENT: u8 = 0x06;
pub const PROTOCOL_BULK_ONLY: u8 = 0x50;

pub use bot::{
    CommandBlockWrapper, CommandStatus, CommandStatusWrapper, DataDirection, Termination,
};
pub use scsi::{Response, ScsiTarget, Sense};
