//! SCSI transparent command set, just enough for a removable disk.
//!
//! [`ScsiTarget::execute`] decodes one command block and says what the
//! transport has to do next. Sector data never passes through the target's
//! own buffers: the transport pulls and pushes single sectors with
//! [`ScsiTarget::read_block`] / [`ScsiTarget::write_block`].

use super::bot::DataDirection;
use crate::config::{SCSI_PRODUCT_ID, SCSI_PRODUCT_REVISION, SCSI_VENDOR_ID};
use crate::error::BlockError;
use crate::fmt::debug;
use crate::storage::BlockDevice;

pub mod opcode {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const INQUIRY: u8 = 0x12;
    pub const MODE_SENSE_6: u8 = 0x1A;
    pub const START_STOP_UNIT: u8 = 0x1B;
    pub const PREVENT_ALLOW_MEDIUM_REMOVAL: u8 = 0x1E;
    pub const READ_FORMAT_CAPACITIES: u8 = 0x23;
    pub const READ_CAPACITY_10: u8 = 0x25;
    pub const READ_10: u8 = 0x28;
    pub const WRITE_10: u8 = 0x2A;
    pub const VERIFY_10: u8 = 0x2F;
    pub const MODE_SENSE_10: u8 = 0x5A;
}

const INQUIRY_LEN: usize = 36;
const SENSE_LEN: usize = 18;

/// Sense key / additional sense code pair reported by REQUEST SENSE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sense {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl Sense {
    pub const NONE: Sense = Sense::new(0x00, 0x00);
    pub const INVALID_COMMAND: Sense = Sense::new(0x05, 0x20);
    pub const LBA_OUT_OF_RANGE: Sense = Sense::new(0x05, 0x21);
    pub const INVALID_FIELD_IN_CDB: Sense = Sense::new(0x05, 0x24);
    pub const INTERNAL_TARGET_FAILURE: Sense = Sense::new(0x04, 0x44);

    const fn new(key: u8, asc: u8) -> Self {
        Self { key, asc, ascq: 0 }
    }
}

impl From<BlockError> for Sense {
    fn from(e: BlockError) -> Self {
        match e {
            BlockError::OutOfRange { .. } => Sense::LBA_OUT_OF_RANGE,
            BlockError::BufferLength { .. } => Sense::INTERNAL_TARGET_FAILURE,
        }
    }
}

/// What the transport does after a command block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response<'a> {
    /// Command done, no data stage.
    NoData,
    /// Send these bytes, then report success.
    DataIn(&'a [u8]),
    /// Stream `count` sectors from `lba` to the host.
    ReadBlocks { lba: u32, count: u32 },
    /// Receive `count` sectors from the host into `lba`.
    WriteBlocks { lba: u32, count: u32 },
    /// CHECK CONDITION; details are in the sense data.
    Failed,
}

impl Response<'_> {
    /// Direction of the data stage this response needs. Empty transfers
    /// have no data stage.
    pub fn direction(&self) -> DataDirection {
        match *self {
            Response::DataIn(data) if !data.is_empty() => DataDirection::In,
            Response::ReadBlocks { count, .. } if count > 0 => DataDirection::In,
            Response::WriteBlocks { count, .. } if count > 0 => DataDirection::Out,
            _ => DataDirection::None,
        }
    }
}

/// Single-LUN SCSI block target over a [`BlockDevice`].
pub struct ScsiTarget<D> {
    device: D,
    sense: Sense,
    reply: [u8; INQUIRY_LEN],
}

impl<D: BlockDevice> ScsiTarget<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            sense: Sense::NONE,
            reply: [0; INQUIRY_LEN],
        }
    }

    /// Sense data of the last failed command.
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Sector size of the underlying device.
    pub fn block_size(&self) -> u32 {
        self.device.geometry().1
    }

    /// Decode and run one command block.
    pub fn execute(&mut self, cb: &[u8]) -> Response<'_> {
        let Some(&op) = cb.first() else {
            return self.fail(Sense::INVALID_COMMAND);
        };
        if op != opcode::REQUEST_SENSE {
            self.sense = Sense::NONE;
        }

        match op {
            opcode::TEST_UNIT_READY
            | opcode::START_STOP_UNIT
            | opcode::PREVENT_ALLOW_MEDIUM_REMOVAL => Response::NoData,
            opcode::REQUEST_SENSE if cb.len() >= 6 => self.request_sense(cb[4] as usize),
            opcode::INQUIRY if cb.len() >= 6 => self.inquiry(cb),
            opcode::MODE_SENSE_6 if cb.len() >= 6 => {
                // Header only: no medium type, not write protected, no block descriptors.
                self.reply(&[0x03, 0x00, 0x00, 0x00], cb[4] as usize)
            }
            opcode::MODE_SENSE_10 if cb.len() >= 10 => {
                self.reply(&[0x00, 0x06, 0, 0, 0, 0, 0, 0], be16(cb, 7) as usize)
            }
            opcode::READ_CAPACITY_10 => {
                let (sectors, size) = self.device.geometry();
                let mut data = [0u8; 8];
                data[0..4].copy_from_slice(&sectors.saturating_sub(1).to_be_bytes());
                data[4..8].copy_from_slice(&size.to_be_bytes());
                self.reply(&data, data.len())
            }
            opcode::READ_FORMAT_CAPACITIES if cb.len() >= 9 => {
                let (sectors, size) = self.device.geometry();
                let mut data = [0u8; 12];
                data[3] = 8; // capacity list length
                data[4..8].copy_from_slice(&sectors.to_be_bytes());
                data[8..12].copy_from_slice(&size.to_be_bytes());
                data[8] = 0x02; // formatted media
                self.reply(&data, be16(cb, 7) as usize)
            }
            opcode::READ_10 | opcode::WRITE_10 | opcode::VERIFY_10 if cb.len() >= 10 => {
                let lba = be32(cb, 2);
                let count = be16(cb, 7) as u32;
                self.transfer(op, lba, count)
            }
            _ => {
                warn!("SCSI: unsupported command 0x{:02x}", op);
                self.fail(Sense::INVALID_COMMAND)
            }
        }
    }

    /// One sector for a READ(10) in progress.
    pub fn read_block(&mut self, lba: u32) -> Result<&[u8], BlockError> {
        match self.device.block_read(lba, 1) {
            Ok(data) => Ok(data),
            Err(e) => {
                self.sense = e.into();
                Err(e)
            }
        }
    }

    /// Store one sector received during a WRITE(10).
    pub fn write_block(&mut self, lba: u32, data: &[u8]) -> Result<(), BlockError> {
        self.device.block_write(lba, 1, data).inspect_err(|e| {
            self.sense = (*e).into();
        })
    }

    fn transfer(&mut self, op: u8, lba: u32, count: u32) -> Response<'_> {
        let (sectors, _) = self.device.geometry();
        let in_range = lba.checked_add(count).is_some_and(|end| end <= sectors);
        if !in_range {
            warn!("SCSI: lba={} count={} past end of disk", lba, count);
            return self.fail(Sense::LBA_OUT_OF_RANGE);
        }

        debug!("SCSI: op=0x{:02x} lba={} count={}", op, lba, count);
        match op {
            _ if count == 0 => Response::NoData,
            opcode::READ_10 => Response::ReadBlocks { lba, count },
            opcode::WRITE_10 => Response::WriteBlocks { lba, count },
            _ => Response::NoData,
        }
    }

    fn inquiry(&mut self, cb: &[u8]) -> Response<'_> {
        // Vital product data pages are not implemented.
        if cb[1] & 0x01 != 0 {
            return self.fail(Sense::INVALID_FIELD_IN_CDB);
        }

        let mut data = [0u8; INQUIRY_LEN];
        data[0] = 0x00; // direct access block device
        data[1] = 0x80; // removable
        data[2] = 0x04; // SPC-2
        data[3] = 0x02; // response data format
        data[4] = (INQUIRY_LEN - 5) as u8;
        data[8..16].copy_from_slice(SCSI_VENDOR_ID);
        data[16..32].copy_from_slice(SCSI_PRODUCT_ID);
        data[32..36].copy_from_slice(SCSI_PRODUCT_REVISION);
        self.reply(&data, be16(cb, 3) as usize)
    }

    fn request_sense(&mut self, allocation: usize) -> Response<'_> {
        let sense = core::mem::replace(&mut self.sense, Sense::NONE);
        let mut data = [0u8; SENSE_LEN];
        data[0] = 0x70; // current error, fixed format
        data[2] = sense.key;
        data[7] = (SENSE_LEN - 8) as u8;
        data[12] = sense.asc;
        data[13] = sense.ascq;
        self.reply(&data, allocation)
    }

    /// Copy `data` into the reply buffer, cut to the host's allocation length.
    fn reply(&mut self, data: &[u8], allocation: usize) -> Response<'_> {
        let len = data.len().min(allocation);
        self.reply[..len].copy_from_slice(&data[..len]);
        Response::DataIn(&self.reply[..len])
    }

    fn fail(&mut self, sense: Sense) -> Response<'static> {
        self.sense = sense;
        Response::Failed
    }
}

fn be16(cb: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([cb[at], cb[at + 1]])
}

fn be32(cb: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([cb[at], cb[at + 1], cb[at + 2], cb[at + 3]])
}
