//! Bulk-Only Transport wrappers.
//!
//! ```text
//! CBW (31 bytes, host → device)      CSW (13 bytes, device → host)
//!  0..4   signature "USBC"             0..4   signature "USBS"
//!  4..8   tag                          4..8   tag (echoed)
//!  8..12  data transfer length         8..12  data residue
//!  12     flags (bit 7 = data in)      12     status
//!  13     LUN
//!  14     command block length
//!  15..31 command block
//! ```
//! All multi-byte fields are little-endian.

use crate::error::BotError;

pub const CBW_LEN: usize = 31;
pub const CSW_LEN: usize = 13;

const CBW_SIGNATURE: u32 = 0x4342_5355;
const CSW_SIGNATURE: u32 = 0x5342_5355;
const FLAG_DATA_IN: u8 = 0x80;

/// Direction of the data stage, from the host's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataDirection {
    /// Device sends data to the host.
    In,
    /// Host sends data to the device.
    Out,
    /// No data stage.
    None,
}

/// A parsed Command Block Wrapper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandBlockWrapper {
    pub tag: u32,
    pub data_transfer_length: u32,
    pub direction: DataDirection,
    block: [u8; 16],
    block_len: u8,
}

impl CommandBlockWrapper {
    pub fn parse(raw: &[u8]) -> Result<Self, BotError> {
        if raw.len() != CBW_LEN {
            return Err(BotError::BadLength);
        }
        if read_u32(raw, 0) != CBW_SIGNATURE {
            return Err(BotError::BadSignature);
        }
        if raw[13] & 0x0F != 0 {
            return Err(BotError::BadLun);
        }
        let block_len = raw[14] & 0x1F;
        if !(1..=16).contains(&block_len) {
            return Err(BotError::BadCommandLength);
        }

        let data_transfer_length = read_u32(raw, 8);
        let direction = if data_transfer_length == 0 {
            DataDirection::None
        } else if raw[12] & FLAG_DATA_IN != 0 {
            DataDirection::In
        } else {
            DataDirection::Out
        };

        let mut block = [0u8; 16];
        block.copy_from_slice(&raw[15..31]);

        Ok(Self {
            tag: read_u32(raw, 4),
            data_transfer_length,
            direction,
            block,
            block_len,
        })
    }

    /// The SCSI command block.
    pub fn command(&self) -> &[u8] {
        &self.block[..self.block_len as usize]
    }

    /// Whether a command whose data stage runs in `direction` may run
    /// under this wrapper. Anything else is a phase error.
    pub fn accepts(&self, direction: DataDirection) -> bool {
        direction == DataDirection::None || direction == self.direction
    }

    /// Status wrapper for a command that moved `moved` bytes of data,
    /// and what the transport still owes the host before sending it.
    pub fn complete(
        &self,
        status: CommandStatus,
        moved: u32,
        max_packet: usize,
    ) -> (CommandStatusWrapper, Termination) {
        let residue = self.data_transfer_length.saturating_sub(moved);
        let termination = match self.direction {
            _ if residue == 0 => Termination::Complete,
            // A short final packet already ends the stage.
            DataDirection::In if moved as usize % max_packet == 0 => Termination::ZeroLengthPacket,
            DataDirection::In => Termination::Complete,
            DataDirection::Out => Termination::Drain(residue),
            DataDirection::None => Termination::Complete,
        };
        let csw = CommandStatusWrapper {
            tag: self.tag,
            residue,
            status,
        };
        (csw, termination)
    }
}

/// How the transport closes a data stage the command did not fill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Termination {
    /// Nothing left to move; send the CSW.
    Complete,
    /// End the IN stage with a zero-length packet.
    ZeroLengthPacket,
    /// Read and discard this many OUT bytes.
    Drain(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandStatus {
    Passed = 0,
    Failed = 1,
    PhaseError = 2,
}

/// A Command Status Wrapper, ready to serialize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandStatusWrapper {
    pub tag: u32,
    pub residue: u32,
    pub status: CommandStatus,
}

impl CommandStatusWrapper {
    pub fn to_bytes(&self) -> [u8; CSW_LEN] {
        let mut buf = [0u8; CSW_LEN];
        buf[0..4].copy_from_slice(&CSW_SIGNATURE.to_le_bytes());
        buf[4..8].copy_from_slice(&self.tag.to_le_bytes());
        buf[8..12].copy_from_slice(&self.residue.to_le_bytes());
        buf[12] = self.status as u8;
        buf
    }
}

fn read_u32(raw: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cbw(tag: u32, len: u32, flags: u8, lun: u8, cb: &[u8]) -> [u8; CBW_LEN] {
        let mut raw = [0u8; CBW_LEN];
        raw[0..4].copy_from_slice(b"USBC");
        raw[4..8].copy_from_slice(&tag.to_le_bytes());
        raw[8..12].copy_from_slice(&len.to_le_bytes());
        raw[12] = flags;
        raw[13] = lun;
        raw[14] = cb.len() as u8;
        raw[15..15 + cb.len()].copy_from_slice(cb);
        raw
    }

    #[test]
    fn parse_read10_cbw() {
        let raw = cbw(0xDEAD_BEEF, 1024, 0x80, 0, &[0x28, 0, 0, 0, 0, 4, 0, 0, 2, 0]);
        let parsed = CommandBlockWrapper::parse(&raw).unwrap();
        assert_eq!(parsed.tag, 0xDEAD_BEEF);
        assert_eq!(parsed.data_transfer_length, 1024);
        assert_eq!(parsed.direction, DataDirection::In);
        assert_eq!(parsed.command(), &[0x28, 0, 0, 0, 0, 4, 0, 0, 2, 0]);
    }

    #[test]
    fn parse_direction() {
        let out = cbw(1, 512, 0x00, 0, &[0x2A]);
        assert_eq!(
            CommandBlockWrapper::parse(&out).unwrap().direction,
            DataDirection::Out
        );
        let none = cbw(1, 0, 0x80, 0, &[0x00]);
        assert_eq!(
            CommandBlockWrapper::parse(&none).unwrap().direction,
            DataDirection::None
        );
    }

    #[test]
    fn parse_rejects_malformed() {
        let good = cbw(1, 0, 0, 0, &[0x00; 6]);
        assert_eq!(
            CommandBlockWrapper::parse(&good[..30]),
            Err(BotError::BadLength)
        );

        let mut bad_sig = good;
        bad_sig[0] = b'X';
        assert_eq!(
            CommandBlockWrapper::parse(&bad_sig),
            Err(BotError::BadSignature)
        );

        let bad_lun = cbw(1, 0, 0, 1, &[0x00; 6]);
        assert_eq!(CommandBlockWrapper::parse(&bad_lun), Err(BotError::BadLun));

        let mut empty_cb = good;
        empty_cb[14] = 0;
        assert_eq!(
            CommandBlockWrapper::parse(&empty_cb),
            Err(BotError::BadCommandLength)
        );
    }

    #[test]
    fn phase_follows_host_direction() {
        let read = CommandBlockWrapper::parse(&cbw(1, 512, 0x80, 0, &[0x28])).unwrap();
        assert!(read.accepts(DataDirection::In));
        assert!(read.accepts(DataDirection::None));
        assert!(!read.accepts(DataDirection::Out));

        let none = CommandBlockWrapper::parse(&cbw(1, 0, 0x00, 0, &[0x00])).unwrap();
        assert!(none.accepts(DataDirection::None));
        assert!(!none.accepts(DataDirection::In));
        assert!(!none.accepts(DataDirection::Out));
    }

    #[test]
    fn complete_exact_transfer() {
        let read = CommandBlockWrapper::parse(&cbw(9, 512, 0x80, 0, &[0x28])).unwrap();
        let (csw, end) = read.complete(CommandStatus::Passed, 512, 64);
        assert_eq!(
            csw,
            CommandStatusWrapper {
                tag: 9,
                residue: 0,
                status: CommandStatus::Passed
            }
        );
        assert_eq!(end, Termination::Complete);
    }

    #[test]
    fn complete_short_in_stage() {
        let inquiry = CommandBlockWrapper::parse(&cbw(1, 255, 0x80, 0, &[0x12])).unwrap();

        // 36 bytes: the short packet already ended the stage.
        let (csw, end) = inquiry.complete(CommandStatus::Passed, 36, 64);
        assert_eq!(csw.residue, 219);
        assert_eq!(end, Termination::Complete);

        // Nothing sent, or a whole number of packets: needs a ZLP.
        let (_, end) = inquiry.complete(CommandStatus::Failed, 0, 64);
        assert_eq!(end, Termination::ZeroLengthPacket);
        let (_, end) = inquiry.complete(CommandStatus::Passed, 128, 64);
        assert_eq!(end, Termination::ZeroLengthPacket);
    }

    #[test]
    fn complete_short_out_stage_drains() {
        let write = CommandBlockWrapper::parse(&cbw(1, 2048, 0x00, 0, &[0x2A])).unwrap();
        let (csw, end) = write.complete(CommandStatus::Failed, 512, 64);
        assert_eq!(csw.residue, 1536);
        assert_eq!(csw.status, CommandStatus::Failed);
        assert_eq!(end, Termination::Drain(1536));
    }

    #[test]
    fn csw_layout() {
        let csw = CommandStatusWrapper {
            tag: 0x0102_0304,
            residue: 512,
            status: CommandStatus::Failed,
        };
        assert_eq!(
            csw.to_bytes(),
            [b'U', b'S', b'B', b'S', 0x04, 0x03, 0x02, 0x01, 0x00, 0x02, 0x00, 0x00, 0x01]
        );
    }
}
