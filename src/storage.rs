//! Volatile block store backing the mass-storage variant.
//!
//! A fixed number of equal-size sectors held in RAM and addressed by
//! zero-based LBA. Contents start zeroed and are lost on reset.
//!
//! Every access is checked against `lba + count <= SECTORS` before any
//! byte is touched, so a rejected request leaves the disk unchanged.

use crate::error::BlockError;
use crate::fmt::trace;

/// Block-level access used by the SCSI layer.
pub trait BlockDevice {
    /// The `count` sectors starting at `lba`, back to back.
    fn block_read(&self, lba: u32, count: u32) -> Result<&[u8], BlockError>;

    /// Overwrite `count` sectors starting at `lba` with `data`.
    fn block_write(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockError>;

    /// `(sector_count, sector_size)`.
    fn geometry(&self) -> (u32, u32);
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    fn block_read(&self, lba: u32, count: u32) -> Result<&[u8], BlockError> {
        (**self).block_read(lba, count)
    }

    fn block_write(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockError> {
        (**self).block_write(lba, count, data)
    }

    fn geometry(&self) -> (u32, u32) {
        (**self).geometry()
    }
}

/// In-memory disk of `SECTORS` sectors of `SECTOR_SIZE` bytes each.
pub struct RamDisk<const SECTORS: usize, const SECTOR_SIZE: usize> {
    sectors: [[u8; SECTOR_SIZE]; SECTORS],
}

impl<const SECTORS: usize, const SECTOR_SIZE: usize> RamDisk<SECTORS, SECTOR_SIZE> {
    /// A zero-filled disk.
    pub const fn new() -> Self {
        Self {
            sectors: [[0; SECTOR_SIZE]; SECTORS],
        }
    }

    /// `(sector_count, sector_size)`.
    pub const fn capacity(&self) -> (usize, usize) {
        (SECTORS, SECTOR_SIZE)
    }

    /// Sectors `lba .. lba + count` as one contiguous slice.
    pub fn read(&self, lba: u32, count: u32) -> Result<&[u8], BlockError> {
        let range = Self::span(lba, count)?;
        trace!("ramdisk read lba={} count={}", lba, count);
        Ok(self.sectors[range].as_flattened())
    }

    /// Overwrite sectors `lba .. lba + count`. `data` must hold exactly
    /// `count` sectors.
    pub fn write(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockError> {
        let range = Self::span(lba, count)?;
        let target = self.sectors[range].as_flattened_mut();
        if data.len() != target.len() {
            return Err(BlockError::BufferLength {
                expected: target.len(),
                actual: data.len(),
            });
        }
        trace!("ramdisk write lba={} count={}", lba, count);
        target.copy_from_slice(data);
        Ok(())
    }

    fn span(lba: u32, count: u32) -> Result<core::ops::Range<usize>, BlockError> {
        let out_of_range = BlockError::OutOfRange { lba, count };
        let end = lba.checked_add(count).ok_or(out_of_range)?;
        if end as usize > SECTORS {
            return Err(out_of_range);
        }
        Ok(lba as usize..end as usize)
    }
}

impl<const SECTORS: usize, const SECTOR_SIZE: usize> Default for RamDisk<SECTORS, SECTOR_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SECTORS: usize, const SECTOR_SIZE: usize> BlockDevice for RamDisk<SECTORS, SECTOR_SIZE> {
    fn block_read(&self, lba: u32, count: u32) -> Result<&[u8], BlockError> {
        self.read(lba, count)
    }

    fn block_write(&mut self, lba: u32, count: u32, data: &[u8]) -> Result<(), BlockError> {
        self.write(lba, count, data)
    }

    fn geometry(&self) -> (u32, u32) {
        (SECTORS as u32, SECTOR_SIZE as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Disk = RamDisk<32, 512>;

    fn boxed() -> std::boxed::Box<Disk> {
        std::boxed::Box::new(Disk::new())
    }

    #[test]
    fn starts_zeroed() {
        let disk = boxed();
        assert!(disk.read(0, 32).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn single_sector_roundtrip() {
        let mut disk = boxed();
        let data: std::vec::Vec<u8> = (0..512).map(|i| (i % 251) as u8).collect();
        disk.write(0, 1, &data).unwrap();
        assert_eq!(disk.read(0, 1).unwrap(), &data[..]);
    }

    #[test]
    fn multi_sector_write_lands_contiguously() {
        let mut disk = boxed();
        let mut data = [0u8; 3 * 512];
        data[..512].fill(0x11);
        data[512..1024].fill(0x22);
        data[1024..].fill(0x33);
        disk.write(10, 3, &data).unwrap();

        assert!(disk.read(11, 1).unwrap().iter().all(|&b| b == 0x22));
        assert!(disk.read(9, 1).unwrap().iter().all(|&b| b == 0));
        assert!(disk.read(13, 1).unwrap().iter().all(|&b| b == 0));
        assert_eq!(disk.read(10, 3).unwrap(), &data[..]);
    }

    #[test]
    fn read_returns_exact_length() {
        let disk = boxed();
        assert_eq!(disk.read(4, 5).unwrap().len(), 5 * 512);
        assert_eq!(disk.read(32, 0).unwrap().len(), 0);
    }

    #[test]
    fn out_of_range_boundaries() {
        let mut disk = boxed();
        let two = [0u8; 1024];
        assert_eq!(
            disk.read(31, 2),
            Err(BlockError::OutOfRange { lba: 31, count: 2 })
        );
        assert_eq!(
            disk.write(31, 2, &two),
            Err(BlockError::OutOfRange { lba: 31, count: 2 })
        );
        assert!(disk.read(32, 1).is_err());
        assert!(disk.read(0, 33).is_err());
        assert!(disk.read(31, 1).is_ok());
    }

    #[test]
    fn out_of_range_does_not_overflow() {
        let disk = boxed();
        assert_eq!(
            disk.read(u32::MAX, 2),
            Err(BlockError::OutOfRange {
                lba: u32::MAX,
                count: 2
            })
        );
    }

    #[test]
    fn rejected_write_leaves_disk_untouched() {
        let mut disk = boxed();
        assert!(disk.write(31, 2, &[0xFF; 1024]).is_err());
        assert_eq!(
            disk.write(0, 1, &[0xFF; 100]),
            Err(BlockError::BufferLength {
                expected: 512,
                actual: 100
            })
        );
        assert!(disk.read(0, 32).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn geometry_is_constant() {
        let mut disk = boxed();
        assert_eq!(disk.geometry(), (32, 512));
        assert_eq!(disk.capacity(), (32, 512));
        disk.block_write(5, 1, &[1; 512]).unwrap();
        assert_eq!(disk.geometry(), (32, 512));
    }
}
