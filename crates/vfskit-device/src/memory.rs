//! An in-memory block device backed by a single `Vec<u8>`.
//!
//! Used for scratch images (format-then-inspect round trips in tests) and
//! anywhere a caller wants a device without touching the filesystem.

use vfskit_core::{security::validate_sector_size, Error, Result};

/// A block device whose sectors live entirely in a `Vec<u8>`.
pub struct MemoryDevice {
    sector_size: u32,
    data: Vec<u8>,
}

impl MemoryDevice {
    /// Create a blank, zero-filled device of `sector_count` sectors of `sector_size` bytes each.
    pub fn new(sector_size: u32, sector_count: u32) -> Result<Self> {
        validate_sector_size(sector_size)?;
        let total = vfskit_core::security::checked_multiply_u32_to_u64(
            sector_size,
            sector_count,
            "memory device size",
        )?;

        Ok(Self {
            sector_size,
            data: vec![0u8; total as usize],
        })
    }

    /// Wrap an existing byte buffer as a device, whose length must be an exact
    /// multiple of `sector_size`.
    pub fn from_bytes(sector_size: u32, data: Vec<u8>) -> Result<Self> {
        validate_sector_size(sector_size)?;
        if data.len() % sector_size as usize != 0 {
            return Err(Error::corrupt(format!(
                "buffer length {} is not a multiple of sector size {sector_size}",
                data.len()
            )));
        }

        Ok(Self { sector_size, data })
    }

    /// Borrow the full backing buffer, e.g. to compare two images byte-for-byte.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn offset_of(&self, index: u32) -> Result<usize> {
        if index >= self.sector_count() {
            return Err(Error::invalid_operation(format!(
                "sector {index} out of range (0..{})",
                self.sector_count()
            )));
        }

        Ok(index as usize * self.sector_size as usize)
    }
}

impl vfskit_core::BlockDevice for MemoryDevice {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn sector_count(&self) -> u32 {
        (self.data.len() / self.sector_size as usize) as u32
    }

    fn read_sector(&mut self, index: u32) -> Result<Vec<u8>> {
        let offset = self.offset_of(index)?;
        Ok(self.data[offset..offset + self.sector_size as usize].to_vec())
    }

    fn write_sector(&mut self, index: u32, data: &[u8]) -> Result<()> {
        if data.len() != self.sector_size as usize {
            return Err(Error::invalid_operation(format!(
                "write of {} bytes does not match sector size {}",
                data.len(),
                self.sector_size
            )));
        }

        let offset = self.offset_of(index)?;
        self.data[offset..offset + self.sector_size as usize].copy_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfskit_core::BlockDevice;

    #[test]
    fn test_new_is_zeroed() {
        let mut dev = MemoryDevice::new(512, 10).unwrap();
        assert_eq!(dev.sector_count(), 10);
        assert_eq!(dev.read_sector(0).unwrap(), vec![0u8; 512]);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut dev = MemoryDevice::new(512, 4).unwrap();
        let data = vec![0xAB; 512];
        dev.write_sector(2, &data).unwrap();
        assert_eq!(dev.read_sector(2).unwrap(), data);
        assert_eq!(dev.read_sector(1).unwrap(), vec![0u8; 512]);
    }

    #[test]
    fn test_out_of_range_read_fails() {
        let mut dev = MemoryDevice::new(512, 2).unwrap();
        assert!(dev.read_sector(2).is_err());
    }

    #[test]
    fn test_wrong_size_write_fails() {
        let mut dev = MemoryDevice::new(512, 2).unwrap();
        assert!(dev.write_sector(0, &[0u8; 511]).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_misaligned_length() {
        assert!(MemoryDevice::from_bytes(512, vec![0u8; 1000]).is_err());
        assert!(MemoryDevice::from_bytes(512, vec![0u8; 1024]).is_ok());
    }
}
