//! A block device backed by a real file on disk.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use vfskit_core::security::{checked_multiply_u32_to_u64, validate_sector_size};
use vfskit_core::{Error, Result};

/// A block device reading and writing sectors directly against an open file.
pub struct FileDevice {
    file: File,
    sector_size: u32,
    sector_count: u32,
}

impl FileDevice {
    /// Open an existing image file read-write. `sector_size` must evenly divide the
    /// file length.
    pub fn open(path: &Path, sector_size: u32) -> Result<Self> {
        validate_sector_size(sector_size)?;
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let length = file.metadata()?.len();

        if length % sector_size as u64 != 0 {
            return Err(Error::corrupt(format!(
                "file length {length} is not a multiple of sector size {sector_size}"
            )));
        }

        Ok(Self {
            file,
            sector_size,
            sector_count: (length / sector_size as u64) as u32,
        })
    }

    /// Create a new zero-filled image file of `sector_count` sectors and open it.
    pub fn create(path: &Path, sector_size: u32, sector_count: u32) -> Result<Self> {
        validate_sector_size(sector_size)?;
        let total = checked_multiply_u32_to_u64(sector_size, sector_count, "file device size")?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        file.set_len(total)?;
        file.flush()?;

        Ok(Self {
            file,
            sector_size,
            sector_count,
        })
    }

    fn seek_to(&mut self, index: u32) -> Result<()> {
        if index >= self.sector_count {
            return Err(Error::invalid_operation(format!(
                "sector {index} out of range (0..{})",
                self.sector_count
            )));
        }

        let offset = index as u64 * self.sector_size as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

impl vfskit_core::BlockDevice for FileDevice {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn sector_count(&self) -> u32 {
        self.sector_count
    }

    fn read_sector(&mut self, index: u32) -> Result<Vec<u8>> {
        self.seek_to(index)?;
        let mut buf = vec![0u8; self.sector_size as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_sector(&mut self, index: u32, data: &[u8]) -> Result<()> {
        if data.len() != self.sector_size as usize {
            return Err(Error::invalid_operation(format!(
                "write of {} bytes does not match sector size {}",
                data.len(),
                self.sector_size
            )));
        }

        self.seek_to(index)?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use vfskit_core::BlockDevice;

    #[test]
    fn test_create_then_reopen() {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut dev = FileDevice::create(tmp.path(), 512, 10).unwrap();
            dev.write_sector(3, &[0x42; 512]).unwrap();
            dev.flush().unwrap();
        }

        let mut dev = FileDevice::open(tmp.path(), 512).unwrap();
        assert_eq!(dev.sector_count(), 10);
        assert_eq!(dev.read_sector(3).unwrap(), vec![0x42; 512]);
        assert_eq!(dev.read_sector(0).unwrap(), vec![0u8; 512]);
    }

    #[test]
    fn test_open_rejects_misaligned_file() {
        let tmp = NamedTempFile::new().unwrap();
        tmp.as_file().set_len(513).unwrap();
        assert!(FileDevice::open(tmp.path(), 512).is_err());
    }

    #[test]
    fn test_out_of_range_write_fails() {
        let tmp = NamedTempFile::new().unwrap();
        let mut dev = FileDevice::create(tmp.path(), 512, 2).unwrap();
        assert!(dev.write_sector(2, &[0u8; 512]).is_err());
    }
}
