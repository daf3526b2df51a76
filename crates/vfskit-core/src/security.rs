//! Validated-arithmetic helpers.
//!
//! Every offset/size computed from boot-sector fields is attacker-controlled —
//! a malformed or adversarial image must not be able to crash the process via
//! integer overflow, a divide-by-zero, or an out-of-bounds slice index.

use crate::Error;

/// Largest sector size vfskit will accept.
pub const MAX_SECTOR_SIZE: u32 = 4096;

/// Largest in-memory FAT buffer vfskit will allocate (FAT12's 32 MiB ceiling
/// implies a FAT table of a few tens of KB; this is a generous upper bound).
pub const MAX_FAT_TABLE_SIZE: usize = 1024 * 1024;

/// Largest cluster chain vfskit will walk before declaring the filesystem corrupt.
/// FAT12 has at most 4084 data clusters, so this is already a wide margin.
pub const MAX_CLUSTER_CHAIN_LENGTH: usize = 8192;

/// Validate that a size is within an allocation limit, returning it as `usize`.
pub fn validate_allocation_size(size: u64, limit: usize, context: &str) -> crate::Result<usize> {
    if size > limit as u64 {
        return Err(Error::corrupt(format!(
            "{context} size {size} exceeds limit {limit}"
        )));
    }

    size.try_into()
        .map_err(|_| Error::corrupt(format!("{context} size exceeds platform limits")))
}

/// Multiply two `u64` values, turning overflow into a `Corrupt` error.
pub fn checked_multiply_u64(a: u64, b: u64, context: &str) -> crate::Result<u64> {
    a.checked_mul(b)
        .ok_or_else(|| Error::corrupt(format!("{context}: multiplication overflow")))
}

/// Multiply two `u32` values, widening to `u64` so the multiply itself cannot overflow.
pub fn checked_multiply_u32_to_u64(a: u32, b: u32, context: &str) -> crate::Result<u64> {
    (a as u64)
        .checked_mul(b as u64)
        .ok_or_else(|| Error::corrupt(format!("{context}: multiplication overflow")))
}

/// Convert `u64` to `usize`, turning truncation (relevant on 32-bit targets) into an error.
pub fn u64_to_usize(value: u64, context: &str) -> crate::Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::corrupt(format!("{context}: value {value} exceeds platform usize limit")))
}

/// Validate that a sector size is nonzero, bounded, and a power of two.
pub fn validate_sector_size(sector_size: u32) -> crate::Result<()> {
    if sector_size == 0 || sector_size > MAX_SECTOR_SIZE {
        return Err(Error::corrupt(format!(
            "invalid sector size: {sector_size} (must be 1-{MAX_SECTOR_SIZE})"
        )));
    }

    if !sector_size.is_power_of_two() {
        return Err(Error::corrupt(format!(
            "sector size {sector_size} is not a power of 2"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_allocation_size() {
        assert!(validate_allocation_size(1024, MAX_FAT_TABLE_SIZE, "test").is_ok());
        assert!(validate_allocation_size(MAX_FAT_TABLE_SIZE as u64 + 1, MAX_FAT_TABLE_SIZE, "test").is_err());
    }

    #[test]
    fn test_checked_multiply_u64() {
        assert_eq!(checked_multiply_u64(1000, 512, "test").unwrap(), 512_000);
        assert!(checked_multiply_u64(u64::MAX, 2, "test").is_err());
    }

    #[test]
    fn test_checked_multiply_u32_to_u64() {
        assert_eq!(
            checked_multiply_u32_to_u64(u32::MAX, 2, "test").unwrap(),
            (u32::MAX as u64) * 2
        );
    }

    #[test]
    fn test_validate_sector_size() {
        assert!(validate_sector_size(512).is_ok());
        assert!(validate_sector_size(4096).is_ok());
        assert!(validate_sector_size(0).is_err());
        assert!(validate_sector_size(5000).is_err());
        assert!(validate_sector_size(1000).is_err());
    }

    #[test]
    fn test_u64_to_usize() {
        assert_eq!(u64_to_usize(1024, "test").unwrap(), 1024);
    }
}
