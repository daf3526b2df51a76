//! # vfskit-fat12
//!
//! A reference [`vfskit_core::VfsBackend`] implementing the FAT12 on-disk
//! format: boot sector, packed 12-bit FAT, fixed root directory region, and
//! cluster-chained subdirectories.

pub mod backend;
pub mod types;

pub use backend::{construct, format, probe, Fat12Backend};
