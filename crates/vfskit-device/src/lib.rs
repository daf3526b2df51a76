//! # vfskit-device
//!
//! Reference [`BlockDevice`](vfskit_core::BlockDevice) implementations: an
//! in-memory device for scratch images and formatting, and a file-backed
//! device for real disk images.

pub mod file;
pub mod memory;

pub use file::FileDevice;
pub use memory::MemoryDevice;
