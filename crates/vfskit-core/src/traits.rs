//! Core traits for vfskit: the block device contract and the backend capability set.

use crate::{error::Result, types::VfsNode};
use std::io::{Read, Seek, Write};

/// A fixed-size-sector block device.
///
/// Every sector index in `0..sector_count()` is readable and writable; reads or
/// writes outside that range fail. Implementations may buffer internally but
/// must present a sequentially consistent view to a single caller — no caching
/// contract is mandated beyond that.
pub trait BlockDevice: Send {
    /// Number of bytes per sector.
    fn sector_size(&self) -> u32;

    /// Total number of addressable sectors.
    fn sector_count(&self) -> u32;

    /// Read one sector into a fresh buffer of `sector_size()` bytes.
    fn read_sector(&mut self, index: u32) -> Result<Vec<u8>>;

    /// Write one sector. `data.len()` must equal `sector_size()`.
    fn write_sector(&mut self, index: u32, data: &[u8]) -> Result<()>;

    /// Push any buffered sectors to the backing store.
    fn flush(&mut self) -> Result<()>;
}

/// The capability set every filesystem driver (backend) provides.
///
/// A backend owns its own private mount state (superblock fields, in-memory FAT,
/// current-directory bookkeeping) but never owns the device — every operation
/// that touches disk takes the device explicitly, so the mediator can hold both
/// without fighting the borrow checker over who owns what.
pub trait VfsBackend: Send {
    /// Stable identifier used for registry lookup (e.g. `"fat12"`).
    fn type_name(&self) -> &'static str;

    /// Read the superblock/FAT/etc. and cache mount state. Called once, right
    /// after construction, before any other method.
    fn mount(&mut self, device: &mut dyn BlockDevice) -> Result<()>;

    /// Flush any dirty state to the device. Called once, before the handle is
    /// torn down.
    fn unmount(&mut self, device: &mut dyn BlockDevice) -> Result<()>;

    /// Update the cached current-directory node. `None` means the root.
    fn set_directory(&mut self, device: &mut dyn BlockDevice, node: Option<&VfsNode>) -> Result<()>;

    /// A copy of the current-directory node (the root sentinel if at the root).
    fn current_directory(&self) -> VfsNode;

    /// Ordered list of directory entries in the current directory.
    fn list_directory(&self, device: &mut dyn BlockDevice) -> Result<Vec<VfsNode>>;

    /// Search the current directory for `name`.
    ///
    /// Returns a node with `state = Unused`/`Available` rather than an error
    /// when absent, so callers can distinguish "absent" from "backend error".
    fn get_node(&self, device: &mut dyn BlockDevice, name: &str) -> Result<VfsNode>;

    /// Create a file entry in the current directory.
    fn create_file(&mut self, device: &mut dyn BlockDevice, name: &str, attrs: u8) -> Result<VfsNode>;

    /// Create a directory entry in the current directory.
    fn create_dir(&mut self, device: &mut dyn BlockDevice, name: &str, attrs: u8) -> Result<VfsNode>;

    /// Truncate-and-write a file's contents, allocating a cluster chain as needed.
    fn write(&mut self, device: &mut dyn BlockDevice, name: &str, bytes: &[u8]) -> Result<()>;

    /// Read a file's full contents.
    fn read(&self, device: &mut dyn BlockDevice, name: &str) -> Result<Vec<u8>>;

    /// Free a file's cluster chain and mark its directory entry available.
    fn remove(&mut self, device: &mut dyn BlockDevice, name: &str) -> Result<()>;
}

/// Probe a device to see if it looks like a given backend's format.
///
/// Kept separate from [`VfsBackend`] (rather than a trait method) so it can run
/// against a bare device before any backend instance — and therefore any mount
/// state — exists.
pub type ProbeFn = fn(&mut dyn BlockDevice) -> Result<bool>;

/// Construct a fresh, unmounted backend instance.
pub type ConstructFn = fn() -> Box<dyn VfsBackend>;

/// Format a device for a given backend's on-disk layout.
pub type FormatFn = fn(&mut dyn BlockDevice, volume_label: &str, bootcode: Option<&[u8]>) -> Result<()>;

/// Combined trait for `Read + Seek`, used by block device backing stores.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Combined trait for `Read + Write + Seek`, used by file-backed block devices.
pub trait ReadWriteSeek: Read + Write + Seek + Send {}
impl<T: Read + Write + Seek + Send> ReadWriteSeek for T {}
