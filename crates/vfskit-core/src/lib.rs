//! # vfskit-core
//!
//! Foundational traits, types, and error handling shared by every vfskit crate.
//!
//! - [`traits::BlockDevice`]: a fixed-size-sector block device.
//! - [`traits::VfsBackend`]: a filesystem driver mounted atop a `BlockDevice`.
//! - [`types::VfsNode`]: an owned, value-typed directory entry snapshot.
//! - [`error::Error`]: the error type shared across the device, backend, and
//!   mediator layers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vfskit_core::{BlockDevice, VfsBackend, Result};
//!
//! fn mount_and_list(device: &mut dyn BlockDevice, backend: &mut dyn VfsBackend) -> Result<()> {
//!     backend.mount(device)?;
//!     for node in backend.list_directory(device)? {
//!         println!("{node}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod security;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use security::*;
pub use traits::{BlockDevice, ConstructFn, FormatFn, ProbeFn, ReadSeek, ReadWriteSeek, VfsBackend};
pub use types::{attributes, format_size, NodeState, PathComponents, VfsNode};
