//! # vfskit-vfs
//!
//! The backend-agnostic mediator: mounts a block device against whichever
//! registered backend recognizes it, then dispatches path-walking operations
//! (`cd`, `mkdir`, `get_file`, ...) against that backend uniformly.
//!
//! Callers never touch a [`VfsBackend`] directly; [`Vfs`] is the only entry
//! point, and a driver joins the system by registering a constructor and a
//! `probe` function under a string `type_name` (see [`registry`]).

use vfskit_core::{attributes, BlockDevice, ConstructFn, Error, FormatFn, PathComponents, ProbeFn, Result, VfsBackend, VfsNode};

/// A driver registration: how to recognize, build, and format one backend.
pub struct BackendEntry {
    pub type_name: &'static str,
    pub probe: ProbeFn,
    pub construct: ConstructFn,
    pub format: FormatFn,
}

/// The drivers known to this build. FAT12 today; additional backends join by
/// appending an entry here.
pub fn registry() -> Vec<BackendEntry> {
    vec![BackendEntry {
        type_name: "fat12",
        probe: vfskit_fat12::probe,
        construct: vfskit_fat12::construct,
        format: vfskit_fat12::format,
    }]
}

/// Format `device` for the named backend's on-disk layout.
pub fn format(device: &mut dyn BlockDevice, type_name: &str, volume_label: &str, bootcode: Option<&[u8]>) -> Result<()> {
    let entry = registry()
        .into_iter()
        .find(|e| e.type_name == type_name)
        .ok_or_else(|| Error::unsupported(format!("no registered backend named '{type_name}'")))?;

    tracing::debug!(type_name, %volume_label, "formatting device");
    (entry.format)(device, volume_label, bootcode)
}

/// A mounted filesystem: owns the device and the backend driving it, plus the
/// component-name stack backing [`Vfs::pwd`].
///
/// Path-walking operations (`cd`, `mkdir`, `get_file`) restore the backend's
/// current directory and this stack to their pre-call values whenever the
/// walk fails partway, so a failed call never leaves the mediator pointed at
/// an inconsistent location.
pub struct Vfs {
    device: Box<dyn BlockDevice>,
    backend: Box<dyn VfsBackend>,
    path_stack: Vec<String>,
    unmounted: bool,
}

impl Vfs {
    /// Probe every registered backend against `device`; mount the first one
    /// that recognizes it. Fails with `Unsupported` if none do.
    pub fn mount(mut device: Box<dyn BlockDevice>) -> Result<Self> {
        for entry in registry() {
            if (entry.probe)(device.as_mut())? {
                let mut backend = (entry.construct)();
                backend.mount(device.as_mut())?;
                tracing::info!(type_name = entry.type_name, "mounted device");
                return Ok(Self {
                    device,
                    backend,
                    path_stack: Vec::new(),
                    unmounted: false,
                });
            }
        }
        Err(Error::unsupported("no registered backend recognizes this device"))
    }

    /// Flush backend state and release the device. Safe to skip: an
    /// un-unmounted `Vfs` flushes itself on drop, but errors from that path
    /// are swallowed, so callers that care about flush failures should call
    /// this explicitly.
    pub fn unmount(mut self) -> Result<()> {
        self.unmounted = true;
        tracing::debug!("unmounting device");
        self.backend.unmount(self.device.as_mut())
    }

    /// Canonical textual path of the current directory (`"/"` at the root).
    pub fn pwd(&self) -> String {
        if self.path_stack.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.path_stack.join("/"))
        }
    }

    fn snapshot(&self) -> (Vec<String>, VfsNode) {
        (self.path_stack.clone(), self.backend.current_directory())
    }

    fn restore(&mut self, snapshot: (Vec<String>, VfsNode)) {
        self.path_stack = snapshot.0;
        let _ = self.backend.set_directory(self.device.as_mut(), Some(&snapshot.1));
    }

    /// Change the current directory. Leaves CWD and `pwd()` untouched on any
    /// failure, per the mediator's restore-on-failure contract.
    pub fn cd(&mut self, path: &str) -> Result<()> {
        let components = PathComponents::parse(path);
        let snapshot = self.snapshot();

        let result = self.walk_to_directory(&components);
        if result.is_err() {
            self.restore(snapshot);
        }
        result
    }

    fn walk_to_directory(&mut self, components: &PathComponents) -> Result<()> {
        if components.is_root {
            self.backend.set_directory(self.device.as_mut(), None)?;
            self.path_stack.clear();
        }

        for comp in &components.components {
            let node = self.backend.get_node(self.device.as_mut(), comp)?;
            if !node.is_used() {
                return Err(Error::not_found(comp.clone()));
            }
            if !node.is_directory() {
                return Err(Error::not_a_directory(comp.clone()));
            }
            self.backend.set_directory(self.device.as_mut(), Some(&node))?;
            self.path_stack.push(comp.clone());
        }

        Ok(())
    }

    /// Create `name` as a file in the current directory if it does not
    /// already exist. `name` is the last path component only — callers
    /// wanting a full-path touch should `cd` to the parent first.
    pub fn touch(&mut self, name: &str) -> Result<VfsNode> {
        self.backend.create_file(self.device.as_mut(), name, 0)
    }

    /// Entries in the current directory.
    pub fn list_directory(&mut self) -> Result<Vec<VfsNode>> {
        self.backend.list_directory(self.device.as_mut())
    }

    /// Create every missing directory along `path`, descending into each as
    /// it is created or found. CWD is always restored afterward, on success
    /// as well as failure — `mkdir` creates directories, it does not `cd`.
    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        let components = PathComponents::parse(path);
        let snapshot = self.snapshot();

        let result = self.mkdir_walk(&components);
        self.restore(snapshot);
        result
    }

    fn mkdir_walk(&mut self, components: &PathComponents) -> Result<()> {
        if components.is_root {
            self.backend.set_directory(self.device.as_mut(), None)?;
            self.path_stack.clear();
        }

        for comp in &components.components {
            let existing = self.backend.get_node(self.device.as_mut(), comp)?;
            let node = if existing.is_used() {
                if !existing.is_directory() {
                    return Err(Error::not_a_directory(comp.clone()));
                }
                existing
            } else {
                self.backend.create_dir(self.device.as_mut(), comp, attributes::DIRECTORY)?
            };

            self.backend.set_directory(self.device.as_mut(), Some(&node))?;
            self.path_stack.push(comp.clone());
        }

        Ok(())
    }

    /// Create `name` if necessary, then write its full contents.
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.backend.create_file(self.device.as_mut(), name, 0)?;
        self.backend.write(self.device.as_mut(), name, bytes)
    }

    /// Read a file's full contents from the current directory.
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        self.backend.read(self.device.as_mut(), name)
    }

    /// Remove a file or directory entry from the current directory.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.backend.remove(self.device.as_mut(), name)
    }

    /// Resolve `path` to a file node with its full sector chain populated.
    /// CWD is always restored afterward: this is a read-only lookup, not a
    /// navigation primitive.
    pub fn get_file(&mut self, path: &str) -> Result<VfsNode> {
        let components = PathComponents::parse(path);
        if components.components.is_empty() {
            return Err(Error::invalid_path("path names no file"));
        }

        let snapshot = self.snapshot();
        let result = self.get_file_walk(&components);
        self.restore(snapshot);
        result
    }

    fn get_file_walk(&mut self, components: &PathComponents) -> Result<VfsNode> {
        if components.is_root {
            self.backend.set_directory(self.device.as_mut(), None)?;
        }

        let (dirs, last) = components.components.split_at(components.components.len() - 1);
        for comp in dirs {
            let node = self.backend.get_node(self.device.as_mut(), comp)?;
            if !node.is_used() {
                return Err(Error::not_found(comp.clone()));
            }
            if !node.is_directory() {
                return Err(Error::not_a_directory(comp.clone()));
            }
            self.backend.set_directory(self.device.as_mut(), Some(&node))?;
        }

        let name = &last[0];
        let node = self.backend.get_node(self.device.as_mut(), name)?;
        if !node.is_used() {
            return Err(Error::not_found(name.clone()));
        }
        if node.is_directory() {
            return Err(Error::is_a_directory(name.clone()));
        }
        Ok(node)
    }

    /// Number of sectors backing `path`, or 0 if it does not resolve to a file.
    pub fn sector_count_of(&mut self, path: &str) -> u32 {
        self.get_file(path).map(|n| n.sector_count()).unwrap_or(0)
    }

    /// The `n`th sector of `path`'s chain, or `u32::MAX` if it does not exist
    /// or `n` is out of range.
    pub fn nth_sector_of(&mut self, n: usize, path: &str) -> u32 {
        self.get_file(path)
            .ok()
            .and_then(|node| node.sectors.get(n).copied())
            .unwrap_or(u32::MAX)
    }
}

impl Drop for Vfs {
    fn drop(&mut self) {
        if !self.unmounted {
            let _ = self.backend.unmount(self.device.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfskit_device::MemoryDevice;

    fn mounted_1_44mb() -> Vfs {
        let mut dev = MemoryDevice::new(512, 2880).unwrap();
        format(&mut dev, "fat12", "TEST       ", None).unwrap();
        Vfs::mount(Box::new(dev)).unwrap()
    }

    #[test]
    fn test_mount_unsupported_device_fails() {
        let dev = MemoryDevice::new(512, 10).unwrap();
        assert!(matches!(Vfs::mount(Box::new(dev)), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_format_and_mount_round_trip() {
        let vfs = mounted_1_44mb();
        assert_eq!(vfs.pwd(), "/");
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut vfs = mounted_1_44mb();
        vfs.write("HELLO.TXT", b"Hello, world!").unwrap();
        assert_eq!(vfs.read("HELLO.TXT").unwrap(), b"Hello, world!");
        assert_eq!(vfs.sector_count_of("HELLO.TXT"), 1);
    }

    #[test]
    fn test_mkdir_nested_then_cd() {
        let mut vfs = mounted_1_44mb();
        vfs.mkdir("/A/B/C").unwrap();
        vfs.cd("/A/B/C").unwrap();
        assert_eq!(vfs.pwd(), "/A/B/C");
    }

    #[test]
    fn test_mkdir_is_idempotent() {
        let mut vfs = mounted_1_44mb();
        vfs.mkdir("/X").unwrap();
        vfs.mkdir("/X").unwrap();
        vfs.cd("/X").unwrap();
        assert_eq!(vfs.pwd(), "/X");
    }

    #[test]
    fn test_mkdir_does_not_move_cwd() {
        let mut vfs = mounted_1_44mb();
        vfs.mkdir("/A").unwrap();
        vfs.cd("/A").unwrap();

        vfs.mkdir("B").unwrap();
        assert_eq!(vfs.pwd(), "/A");

        vfs.touch("README").unwrap();
        vfs.cd("/A/B").unwrap();
        assert!(!vfs.list_directory().unwrap().iter().any(|n| n.name == "README"));
    }

    #[test]
    fn test_cd_nonexistent_leaves_pwd_unchanged() {
        let mut vfs = mounted_1_44mb();
        vfs.mkdir("/A").unwrap();
        vfs.cd("/A").unwrap();
        assert!(vfs.cd("/does/not/exist").is_err());
        assert_eq!(vfs.pwd(), "/A");
    }

    #[test]
    fn test_get_file_does_not_change_cwd() {
        let mut vfs = mounted_1_44mb();
        vfs.mkdir("/A").unwrap();
        vfs.cd("/A").unwrap();
        vfs.write("LEAF.TXT", b"x").unwrap();
        vfs.cd("/").unwrap();

        let node = vfs.get_file("/A/LEAF.TXT").unwrap();
        assert_eq!(node.sector_count(), 1);
        assert_eq!(vfs.pwd(), "/");
    }

    #[test]
    fn test_sector_count_and_nth_sector_absent_file() {
        let mut vfs = mounted_1_44mb();
        assert_eq!(vfs.sector_count_of("MISSING.TXT"), 0);
        assert_eq!(vfs.nth_sector_of(0, "MISSING.TXT"), u32::MAX);
    }

    #[test]
    fn test_two_cluster_file_nth_sector() {
        let mut vfs = mounted_1_44mb();
        vfs.write("BIG.BIN", &vec![0xCDu8; 513]).unwrap();
        assert_eq!(vfs.sector_count_of("BIG.BIN"), 2);
        assert_ne!(vfs.nth_sector_of(0, "BIG.BIN"), vfs.nth_sector_of(1, "BIG.BIN"));
        assert_eq!(vfs.nth_sector_of(2, "BIG.BIN"), u32::MAX);
    }

    #[test]
    fn test_unmount_flushes_without_error() {
        let vfs = mounted_1_44mb();
        vfs.unmount().unwrap();
    }
}
