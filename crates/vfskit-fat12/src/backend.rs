//! The FAT12 [`VfsBackend`] implementation: mount/format plus the read, write,
//! create, and remove algorithms for files and directories.

use vfskit_core::security::validate_sector_size;
use vfskit_core::types::attributes;
use vfskit_core::{BlockDevice, Error, NodeState, Result, VfsBackend, VfsNode};

use crate::types::{
    canonicalize_name, decode_name, read_fat_entry, write_fat_entry, BootSector, RawDirEntry,
    DIR_ENTRY_SIZE, FAT12_BAD, FAT12_END_MIN, FAT12_FREE, FAT12_RESERVED_MIN,
};

const MAX_CLUSTER_CHAIN_LENGTH: usize = vfskit_core::security::MAX_CLUSTER_CHAIN_LENGTH;

/// Result of scanning a directory region for a name.
struct SlotSearch {
    found: Option<VfsNode>,
    free_slot: Option<(u32, usize)>,
    region_full: bool,
}

/// The FAT12 filesystem driver. Holds the parsed boot sector, the single
/// logical FAT buffer (mirrored to every on-disk FAT copy on flush), and the
/// cached current-directory node.
pub struct Fat12Backend {
    boot: Option<BootSector>,
    fat: Vec<u8>,
    cwd: VfsNode,
}

impl Default for Fat12Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Fat12Backend {
    pub fn new() -> Self {
        Self {
            boot: None,
            fat: Vec::new(),
            cwd: VfsNode::root(),
        }
    }

    fn boot(&self) -> Result<&BootSector> {
        self.boot.as_ref().ok_or_else(|| Error::invalid_operation("backend is not mounted"))
    }

    fn cwd_cluster(&self) -> u32 {
        self.cwd.first_sector
    }

    fn flush_fat(&self, device: &mut dyn BlockDevice) -> Result<()> {
        let boot = self.boot()?;
        let sector_size = boot.bytes_per_sector as usize;

        for copy in 0..boot.num_fats as u32 {
            let mut sector = boot.fat_copy_start_sector(copy);
            let mut offset = 0;
            while offset < self.fat.len() {
                let mut buf = vec![0u8; sector_size];
                let take = (self.fat.len() - offset).min(sector_size);
                buf[..take].copy_from_slice(&self.fat[offset..offset + take]);
                device.write_sector(sector, &buf)?;
                offset += take;
                sector += 1;
            }
        }

        Ok(())
    }

    /// Follow a cluster chain, returning an error on a reserved/bad entry or a
    /// chain long enough to indicate corruption (a loop).
    fn walk_chain(&self, start_cluster: u32) -> Result<Vec<u32>> {
        if start_cluster == 0 {
            return Ok(Vec::new());
        }

        let mut chain = Vec::new();
        let mut cluster = start_cluster;

        loop {
            if chain.len() >= MAX_CLUSTER_CHAIN_LENGTH {
                return Err(Error::corrupt("cluster chain exceeds maximum length"));
            }

            chain.push(cluster);
            let next = read_fat_entry(&self.fat, cluster)?;

            if next >= FAT12_END_MIN {
                break;
            }
            if next == FAT12_FREE
                || next == 1
                || (FAT12_RESERVED_MIN..=FAT12_BAD).contains(&next)
            {
                return Err(Error::corrupt(format!(
                    "cluster {cluster} chains to invalid entry {next:#x}"
                )));
            }

            cluster = next;
        }

        Ok(chain)
    }

    fn chain_to_sectors(&self, chain: &[u32]) -> Result<Vec<u32>> {
        let boot = self.boot()?;
        let mut sectors = Vec::with_capacity(chain.len() * boot.sectors_per_cluster as usize);
        for &cluster in chain {
            let first = boot.cluster_to_sector(cluster)?;
            for i in 0..boot.sectors_per_cluster as u32 {
                sectors.push(first + i);
            }
        }
        Ok(sectors)
    }

    fn node_from_entry(&self, entry: &RawDirEntry, location: (u32, usize)) -> Result<VfsNode> {
        let chain = self.walk_chain(entry.first_cluster as u32)?;
        let sectors = self.chain_to_sectors(&chain)?;

        Ok(VfsNode {
            name: decode_name(&entry.name),
            state: NodeState::Used,
            attributes: entry.attributes,
            size: entry.size,
            first_sector: entry.first_cluster as u32,
            sectors,
            directory_location: Some(location),
        })
    }

    /// Ordered list of sectors backing a directory region: the fixed root
    /// region, or a subdirectory's cluster chain.
    fn directory_sectors(&self, dir_first_cluster: u32) -> Result<Vec<u32>> {
        if dir_first_cluster == 0 {
            let boot = self.boot()?;
            let start = boot.root_dir_start_sector()?;
            let count = boot.root_dir_sectors()?;
            Ok((start..start + count).collect())
        } else {
            let chain = self.walk_chain(dir_first_cluster)?;
            self.chain_to_sectors(&chain)
        }
    }

    fn list_entries(&self, device: &mut dyn BlockDevice, dir_first_cluster: u32) -> Result<Vec<VfsNode>> {
        let sectors = self.directory_sectors(dir_first_cluster)?;
        let bps = self.boot()?.bytes_per_sector as usize;
        let mut out = Vec::new();

        'sectors: for sector in sectors {
            let data = device.read_sector(sector)?;
            for offset in (0..bps).step_by(DIR_ENTRY_SIZE) {
                let raw = RawDirEntry::from_bytes(&data[offset..offset + DIR_ENTRY_SIZE]);
                if raw.is_unused() {
                    break 'sectors;
                }
                if raw.is_available() {
                    continue;
                }
                if raw.attributes & attributes::VOLUME_LABEL != 0 {
                    continue;
                }
                out.push(self.node_from_entry(&raw, (sector, offset))?);
            }
        }

        Ok(out)
    }

    fn find_in_directory(
        &self,
        device: &mut dyn BlockDevice,
        dir_first_cluster: u32,
        name_raw: &[u8; 11],
    ) -> Result<SlotSearch> {
        let sectors = self.directory_sectors(dir_first_cluster)?;
        let bps = self.boot()?.bytes_per_sector as usize;
        let mut free_slot = None;

        for sector in sectors {
            let data = device.read_sector(sector)?;
            for offset in (0..bps).step_by(DIR_ENTRY_SIZE) {
                let raw = RawDirEntry::from_bytes(&data[offset..offset + DIR_ENTRY_SIZE]);

                if raw.is_unused() {
                    return Ok(SlotSearch {
                        found: None,
                        free_slot: free_slot.or(Some((sector, offset))),
                        region_full: false,
                    });
                }

                if raw.is_available() {
                    if free_slot.is_none() {
                        free_slot = Some((sector, offset));
                    }
                    continue;
                }

                if &raw.name == name_raw {
                    let node = self.node_from_entry(&raw, (sector, offset))?;
                    return Ok(SlotSearch {
                        found: Some(node),
                        free_slot,
                        region_full: false,
                    });
                }
            }
        }

        Ok(SlotSearch {
            found: None,
            free_slot,
            region_full: free_slot.is_none(),
        })
    }

    /// Find a free cluster and mark it end-of-chain in the in-memory FAT
    /// (caller links it into a chain and flushes).
    fn allocate_cluster(&mut self) -> Result<u32> {
        let total = self.boot()?.total_clusters()?;
        for cluster in 2..total + 2 {
            if read_fat_entry(&self.fat, cluster)? == FAT12_FREE {
                write_fat_entry(&mut self.fat, cluster, crate::types::FAT12_END)?;
                return Ok(cluster);
            }
        }
        Err(Error::no_space("no free clusters remain"))
    }

    fn free_cluster(&mut self, cluster: u32) -> Result<()> {
        write_fat_entry(&mut self.fat, cluster, FAT12_FREE)
    }

    fn zero_cluster(&self, device: &mut dyn BlockDevice, cluster: u32) -> Result<()> {
        let boot = self.boot()?;
        let sector_size = boot.bytes_per_sector as usize;
        let first = boot.cluster_to_sector(cluster)?;
        let zero = vec![0u8; sector_size];
        for i in 0..boot.sectors_per_cluster as u32 {
            device.write_sector(first + i, &zero)?;
        }
        Ok(())
    }

    /// Grow a directory's cluster chain by one cluster so a new entry fits.
    /// Returns the new cluster's first slot location.
    fn grow_directory(&mut self, device: &mut dyn BlockDevice, dir_first_cluster: u32) -> Result<(u32, usize)> {
        let chain = self.walk_chain(dir_first_cluster)?;
        let last = *chain
            .last()
            .ok_or_else(|| Error::corrupt("directory cluster chain is empty"))?;

        let new_cluster = self.allocate_cluster()?;
        write_fat_entry(&mut self.fat, last, new_cluster as u16)?;
        self.zero_cluster(device, new_cluster)?;

        let sector = self.boot()?.cluster_to_sector(new_cluster)?;
        Ok((sector, 0))
    }

    fn write_entry_at(&self, device: &mut dyn BlockDevice, location: (u32, usize), entry: &RawDirEntry) -> Result<()> {
        let (sector, offset) = location;
        let mut data = device.read_sector(sector)?;
        data[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(&entry.to_bytes());
        device.write_sector(sector, &data)
    }

    fn locate_slot_for_new_entry(
        &mut self,
        device: &mut dyn BlockDevice,
        search: &SlotSearch,
    ) -> Result<(u32, usize)> {
        if let Some(loc) = search.free_slot {
            return Ok(loc);
        }

        if !search.region_full {
            unreachable!("no free slot and region not full is an invalid search result");
        }

        let dir_cluster = self.cwd_cluster();
        if dir_cluster == 0 {
            return Err(Error::no_space("root directory is full"));
        }

        self.grow_directory(device, dir_cluster)
    }

    fn create_entry(
        &mut self,
        device: &mut dyn BlockDevice,
        name: &str,
        attrs: u8,
        is_dir_request: bool,
    ) -> Result<VfsNode> {
        let raw_name = canonicalize_name(name)?;
        let search = self.find_in_directory(device, self.cwd_cluster(), &raw_name)?;

        if let Some(existing) = &search.found {
            if existing.is_directory() == is_dir_request {
                return Ok(existing.clone());
            }
            return Err(Error::already_exists(format!(
                "'{name}' exists with a different type"
            )));
        }

        let location = self.locate_slot_for_new_entry(device, &search)?;

        let mut entry = RawDirEntry::unused();
        entry.name = raw_name;
        entry.attributes = attrs;

        if is_dir_request {
            let new_cluster = self.allocate_cluster()?;
            self.zero_cluster(device, new_cluster)?;
            self.write_dot_entries(device, new_cluster, self.cwd_cluster())?;
            entry.first_cluster = new_cluster as u16;
        }

        self.write_entry_at(device, location, &entry)?;
        self.flush_fat(device)?;

        self.node_from_entry(&entry, location)
    }

    fn write_dot_entries(&self, device: &mut dyn BlockDevice, dir_cluster: u32, parent_cluster: u32) -> Result<()> {
        let sector = self.boot()?.cluster_to_sector(dir_cluster)?;
        let mut data = device.read_sector(sector)?;

        let mut dot = RawDirEntry::unused();
        dot.name = *b".          ";
        dot.attributes = attributes::DIRECTORY;
        dot.first_cluster = dir_cluster as u16;
        data[0..DIR_ENTRY_SIZE].copy_from_slice(&dot.to_bytes());

        let mut dotdot = RawDirEntry::unused();
        dotdot.name = *b"..         ";
        dotdot.attributes = attributes::DIRECTORY;
        dotdot.first_cluster = parent_cluster as u16;
        data[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE].copy_from_slice(&dotdot.to_bytes());

        device.write_sector(sector, &data)
    }
}

impl VfsBackend for Fat12Backend {
    fn type_name(&self) -> &'static str {
        "fat12"
    }

    fn mount(&mut self, device: &mut dyn BlockDevice) -> Result<()> {
        let sector0 = device.read_sector(0)?;
        let boot = BootSector::from_bytes(&sector0)?;

        if boot.bytes_per_sector as u32 != device.sector_size() {
            return Err(Error::corrupt("boot sector bytes_per_sector disagrees with device"));
        }

        let fat_size = boot.fat_size_bytes()?;
        let mut fat = Vec::with_capacity(fat_size);
        let mut sector = boot.fat_start_sector();
        while fat.len() < fat_size {
            let data = device.read_sector(sector)?;
            let take = (fat_size - fat.len()).min(data.len());
            fat.extend_from_slice(&data[..take]);
            sector += 1;
        }

        tracing::info!(fat_size, total_sectors = boot.total_sectors, "mounted FAT12 volume");
        self.boot = Some(boot);
        self.fat = fat;
        self.cwd = VfsNode::root();
        Ok(())
    }

    fn unmount(&mut self, device: &mut dyn BlockDevice) -> Result<()> {
        tracing::debug!("unmounting FAT12 volume");
        self.flush_fat(device)
    }

    fn set_directory(&mut self, _device: &mut dyn BlockDevice, node: Option<&VfsNode>) -> Result<()> {
        match node {
            None => self.cwd = VfsNode::root(),
            Some(n) => {
                if !n.is_directory() {
                    return Err(Error::not_a_directory(n.name.clone()));
                }
                self.cwd = n.clone();
            }
        }
        Ok(())
    }

    fn current_directory(&self) -> VfsNode {
        self.cwd.clone()
    }

    fn list_directory(&self, device: &mut dyn BlockDevice) -> Result<Vec<VfsNode>> {
        self.list_entries(device, self.cwd_cluster())
    }

    fn get_node(&self, device: &mut dyn BlockDevice, name: &str) -> Result<VfsNode> {
        let raw_name = canonicalize_name(name)?;
        let search = self.find_in_directory(device, self.cwd_cluster(), &raw_name)?;

        if let Some(node) = search.found {
            return Ok(node);
        }
        if let Some(loc) = search.free_slot {
            return Ok(VfsNode::available(Some(loc)));
        }
        Ok(VfsNode::unused())
    }

    fn create_file(&mut self, device: &mut dyn BlockDevice, name: &str, attrs: u8) -> Result<VfsNode> {
        self.create_entry(device, name, attrs & !attributes::DIRECTORY, false)
    }

    fn create_dir(&mut self, device: &mut dyn BlockDevice, name: &str, attrs: u8) -> Result<VfsNode> {
        self.create_entry(device, name, attrs | attributes::DIRECTORY, true)
    }

    fn write(&mut self, device: &mut dyn BlockDevice, name: &str, bytes: &[u8]) -> Result<()> {
        let raw_name = canonicalize_name(name)?;
        let search = self.find_in_directory(device, self.cwd_cluster(), &raw_name)?;
        let node = search.found.ok_or_else(|| Error::not_found(name))?;

        if node.is_directory() {
            return Err(Error::is_a_directory(name));
        }

        let cluster_size = self.boot()?.bytes_per_cluster()? as usize;
        let clusters_needed = bytes.len().div_ceil(cluster_size.max(1));

        let mut new_chain = Vec::with_capacity(clusters_needed);
        let alloc_result = (0..clusters_needed).try_for_each(|_| {
            let cluster = self.allocate_cluster()?;
            new_chain.push(cluster);
            Ok::<(), Error>(())
        });

        if let Err(e) = alloc_result {
            for &c in &new_chain {
                let _ = self.free_cluster(c);
            }
            tracing::warn!(name, "write failed: insufficient free clusters");
            return Err(e);
        }

        for window in new_chain.windows(2) {
            write_fat_entry(&mut self.fat, window[0], window[1] as u16)?;
        }
        if let Some(&last) = new_chain.last() {
            write_fat_entry(&mut self.fat, last, crate::types::FAT12_END)?;
        }

        let mut remaining = bytes;
        for &cluster in &new_chain {
            let sector = self.boot()?.cluster_to_sector(cluster)?;
            let mut buf = vec![0u8; cluster_size];
            let take = remaining.len().min(cluster_size);
            buf[..take].copy_from_slice(&remaining[..take]);
            remaining = &remaining[take..];

            let sectors_per_cluster = self.boot()?.sectors_per_cluster as u32;
            let sector_size = self.boot()?.bytes_per_sector as usize;
            for i in 0..sectors_per_cluster {
                let start = i as usize * sector_size;
                device.write_sector(sector + i, &buf[start..start + sector_size])?;
            }
        }

        let old_chain = self.walk_chain(node.first_sector)?;
        for c in old_chain {
            self.free_cluster(c)?;
        }

        let mut entry = RawDirEntry::unused();
        entry.name = raw_name;
        entry.attributes = node.attributes;
        entry.first_cluster = new_chain.first().copied().unwrap_or(0) as u16;
        entry.size = bytes.len() as u32;
        let location = node
            .directory_location
            .ok_or_else(|| Error::corrupt("directory entry has no backing location"))?;
        self.write_entry_at(device, location, &entry)?;

        self.flush_fat(device)
    }

    fn read(&self, device: &mut dyn BlockDevice, name: &str) -> Result<Vec<u8>> {
        let raw_name = canonicalize_name(name)?;
        let search = self.find_in_directory(device, self.cwd_cluster(), &raw_name)?;
        let node = search.found.ok_or_else(|| Error::not_found(name))?;

        if node.is_directory() {
            return Err(Error::is_a_directory(name));
        }

        let chain = self.walk_chain(node.first_sector)?;
        let sectors_per_cluster = self.boot()?.sectors_per_cluster as u32;

        let mut data = Vec::with_capacity(node.size as usize);
        for cluster in chain {
            let sector = self.boot()?.cluster_to_sector(cluster)?;
            for i in 0..sectors_per_cluster {
                data.extend_from_slice(&device.read_sector(sector + i)?);
            }
        }

        data.truncate(node.size as usize);
        Ok(data)
    }

    fn remove(&mut self, device: &mut dyn BlockDevice, name: &str) -> Result<()> {
        let raw_name = canonicalize_name(name)?;
        let search = self.find_in_directory(device, self.cwd_cluster(), &raw_name)?;
        let node = search.found.ok_or_else(|| Error::not_found(name))?;

        let chain = self.walk_chain(node.first_sector)?;
        for c in chain {
            self.free_cluster(c)?;
        }

        let (sector, offset) = node
            .directory_location
            .ok_or_else(|| Error::corrupt("directory entry has no backing location"))?;
        let mut data = device.read_sector(sector)?;
        data[offset] = RawDirEntry::AVAILABLE_MARKER;
        device.write_sector(sector, &data)?;

        tracing::debug!(name, "removed directory entry");
        self.flush_fat(device)
    }
}

/// Cheap check of whether a device looks like a FAT12 volume: a readable
/// sector 0 whose boot sector parses and validates.
pub fn probe(device: &mut dyn BlockDevice) -> Result<bool> {
    if device.sector_count() == 0 {
        return Ok(false);
    }
    match device.read_sector(0) {
        Ok(sector0) => Ok(BootSector::from_bytes(&sector0).is_ok()),
        Err(_) => Ok(false),
    }
}

/// Construct a fresh, unmounted FAT12 backend.
pub fn construct() -> Box<dyn VfsBackend> {
    Box::new(Fat12Backend::new())
}

struct Geometry {
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    num_fats: u8,
    root_entries: u16,
    sectors_per_fat: u16,
}

/// Classic DOS floppy geometries, kept exact so formatted images match the
/// well-known on-disk layout bit for bit.
fn known_geometry(total_sectors: u32) -> Option<Geometry> {
    match total_sectors {
        720 => Some(Geometry { sectors_per_cluster: 2, reserved_sectors: 1, num_fats: 2, root_entries: 112, sectors_per_fat: 2 }),
        1440 => Some(Geometry { sectors_per_cluster: 2, reserved_sectors: 1, num_fats: 2, root_entries: 112, sectors_per_fat: 3 }),
        2400 => Some(Geometry { sectors_per_cluster: 1, reserved_sectors: 1, num_fats: 2, root_entries: 224, sectors_per_fat: 7 }),
        2880 => Some(Geometry { sectors_per_cluster: 1, reserved_sectors: 1, num_fats: 2, root_entries: 224, sectors_per_fat: 9 }),
        5760 => Some(Geometry { sectors_per_cluster: 2, reserved_sectors: 1, num_fats: 2, root_entries: 240, sectors_per_fat: 9 }),
        _ => None,
    }
}

fn generic_geometry(total_sectors: u32, sector_size: u32) -> Result<Geometry> {
    let root_entries = 224u32;
    let reserved = 1u32;
    let num_fats = 2u32;
    let root_dir_sectors = (root_entries * DIR_ENTRY_SIZE as u32 + sector_size - 1) / sector_size;

    for cluster_pow in 0..8u32 {
        let spc = 1u32 << cluster_pow;
        for spf in 1u32..=256 {
            let non_data = reserved + num_fats * spf + root_dir_sectors;
            if non_data >= total_sectors {
                continue;
            }
            let data_sectors = total_sectors - non_data;
            let total_clusters = data_sectors / spc;
            if total_clusters == 0 || total_clusters >= 4085 {
                continue;
            }

            let fat_bytes = spf * sector_size;
            let max_representable = (fat_bytes as u64 * 2) / 3;
            if (total_clusters as u64 + 2) <= max_representable {
                return Ok(Geometry {
                    sectors_per_cluster: spc as u8,
                    reserved_sectors: reserved as u16,
                    num_fats: num_fats as u8,
                    root_entries: root_entries as u16,
                    sectors_per_fat: spf as u16,
                });
            }
        }
    }

    Err(Error::unsupported("device geometry does not fit FAT12"))
}

/// Zero every sector on `device`, then write a fresh FAT12 boot sector, two
/// blank FAT copies (with the reserved cluster-0/1 entries set), and a blank
/// root directory region.
pub fn format(device: &mut dyn BlockDevice, volume_label: &str, bootcode: Option<&[u8]>) -> Result<()> {
    let sector_size = device.sector_size();
    validate_sector_size(sector_size)?;
    if sector_size != 512 {
        return Err(Error::unsupported("FAT12 format currently requires a 512-byte sector size"));
    }

    let total_sectors = device.sector_count();
    tracing::debug!(total_sectors, %volume_label, "formatting FAT12 volume");

    let zero = vec![0u8; sector_size as usize];
    for i in 0..total_sectors {
        device.write_sector(i, &zero)?;
    }

    let geometry = known_geometry(total_sectors)
        .map(Ok)
        .unwrap_or_else(|| generic_geometry(total_sectors, sector_size))?;

    let mut label_bytes = [b' '; 11];
    let label_src = volume_label.as_bytes();
    let take = label_src.len().min(11);
    label_bytes[..take].copy_from_slice(&label_src[..take]);

    let boot = BootSector {
        bytes_per_sector: sector_size as u16,
        sectors_per_cluster: geometry.sectors_per_cluster,
        reserved_sectors: geometry.reserved_sectors,
        num_fats: geometry.num_fats,
        root_entries: geometry.root_entries,
        total_sectors,
        media_descriptor: 0xF0,
        sectors_per_fat: geometry.sectors_per_fat,
        volume_label: label_bytes,
    };

    let boot_bytes = boot.to_bytes(bootcode);
    device.write_sector(0, &boot_bytes)?;

    let fat_size = boot.fat_size_bytes()?;
    let mut fat = vec![0u8; fat_size];
    fat[0] = boot.media_descriptor;
    fat[1] = 0xFF;
    fat[2] = 0xFF;

    for copy in 0..boot.num_fats as u32 {
        let mut sector = boot.fat_copy_start_sector(copy);
        let mut offset = 0;
        while offset < fat.len() {
            let mut buf = vec![0u8; sector_size as usize];
            let take = (fat.len() - offset).min(sector_size as usize);
            buf[..take].copy_from_slice(&fat[offset..offset + take]);
            device.write_sector(sector, &buf)?;
            offset += take;
            sector += 1;
        }
    }

    device.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfskit_device::MemoryDevice;

    fn formatted_1_44mb() -> MemoryDevice {
        let mut dev = MemoryDevice::new(512, 2880).unwrap();
        format(&mut dev, "TEST       ", None).unwrap();
        dev
    }

    #[test]
    fn test_format_1_44mb_layout() {
        let dev = formatted_1_44mb();
        let bytes = dev.as_bytes();
        assert_eq!(&bytes[510..512], &[0x55, 0xAA]);
        assert_eq!(&bytes[54..62], b"FAT12   ");
        assert_eq!(&bytes[512..515], &[0xF0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_mount_formatted_image_has_empty_root() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();
        assert_eq!(backend.list_directory(&mut dev).unwrap().len(), 0);
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();

        backend.create_file(&mut dev, "HELLO.TXT", 0).unwrap();
        backend.write(&mut dev, "HELLO.TXT", b"Hello, world!").unwrap();

        let data = backend.read(&mut dev, "HELLO.TXT").unwrap();
        assert_eq!(data, b"Hello, world!");

        let node = backend.get_node(&mut dev, "HELLO.TXT").unwrap();
        assert_eq!(node.sector_count(), 1);
    }

    #[test]
    fn test_two_cluster_boundary_file() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();
        backend.create_file(&mut dev, "BIG.BIN", 0).unwrap();

        let payload = vec![0xAB; 513]; // one cluster (512B) + 1 byte
        backend.write(&mut dev, "BIG.BIN", &payload).unwrap();

        let node = backend.get_node(&mut dev, "BIG.BIN").unwrap();
        assert_eq!(node.sector_count(), 2);

        let data = backend.read(&mut dev, "BIG.BIN").unwrap();
        assert_eq!(data, payload);
    }

    #[test]
    fn test_mkdir_and_list_directory() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();

        let a = backend.create_dir(&mut dev, "A", 0).unwrap();
        backend.set_directory(&mut dev, Some(&a)).unwrap();
        let b = backend.create_dir(&mut dev, "B", 0).unwrap();
        backend.set_directory(&mut dev, Some(&b)).unwrap();
        backend.create_dir(&mut dev, "C", 0).unwrap();

        let entries = backend.list_directory(&mut dev).unwrap();
        let mut names: Vec<_> = entries.iter().map(|n| n.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec![".".to_string(), "..".to_string(), "C".to_string()]);
        assert!(entries.iter().find(|n| n.name == "C").unwrap().is_directory());
    }

    #[test]
    fn test_touch_is_idempotent() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();

        backend.create_file(&mut dev, "A.TXT", 0).unwrap();
        backend.create_file(&mut dev, "A.TXT", 0).unwrap();

        assert_eq!(backend.list_directory(&mut dev).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_frees_clusters_for_reuse() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();

        backend.create_file(&mut dev, "A.TXT", 0).unwrap();
        backend.write(&mut dev, "A.TXT", &vec![1u8; 512]).unwrap();
        let before = backend.get_node(&mut dev, "A.TXT").unwrap();
        let freed_cluster = before.first_sector;

        backend.remove(&mut dev, "A.TXT").unwrap();
        assert!(matches!(backend.get_node(&mut dev, "A.TXT").unwrap().state, NodeState::Available));

        backend.create_file(&mut dev, "B.TXT", 0).unwrap();
        backend.write(&mut dev, "B.TXT", &vec![2u8; 512]).unwrap();
        let after = backend.get_node(&mut dev, "B.TXT").unwrap();
        assert_eq!(after.first_sector, freed_cluster);
    }

    #[test]
    fn test_root_directory_full_returns_no_space() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();

        for i in 0..224 {
            let name = format!("F{i}.TXT");
            backend.create_file(&mut dev, &name, 0).unwrap();
        }

        let err = backend.create_file(&mut dev, "ONEMORE.TXT", 0).unwrap_err();
        assert!(matches!(err, Error::NoSpace(_)));
        assert_eq!(backend.list_directory(&mut dev).unwrap().len(), 224);
    }

    #[test]
    fn test_fat_mirrors_are_identical_after_mutation() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();
        backend.create_file(&mut dev, "A.TXT", 0).unwrap();
        backend.write(&mut dev, "A.TXT", b"some data").unwrap();

        let boot = backend.boot().unwrap();
        let fat_size = boot.fat_size_bytes().unwrap();
        let fat1_start = boot.fat_copy_start_sector(0);
        let fat2_start = boot.fat_copy_start_sector(1);

        let mut fat1 = Vec::new();
        let mut fat2 = Vec::new();
        let mut remaining = fat_size;
        let mut s1 = fat1_start;
        let mut s2 = fat2_start;
        while remaining > 0 {
            let d1 = dev.read_sector(s1).unwrap();
            let d2 = dev.read_sector(s2).unwrap();
            let take = remaining.min(d1.len());
            fat1.extend_from_slice(&d1[..take]);
            fat2.extend_from_slice(&d2[..take]);
            remaining -= take;
            s1 += 1;
            s2 += 1;
        }

        assert_eq!(fat1, fat2);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut dev = formatted_1_44mb();
        let mut backend = Fat12Backend::new();
        backend.mount(&mut dev).unwrap();

        assert!(backend.create_file(&mut dev, "bad name!!.txt", 0).is_err());
        assert_eq!(backend.list_directory(&mut dev).unwrap().len(), 0);
    }

    #[test]
    fn test_probe_rejects_non_fat12_image() {
        let mut dev = MemoryDevice::new(512, 10).unwrap();
        assert!(!probe(&mut dev).unwrap());
    }

    #[test]
    fn test_probe_accepts_formatted_image() {
        let mut dev = formatted_1_44mb();
        assert!(probe(&mut dev).unwrap());
    }
}
