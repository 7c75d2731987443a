//! Discovery of the shared region from the platform's device tree.
//!
//! Linux exposes the flattened device tree under `/proc/device-tree`; each child of
//! `reserved-memory` is a directory whose `reg` file holds the raw big-endian cells of
//! the node's `reg` property. The shared region is the first child whose name starts
//! with the configured prefix (`rmtfs` by default).
//!
//! The walk itself is expressed against the [`DeviceTree`] trait so that other tree
//! sources (and tests) can supply nodes in a well-defined enumeration order:
//!
//! ```no_run
//! # use rmem::device_tree::{self, ProcDeviceTree};
//! let tree = ProcDeviceTree::new("/proc/device-tree/reserved-memory");
//! let region = device_tree::discover(&tree, "rmtfs")?;
//! println!("shared memory at {region}");
//! # Ok::<(), rmem::Error>(())
//! ```

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{
    Config, DescriptorError, Error, HumanAddress, HumanSize, PhysicalAddress, Region, Result,
};

/// Name of the property holding a node's address and size.
const REG_PROPERTY: &str = "reg";

/// A source of reserved-memory nodes.
pub trait DeviceTree {
    /// Returns where the nodes are read from, for diagnostics.
    fn location(&self) -> &Path;

    /// Returns the names of all reserved-memory child nodes, in enumeration order.
    ///
    /// Names are raw node names and need not be valid UTF-8.
    fn reserved_memory_nodes(&self) -> io::Result<Vec<OsString>>;

    /// Returns the raw bytes of `property` on `node`.
    fn read_property(&self, node: &OsStr, property: &str) -> io::Result<Vec<u8>>;
}

/// The device tree as exposed by the kernel through procfs.
#[derive(Debug, Clone)]
pub struct ProcDeviceTree {
    root: PathBuf,
}

impl ProcDeviceTree {
    /// Creates a tree rooted at the given reserved-memory directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DeviceTree for ProcDeviceTree {
    fn location(&self) -> &Path {
        &self.root
    }

    fn reserved_memory_nodes(&self) -> io::Result<Vec<OsString>> {
        fs::read_dir(&self.root)?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect()
    }

    fn read_property(&self, node: &OsStr, property: &str) -> io::Result<Vec<u8>> {
        fs::read(self.root.join(node).join(property))
    }
}

/// Finds the shared region described by the first node whose name starts with `prefix`.
///
/// Names are compared byte-wise, so nodes whose names are not valid UTF-8 still take
/// part in the match. Later nodes are never consulted, even when the first match
/// turns out to be malformed.
pub fn discover<T>(tree: &T, prefix: &str) -> Result<Region>
where
    T: DeviceTree + ?Sized,
{
    let not_found = |source: Option<io::Error>| Error::NotFound {
        path: tree.location().to_path_buf(),
        prefix: prefix.to_owned(),
        source,
    };

    let nodes = tree.reserved_memory_nodes().map_err(|err| {
        log::error!(
            "unable to open reserved-memory device tree node {}: {err}",
            tree.location().display()
        );
        not_found(Some(err))
    })?;

    let Some(node) = nodes.into_iter().find(|name| {
        let matches = name.as_encoded_bytes().starts_with(prefix.as_bytes());
        if !matches {
            log::trace!("skipping reserved-memory node {}", name.to_string_lossy());
        }
        matches
    }) else {
        log::error!(
            "no reserved-memory node matching {prefix}* in {}",
            tree.location().display()
        );
        return Err(not_found(None));
    };

    let name = node.to_string_lossy();
    let region = tree
        .read_property(&node, REG_PROPERTY)
        .map_err(DescriptorError::Unreadable)
        .and_then(|reg| parse_reg(&reg))
        .and_then(|(address, size)| region_from_reg(address, size))
        .map_err(|reason| {
            log::error!("failed to read reg of {name}: {reason}");
            Error::MalformedDescriptor {
                node: name.to_string(),
                reason,
            }
        })?;

    log::debug!(
        "found shared memory node {name} at {} ({})",
        HumanAddress::from(region.base()),
        HumanSize(region.size())
    );

    Ok(region)
}

/// Discovers the shared region using the procfs tree and prefix named in `config`.
pub fn discover_with(config: &Config) -> Result<Region> {
    discover(
        &ProcDeviceTree::new(&config.reserved_memory),
        &config.node_prefix,
    )
}

/// Decodes a `reg` property into `(address, size)`.
///
/// The cell width is inferred from the length alone: 8 bytes hold two big-endian
/// 32-bit cells, 16 bytes hold two big-endian 64-bit cells.
pub fn parse_reg(reg: &[u8]) -> core::result::Result<(u64, u64), DescriptorError> {
    if let Some((address, size)) = cell_pair::<4>(reg) {
        return Ok((
            u32::from_be_bytes(address).into(),
            u32::from_be_bytes(size).into(),
        ));
    }

    if let Some((address, size)) = cell_pair::<8>(reg) {
        return Ok((u64::from_be_bytes(address), u64::from_be_bytes(size)));
    }

    Err(DescriptorError::InvalidLength(reg.len()))
}

/// Splits `bytes` into exactly two `N`-byte cells.
fn cell_pair<const N: usize>(bytes: &[u8]) -> Option<([u8; N], [u8; N])> {
    let (first, rest) = bytes.split_first_chunk::<N>()?;
    let second = <[u8; N]>::try_from(rest).ok()?;
    Some((*first, second))
}

fn region_from_reg(address: u64, size: u64) -> core::result::Result<Region, DescriptorError> {
    if size == 0 {
        return Err(DescriptorError::ZeroSize);
    }
    Region::new(PhysicalAddress::new(address), size)
        .ok_or(DescriptorError::Overflow { address, size })
}

#[cfg(test)]
mod tests {
    use std::os::unix::ffi::OsStrExt;

    use super::*;
    use crate::ErrorKind;

    /// In-memory tree with a fixed enumeration order.
    struct TestTree {
        nodes: Vec<(OsString, Option<Vec<u8>>)>,
    }

    impl TestTree {
        fn new<N: AsRef<OsStr>>(nodes: Vec<(N, Option<Vec<u8>>)>) -> Self {
            let nodes = nodes
                .into_iter()
                .map(|(name, reg)| (name.as_ref().to_os_string(), reg))
                .collect();
            Self { nodes }
        }
    }

    impl DeviceTree for TestTree {
        fn location(&self) -> &Path {
            Path::new("/test/reserved-memory")
        }

        fn reserved_memory_nodes(&self) -> io::Result<Vec<OsString>> {
            Ok(self.nodes.iter().map(|(name, _)| name.clone()).collect())
        }

        fn read_property(&self, node: &OsStr, property: &str) -> io::Result<Vec<u8>> {
            assert_eq!(property, "reg");
            self.nodes
                .iter()
                .find(|(name, _)| name == node)
                .and_then(|(_, reg)| reg.clone())
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn reg32(address: u32, size: u32) -> Vec<u8> {
        [address.to_be_bytes(), size.to_be_bytes()].concat()
    }

    fn reg64(address: u64, size: u64) -> Vec<u8> {
        [address.to_be_bytes(), size.to_be_bytes()].concat()
    }

    #[test]
    fn parses_32_bit_cells() {
        let reg = [0x9F, 0xC0, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00];
        assert_eq!(parse_reg(&reg).unwrap(), (0x9FC0_0000, 0x20_0000));
    }

    #[test]
    fn parses_64_bit_cells() {
        let reg = reg64(0x1_9FC0_0000, 0x20_0000);
        assert_eq!(reg.len(), 16);
        assert_eq!(parse_reg(&reg).unwrap(), (0x1_9FC0_0000, 0x20_0000));
    }

    #[test]
    fn rejects_other_lengths() {
        for len in [0, 4, 5, 12, 24] {
            let reg = vec![0xAB; len];
            assert!(
                matches!(parse_reg(&reg), Err(DescriptorError::InvalidLength(n)) if n == len),
                "length {len} accepted"
            );
        }
    }

    #[test]
    fn discovers_matching_node() {
        let tree = TestTree::new(vec![
            ("hyp@85800000", Some(reg32(0x8580_0000, 0x60_0000))),
            ("rmtfs-region", Some(reg32(0x9FC0_0000, 0x20_0000))),
        ]);

        let region = discover(&tree, "rmtfs").unwrap();
        assert_eq!(region.base(), PhysicalAddress::new(0x9FC0_0000));
        assert_eq!(region.size(), 0x20_0000);
    }

    #[test]
    fn no_matching_node_is_not_found() {
        let tree = TestTree::new(vec![("hyp@85800000", Some(reg32(0x8580_0000, 0x60_0000)))]);
        let err = discover(&tree, "rmtfs").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn empty_tree_is_not_found() {
        let tree = TestTree::new(Vec::<(&str, _)>::new());
        assert_eq!(discover(&tree, "rmtfs").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn first_match_wins() {
        let tree = TestTree::new(vec![
            ("rmtfs@9fc00000", Some(reg32(0x9FC0_0000, 0x20_0000))),
            ("rmtfs@f0000000", Some(reg32(0xF000_0000, 0x10_0000))),
        ]);

        let region = discover(&tree, "rmtfs").unwrap();
        assert_eq!(region.base(), PhysicalAddress::new(0x9FC0_0000));
        assert_eq!(region.size(), 0x20_0000);
    }

    #[test]
    fn non_utf8_first_match_wins() {
        let tree = TestTree::new(vec![
            (OsStr::from_bytes(b"rmtfs\xff"), Some(reg32(0x9FC0_0000, 0x20_0000))),
            (OsStr::new("rmtfs@f0000000"), Some(reg32(0xF000_0000, 0x10_0000))),
        ]);

        let region = discover(&tree, "rmtfs").unwrap();
        assert_eq!(region.base(), PhysicalAddress::new(0x9FC0_0000));
    }

    #[test]
    fn non_utf8_node_is_reported_lossily() {
        let tree = TestTree::new(vec![(OsStr::from_bytes(b"rmtfs\xff"), Some(vec![0; 4]))]);

        let err = discover(&tree, "rmtfs").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDescriptor { ref node, reason: DescriptorError::InvalidLength(4) }
                if node == "rmtfs\u{FFFD}"
        ));
    }

    #[test]
    fn non_utf8_prefix_mismatch_is_skipped() {
        let tree = TestTree::new(vec![
            (OsStr::from_bytes(b"rmt\xff"), Some(reg32(0x8580_0000, 0x60_0000))),
            (OsStr::new("rmtfs"), Some(reg32(0x9FC0_0000, 0x20_0000))),
        ]);

        let region = discover(&tree, "rmtfs").unwrap();
        assert_eq!(region.base(), PhysicalAddress::new(0x9FC0_0000));
    }

    #[test]
    fn malformed_first_match_does_not_fall_through() {
        let tree = TestTree::new(vec![
            ("rmtfs@9fc00000", Some(vec![0; 12])),
            ("rmtfs@f0000000", Some(reg32(0xF000_0000, 0x10_0000))),
        ]);

        let err = discover(&tree, "rmtfs").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDescriptor { ref node, reason: DescriptorError::InvalidLength(12) }
                if node == "rmtfs@9fc00000"
        ));
    }

    #[test]
    fn unreadable_reg_is_malformed() {
        let tree = TestTree::new(vec![("rmtfs", None)]);
        let err = discover(&tree, "rmtfs").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDescriptor { reason: DescriptorError::Unreadable(_), .. }
        ));
    }

    #[test]
    fn zero_size_is_malformed() {
        let tree = TestTree::new(vec![("rmtfs", Some(reg32(0x9FC0_0000, 0)))]);
        let err = discover(&tree, "rmtfs").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDescriptor { reason: DescriptorError::ZeroSize, .. }
        ));
    }

    #[test]
    fn overflowing_region_is_malformed() {
        let tree = TestTree::new(vec![("rmtfs", Some(reg64(u64::MAX - 0xF, 0x20)))]);
        let err = discover(&tree, "rmtfs").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedDescriptor { reason: DescriptorError::Overflow { .. }, .. }
        ));
    }

    mod procfs {
        use super::*;

        fn write_node(root: &Path, name: impl AsRef<Path>, reg: &[u8]) {
            let node = root.join(name);
            fs::create_dir(&node).unwrap();
            fs::write(node.join("reg"), reg).unwrap();
        }

        #[test]
        fn discovers_from_directory() {
            let dir = tempfile::tempdir().unwrap();
            write_node(dir.path(), "hyp@85800000", &reg32(0x8580_0000, 0x60_0000));
            write_node(dir.path(), "rmtfs@9fc00000", &reg32(0x9FC0_0000, 0x20_0000));
            fs::write(dir.path().join("ranges"), b"").unwrap();

            let config = Config::default().with_reserved_memory(dir.path());
            let region = discover_with(&config).unwrap();
            assert_eq!(region.base(), PhysicalAddress::new(0x9FC0_0000));
            assert_eq!(region.size(), 0x20_0000);
        }

        #[test]
        fn discovers_64_bit_node() {
            let dir = tempfile::tempdir().unwrap();
            write_node(dir.path(), "rmtfs@89b00000", &reg64(0x8_9B00_0000, 0x18_0000));

            let region = discover(&ProcDeviceTree::new(dir.path()), "rmtfs").unwrap();
            assert_eq!(region.base(), PhysicalAddress::new(0x8_9B00_0000));
            assert_eq!(region.size(), 0x18_0000);
        }

        #[test]
        fn missing_directory_is_not_found() {
            let dir = tempfile::tempdir().unwrap();
            let tree = ProcDeviceTree::new(dir.path().join("reserved-memory"));

            let err = discover(&tree, "rmtfs").unwrap_err();
            assert!(matches!(err, Error::NotFound { source: Some(_), .. }));
        }

        #[test]
        fn node_without_reg_is_malformed() {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("rmtfs")).unwrap();

            let err = discover(&ProcDeviceTree::new(dir.path()), "rmtfs").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedDescriptor);
        }

        #[test]
        fn discovers_non_utf8_node() {
            let dir = tempfile::tempdir().unwrap();
            let name = OsStr::from_bytes(b"rmtfs\xff");
            write_node(dir.path(), name, &reg32(0x9FC0_0000, 0x20_0000));

            let region = discover(&ProcDeviceTree::new(dir.path()), "rmtfs").unwrap();
            assert_eq!(region.base(), PhysicalAddress::new(0x9FC0_0000));
        }

        #[test]
        fn non_utf8_node_takes_part_in_first_match() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            write_node(root, OsStr::from_bytes(b"rmtfs\xff"), &reg32(0x9FC0_0000, 0x20_0000));
            write_node(root, "rmtfs-z", &reg32(0xF000_0000, 0x10_0000));

            // The expected winner is whichever node the directory lists first.
            let first = fs::read_dir(root)
                .unwrap()
                .map(|entry| entry.unwrap().file_name())
                .next()
                .unwrap();
            let expected = fs::read(root.join(&first).join("reg")).unwrap();
            let (address, size) = parse_reg(&expected).unwrap();

            let region = discover(&ProcDeviceTree::new(root), "rmtfs").unwrap();
            assert_eq!(region.base(), PhysicalAddress::new(address));
            assert_eq!(region.size(), size);
        }

        #[test]
        fn prefix_is_configurable() {
            let dir = tempfile::tempdir().unwrap();
            write_node(dir.path(), "rmtfs@9fc00000", &reg32(0x9FC0_0000, 0x20_0000));
            write_node(dir.path(), "modem@86000000", &reg32(0x8600_0000, 0x10_0000));

            let config = Config::default()
                .with_reserved_memory(dir.path())
                .with_node_prefix("modem");
            let region = discover_with(&config).unwrap();
            assert_eq!(region.base(), PhysicalAddress::new(0x8600_0000));
        }
    }
}
