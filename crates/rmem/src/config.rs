//! Platform locations used to find and map the shared window.

use std::path::PathBuf;

/// Directory listing the platform's reserved-memory nodes.
pub const RESERVED_MEMORY_PATH: &str = "/proc/device-tree/reserved-memory";

/// Name prefix of the reserved-memory node shared with the remote processor.
pub const NODE_PREFIX: &str = "rmtfs";

/// Raw physical memory device.
pub const MEM_DEVICE_PATH: &str = "/dev/mem";

/// Where to look for the reserved region and which device to map it through.
///
/// The defaults describe a stock Linux system; tests and unusual platforms override
/// individual fields with the `with_*` setters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory whose children are the reserved-memory nodes.
    pub reserved_memory: PathBuf,
    /// The first node whose name starts with this prefix is used.
    pub node_prefix: String,
    /// Device whose file offsets are physical addresses.
    pub device: PathBuf,
}

impl Config {
    pub fn with_reserved_memory(mut self, path: impl Into<PathBuf>) -> Self {
        self.reserved_memory = path.into();
        self
    }

    pub fn with_node_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.node_prefix = prefix.into();
        self
    }

    pub fn with_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.device = path.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reserved_memory: PathBuf::from(RESERVED_MEMORY_PATH),
            node_prefix: NODE_PREFIX.to_owned(),
            device: PathBuf::from(MEM_DEVICE_PATH),
        }
    }
}
