//! # Remote shared memory window (rmem)
//!
//! Some co-processors (modems, most prominently) exchange data with the host through a
//! region of physical memory that the platform carves out in the device tree. This
//! crate provides:
//!
//! - Discovery of that region from the `reserved-memory` device tree node.
//! - Mapping of the region into the process through the raw physical memory device.
//! - Bounds-checked translation of remote physical addresses into host memory.
//! - Software emulation of the region for testing without hardware.
//!
//! ```no_run
//! use rmem::{Config, PhysicalAddress, Window};
//!
//! let mut window = Window::open(&Config::default())?;
//! let base = window.reserve(0x1000)?;
//! let request = window.translate(PhysicalAddress::new(base.as_u64() + 0x100), 0x10)?;
//! println!("{request:02x?}");
//! window.close();
//! # Ok::<(), rmem::Error>(())
//! ```

mod address;
mod config;
pub mod device_tree;
mod error;
mod human_address;
mod human_size;
mod mapping;
mod region;
mod window;

pub use address::PhysicalAddress;
pub use config::{Config, MEM_DEVICE_PATH, NODE_PREFIX, RESERVED_MEMORY_PATH};
pub use device_tree::{DeviceTree, ProcDeviceTree};
pub use error::{DescriptorError, Error, ErrorKind, Result};
pub use human_address::HumanAddress;
pub use human_size::HumanSize;
pub use region::Region;
pub use window::{State, Window};
