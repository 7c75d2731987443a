//! Backing memory for a window.
//!
//! In production the window is a shared mapping of the raw physical memory device.
//! Tests (and downstream crates enabling `software-emulation`) can instead back it
//! with a plain heap buffer, so protocol code can run without privileges or hardware.

mod device;
#[cfg(any(test, feature = "software-emulation"))]
mod emulated;

use std::path::Path;
use std::ptr::NonNull;

use crate::{Region, Result};

use device::DeviceMapping;
#[cfg(any(test, feature = "software-emulation"))]
use emulated::EmulatedMemory;

/// Memory backing exactly one region.
pub(crate) enum Mapping {
    /// Shared mapping of the physical memory device.
    Device(DeviceMapping),
    /// Heap buffer standing in for physical memory.
    #[cfg(any(test, feature = "software-emulation"))]
    Emulated(EmulatedMemory),
}

impl Mapping {
    /// Maps `region` through the device at `path`.
    pub fn device(path: &Path, region: Region) -> Result<Self> {
        DeviceMapping::map(path, region).map(Self::Device)
    }

    /// Creates zeroed emulated memory the size of `region`.
    #[cfg(any(test, feature = "software-emulation"))]
    pub fn emulated(region: Region) -> Result<Self> {
        EmulatedMemory::new(region).map(Self::Emulated)
    }

    /// Returns the host address of the first byte of the region.
    pub fn base(&self) -> NonNull<u8> {
        match self {
            Self::Device(mapping) => mapping.base(),
            #[cfg(any(test, feature = "software-emulation"))]
            Self::Emulated(memory) => memory.base(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Device(mapping) => mapping.as_slice(),
            #[cfg(any(test, feature = "software-emulation"))]
            Self::Emulated(memory) => memory.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Device(mapping) => mapping.as_mut_slice(),
            #[cfg(any(test, feature = "software-emulation"))]
            Self::Emulated(memory) => memory.as_mut_slice(),
        }
    }
}
