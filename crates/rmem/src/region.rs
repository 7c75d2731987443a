//! Contiguous physical memory regions.

use core::fmt;

use crate::{HumanAddress, HumanSize, PhysicalAddress};

/// A non-empty, contiguous range of physical memory `[base, base + size)`.
///
/// The end of the range is guaranteed to be representable, so containment checks
/// against a region never have to deal with the region itself wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    base: PhysicalAddress,
    size: u64,
}

impl Region {
    /// Creates a new region.
    ///
    /// Returns `None` if `size` is zero or if `base + size` does not fit in 64 bits.
    pub const fn new(base: PhysicalAddress, size: u64) -> Option<Self> {
        if size == 0 || base.checked_add(size).is_none() {
            return None;
        }
        Some(Self { base, size })
    }

    /// Returns the base address of this region.
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    /// Returns the size of this region in bytes.
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Returns the end address (exclusive) of this region.
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u64() + self.size)
    }

    /// Returns the byte offset of `address` from the base of this region, provided
    /// `[address, address + length)` lies entirely within it.
    ///
    /// A range whose end overflows is never within the region.
    pub const fn offset_of(&self, address: PhysicalAddress, length: u64) -> Option<u64> {
        let Some(end) = address.checked_add(length) else {
            return None;
        };
        if end.as_u64() > self.end().as_u64() {
            return None;
        }
        address.checked_offset_from(self.base)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) ({})",
            HumanAddress::from(self.base),
            HumanAddress::from(self.end()),
            HumanSize(self.size)
        )
    }
}
