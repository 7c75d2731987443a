//! Physical address type.
//!
//! Addresses handed to us by the remote processor are physical and are always carried
//! as 64-bit values, independent of the host's pointer width. All arithmetic that can
//! be driven by remote input is checked.

use core::fmt;

/// A physical memory address.
///
/// This is a newtype wrapper around a 64-bit physical address as seen by the remote
/// processor. It never refers to host memory directly; use a [`Window`](crate::Window)
/// to translate it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    /// Creates a new physical address.
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw address value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Adds `offset` bytes to the address, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Returns the distance in bytes from `base` to this address, or `None` if this
    /// address lies below `base`.
    #[inline]
    pub const fn checked_offset_from(self, base: PhysicalAddress) -> Option<u64> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalAddress({:#x})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_and_as_u64() {
        let addr = PhysicalAddress::new(0x9FC0_0000);
        assert_eq!(addr.as_u64(), 0x9FC0_0000);
    }

    #[test]
    fn checked_add_in_range() {
        let addr = PhysicalAddress::new(0x1000);
        assert_eq!(addr.checked_add(0x10), Some(PhysicalAddress::new(0x1010)));
    }

    #[test]
    fn checked_add_overflows() {
        let addr = PhysicalAddress::new(u64::MAX - 1);
        assert_eq!(addr.checked_add(10), None);
        assert_eq!(addr.checked_add(1), Some(PhysicalAddress::new(u64::MAX)));
    }

    #[test]
    fn checked_offset_from() {
        let base = PhysicalAddress::new(0x1000);
        assert_eq!(PhysicalAddress::new(0x1100).checked_offset_from(base), Some(0x100));
        assert_eq!(PhysicalAddress::new(0x0FFF).checked_offset_from(base), None);
    }

    #[test]
    fn formatting() {
        let addr = PhysicalAddress::new(0x100);
        assert_eq!(format!("{addr:?}"), "PhysicalAddress(0x100)");
        assert_eq!(format!("{addr}"), "0x100");
    }
}
