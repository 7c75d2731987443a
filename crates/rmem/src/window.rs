//! The shared memory window.
//!
//! A [`Window`] is the single region of physical memory shared with the remote
//! processor, mapped into this process. It hands out the region as one opaque block
//! and translates remote-supplied physical addresses into bounds-checked slices.
//!
//! # Lifecycle
//!
//! Discovery produces a [`Region`], mapping that region produces an open [`Window`],
//! and [`Window::close`] tears it down. Once closed, every access fails with
//! [`Error::InvalidState`] instead of touching memory; closing again is a no-op.
//!
//! # Concurrency
//!
//! A window performs no locking of its own. It can be moved to another thread, but
//! callers sharing it between threads must wrap it in a mutex.

use core::fmt;
use core::ops::Range;
use std::path::Path;
use std::ptr::NonNull;

use crate::mapping::Mapping;
use crate::{Config, Error, HumanSize, PhysicalAddress, Region, Result, device_tree};

/// Lifecycle state of a [`Window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// The region is mapped and accessible.
    Mapped,
    /// The region has been unmapped and the device closed.
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapped => f.write_str("mapped"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// The mapped region shared with the remote processor.
pub struct Window {
    region: Region,
    /// `None` once closed.
    mapping: Option<Mapping>,
}

impl Window {
    /// Discovers the shared region and maps it, as described by `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let region = device_tree::discover_with(config)?;
        Self::map(region, &config.device)
    }

    /// Maps a discovered region through the raw memory device at `device`.
    ///
    /// On failure nothing stays open or mapped.
    pub fn map(region: Region, device: impl AsRef<Path>) -> Result<Self> {
        let mapping = Mapping::device(device.as_ref(), region)?;
        Ok(Self::with_mapping(region, mapping))
    }

    /// Creates a window over zeroed heap memory instead of the physical device.
    #[cfg(any(test, feature = "software-emulation"))]
    pub fn emulated(region: Region) -> Result<Self> {
        let mapping = Mapping::emulated(region)?;
        Ok(Self::with_mapping(region, mapping))
    }

    fn with_mapping(region: Region, mapping: Mapping) -> Self {
        log::debug!("shared memory window {region} open");
        Self {
            region,
            mapping: Some(mapping),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn base_address(&self) -> PhysicalAddress {
        self.region.base()
    }

    pub fn size(&self) -> u64 {
        self.region.size()
    }

    pub fn state(&self) -> State {
        if self.mapping.is_some() {
            State::Mapped
        } else {
            State::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == State::Mapped
    }

    /// Returns the host address corresponding to [`Window::base_address`], or `None`
    /// once the window is closed.
    pub fn mapped_base(&self) -> Option<NonNull<u8>> {
        self.mapping.as_ref().map(Mapping::base)
    }

    /// Reserves `requested` bytes of the window.
    ///
    /// There is no sub-allocation: every successful reservation returns the base
    /// address of the whole window.
    pub fn reserve(&self, requested: u64) -> Result<PhysicalAddress> {
        self.mapping("reserve from")?;

        if requested > self.region.size() {
            log::error!(
                "shared memory not large enough for allocation request {} vs {}",
                HumanSize(requested),
                HumanSize(self.region.size())
            );
            return Err(Error::CapacityExceeded {
                requested,
                available: self.region.size(),
            });
        }

        Ok(self.region.base())
    }

    /// Releases a reservation.
    ///
    /// This is a no-op: the window is never subdivided, only torn down as a whole by
    /// [`Window::close`].
    pub fn release(&self) {}

    /// Returns the `length` bytes of the window starting at physical address `address`.
    ///
    /// Fails with [`Error::OutOfRange`] unless the whole range lies within the window.
    ///
    /// The remote processor keeps writing to shared memory while the slice is
    /// borrowed, so its bytes may change between two reads of the same index. Code
    /// that validates a message (a length field, then the payload it describes)
    /// must copy the bytes out first, or read them through [`Window::translate_ptr`]
    /// with [`read_volatile`](core::ptr::read_volatile), and validate only the copy.
    /// Prefer `translate_ptr` whenever the peer may be writing concurrently.
    pub fn translate(&self, address: PhysicalAddress, length: u64) -> Result<&[u8]> {
        let mapping = self.mapping("translate through")?;
        let range = checked_range(self.region, address, length)?;
        Ok(&mapping.as_slice()[range])
    }

    /// Mutable variant of [`Window::translate`].
    ///
    /// The same caveat applies: `&mut` excludes other host references, not the peer.
    pub fn translate_mut(&mut self, address: PhysicalAddress, length: u64) -> Result<&mut [u8]> {
        let region = self.region;
        let mapping = self
            .mapping
            .as_mut()
            .ok_or(closed("translate through"))?;
        let range = checked_range(region, address, length)?;
        Ok(&mut mapping.as_mut_slice()[range])
    }

    /// Returns a pointer to `address` after checking `[address, address + length)`
    /// against the window, for handing to code that works on raw pointers.
    ///
    /// The pointer is only valid while the window stays open. Accesses through it
    /// should be volatile (`read_volatile`/`write_volatile`), since the memory is
    /// shared with a processor the compiler knows nothing about.
    pub fn translate_ptr(&self, address: PhysicalAddress, length: u64) -> Result<NonNull<u8>> {
        let mapping = self.mapping("translate through")?;
        let range = checked_range(self.region, address, length)?;
        // SAFETY: `range.start <= mapping length`, so the result stays within (or one
        // past the end of) the mapping.
        Ok(unsafe { mapping.base().add(range.start) })
    }

    /// Unmaps the window and closes the device.
    ///
    /// Calling this on a closed window does nothing.
    pub fn close(&mut self) {
        match self.mapping.take() {
            Some(mapping) => {
                drop(mapping);
                log::debug!("shared memory window {} closed", self.region);
            }
            None => log::trace!("shared memory window {} already closed", self.region),
        }
    }

    fn mapping(&self, operation: &'static str) -> Result<&Mapping> {
        self.mapping.as_ref().ok_or(closed(operation))
    }
}

fn closed(operation: &'static str) -> Error {
    Error::InvalidState {
        operation,
        state: State::Closed,
    }
}

/// Converts a physical range into a byte range of the mapping of `region`.
fn checked_range(region: Region, address: PhysicalAddress, length: u64) -> Result<Range<usize>> {
    let Some(offset) = region.offset_of(address, length) else {
        log::warn!("rejecting access to {address} + {length:#x} outside of {region}");
        return Err(Error::OutOfRange {
            address,
            length,
            region,
        });
    };

    // Both fit: `offset + length <= size`, and the mapping holds `size` bytes.
    let start = offset as usize;
    Ok(start..start + length as usize)
}

impl Drop for Window {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("region", &self.region)
            .field("state", &self.state())
            .field("mapped_base", &self.mapped_base())
            .finish()
    }
}
