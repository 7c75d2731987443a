//! Heap-backed stand-in for physical memory.

use std::io;
use std::ptr::NonNull;
use std::slice;

use crate::{Error, Region, Result};

/// Emulated memory for a single region.
///
/// Provides zeroed memory with the same size as the region so translation can be
/// exercised without access to the physical memory device. Like a device mapping,
/// the memory is held as a raw allocation so that pointers handed out by
/// [`EmulatedMemory::base`] stay valid for writes.
pub(crate) struct EmulatedMemory {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: The allocation is exclusively owned and only reachable through `&self`/`&mut self`.
unsafe impl Send for EmulatedMemory {}

impl EmulatedMemory {
    pub fn new(region: Region) -> Result<Self> {
        let len = usize::try_from(region.size()).map_err(|_| Error::MapFailed {
            region,
            source: io::Error::new(
                io::ErrorKind::InvalidInput,
                "region size exceeds the host address space",
            ),
        })?;

        log::trace!("emulating {region}");
        let memory = Box::into_raw(vec![0u8; len].into_boxed_slice());
        // SAFETY: `Box::into_raw` never returns null.
        let base = unsafe { NonNull::new_unchecked(memory.cast::<u8>()) };
        Ok(Self { base, len })
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `base..base + len` is the live allocation created in `new`.
        unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: As above; `&mut self` guarantees no other host reference exists.
        unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl Drop for EmulatedMemory {
    fn drop(&mut self) {
        let memory = NonNull::slice_from_raw_parts(self.base, self.len);
        // SAFETY: `memory` is exactly the boxed slice leaked in `new`, released once.
        drop(unsafe { Box::from_raw(memory.as_ptr()) });
    }
}
