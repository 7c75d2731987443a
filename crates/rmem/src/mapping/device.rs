//! Shared mapping of the raw physical memory device.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::slice;

use crate::{Error, HumanAddress, HumanSize, Region, Result};

/// A `MAP_SHARED` mapping of one region of a memory device.
///
/// Owns both the open device and the mapping; dropping it unmaps the region and then
/// closes the device.
pub(crate) struct DeviceMapping {
    base: NonNull<u8>,
    len: usize,
    // Unmapped before this is dropped.
    _device: File,
}

// SAFETY: The mapping is exclusively owned and only reachable through `&self`/`&mut self`.
unsafe impl Send for DeviceMapping {}

impl DeviceMapping {
    /// Opens `path` with synchronous read/write access and maps `region` from it.
    ///
    /// The file offset of the mapping is the region's physical base address.
    pub fn map(path: &Path, region: Region) -> Result<Self> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| {
                log::error!("failed to open {}: {source}", path.display());
                Error::DeviceOpenFailed {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        let map_failed = |source: io::Error| {
            log::error!("failed to mmap {region}: {source}");
            Error::MapFailed { region, source }
        };

        let len = usize::try_from(region.size()).map_err(|_| {
            map_failed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "region size exceeds the host address space",
            ))
        })?;
        let offset = libc::off_t::try_from(region.base().as_u64()).map_err(|_| {
            map_failed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "region base is not a valid file offset",
            ))
        })?;

        // SAFETY: A fresh mapping is requested (no fixed address), so no existing memory
        // of this process is replaced. `len` is non-zero because regions are never empty.
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                device.as_raw_fd(),
                offset,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(map_failed(io::Error::last_os_error()));
        }
        let base = NonNull::new(base.cast::<u8>()).ok_or_else(|| {
            map_failed(io::Error::other("mmap returned a null mapping"))
        })?;

        log::debug!(
            "mapped {} at {} to {base:p}",
            HumanSize(region.size()),
            HumanAddress::from(region.base())
        );

        Ok(Self {
            base,
            len,
            _device: device,
        })
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: `base..base + len` stays mapped read/write until `self` is dropped.
        unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: As above; `&mut self` guarantees no other host reference exists.
        unsafe { slice::from_raw_parts_mut(self.base.as_ptr(), self.len) }
    }
}

impl Drop for DeviceMapping {
    fn drop(&mut self) {
        // SAFETY: `base` and `len` describe exactly the mapping created in `map`, and
        // no borrows of it can outlive `self`.
        let ret = unsafe { libc::munmap(self.base.as_ptr().cast(), self.len) };
        if ret != 0 {
            log::error!("failed to munmap: {}", io::Error::last_os_error());
        }
    }
}
