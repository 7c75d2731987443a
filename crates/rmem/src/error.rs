//! Error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::window::State;
use crate::{PhysicalAddress, Region};

/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced while discovering, mapping or accessing the shared window.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No reserved-memory node matched the configured prefix.
    #[error("no reserved-memory node matching `{prefix}*` under {}", .path.display())]
    NotFound {
        path: PathBuf,
        prefix: String,
        /// Set when the reserved-memory directory itself could not be enumerated.
        #[source]
        source: Option<io::Error>,
    },
    /// The matching node's `reg` property could not be read or decoded.
    #[error("malformed `reg` property of reserved-memory node `{node}`")]
    MalformedDescriptor {
        node: String,
        #[source]
        reason: DescriptorError,
    },
    /// The raw physical memory device could not be opened.
    #[error("failed to open {}", .path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The region could not be mapped into the process.
    #[error("failed to map {region}")]
    MapFailed {
        region: Region,
        #[source]
        source: io::Error,
    },
    /// A reservation asked for more than the window holds.
    #[error(
        "shared memory not large enough for allocation request {requested:#x} vs {available:#x}"
    )]
    CapacityExceeded { requested: u64, available: u64 },
    /// A translation request falls outside the window, or its end overflows.
    #[error("range {address} + {length:#x} is outside of {region}")]
    OutOfRange {
        address: PhysicalAddress,
        length: u64,
        region: Region,
    },
    /// The operation is not legal in the window's current lifecycle state.
    #[error("cannot {operation} a {state} window")]
    InvalidState {
        operation: &'static str,
        state: State,
    },
}

/// Reasons a `reg` property is rejected.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The property could not be read.
    #[error("unreadable: {0}")]
    Unreadable(#[source] io::Error),
    /// The property is neither two 32-bit nor two 64-bit cells.
    #[error("expected 8 or 16 bytes, got {0}")]
    InvalidLength(usize),
    /// The region is empty.
    #[error("region size is zero")]
    ZeroSize,
    /// `address + size` does not fit in 64 bits.
    #[error("region {address:#x} + {size:#x} overflows")]
    Overflow { address: u64, size: u64 },
}

/// Fieldless classification of an [`Error`], for matching without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    MalformedDescriptor,
    DeviceOpenFailed,
    MapFailed,
    CapacityExceeded,
    OutOfRange,
    InvalidState,
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MalformedDescriptor { .. } => ErrorKind::MalformedDescriptor,
            Self::DeviceOpenFailed { .. } => ErrorKind::DeviceOpenFailed,
            Self::MapFailed { .. } => ErrorKind::MapFailed,
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }
}
