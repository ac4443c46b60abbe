//! Error types for capacity and allocation failures.

use core::fmt;

/// The error returned when the vector cannot grow its storage.
///
/// A failed growth leaves the vector fully usable at its prior capacity;
/// only the operation that triggered the growth fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryReserveError {
    /// The required capacity in bytes exceeds `isize::MAX`.
    CapacityOverflow,
    /// The allocator could not produce or extend the buffer.
    AllocError,
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow => f.write_str("requested capacity exceeds isize::MAX bytes"),
            Self::AllocError => f.write_str("memory allocation failed"),
        }
    }
}

impl std::error::Error for TryReserveError {}
