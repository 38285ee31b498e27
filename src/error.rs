//! Status codes returned at the public API boundary
//!
//! Based loosely on the Mach kernel's `kern_return_t` convention (a flat
//! `#[repr(i32)]` enum of outcomes), adapted to `Result` instead of a bare
//! integer so the compiler enforces that callers check it.

/// Outcome of a public API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    /// A mandatory out-parameter or handle was absent.
    NullPointer = -1,
    /// A domain violation: invalid date, out-of-range timestamp, ms value
    /// that would overflow the tick conversion.
    InvalidParameter = -2,
    /// Starting a periodic timer that is already running, or removing a
    /// handle that is not in the list.
    InvalidState = -3,
    /// Starting a one-shot timer that is already running, or querying
    /// remaining time on an unregistered handle.
    NotReady = -4,
    /// No timer matched the filter in `get_remaining_time_of_first_timer`.
    Empty = -5,
}

/// Result type used throughout the scheduler.
pub type Result<T> = core::result::Result<T, Status>;
