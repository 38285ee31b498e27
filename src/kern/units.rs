//! Tick <-> millisecond conversion
//!
//! All conversions are parameterized on the hardware counter frequency `F`
//! (Hz) so they are independently testable; the public, zero-argument
//! wrappers in [`crate::api`] pull `F` from [`crate::kern::timer::get_timer_frequency`].

use crate::error::{Result, Status};

/// `(ms * F) / 1000 + 1`: a ceiling-ish conversion biased to never return 0
/// for a nonzero `ms`, since a caller requesting "some delay" should never
/// get an already-expired timer back.
pub fn ms_to_tick_u16(ms: u16, freq: u32) -> u16 {
    let ticks = (ms as u64 * freq as u64) / 1000 + 1;
    ticks.min(u16::MAX as u64) as u16
}

/// `ms -> ticks` for the full 32-bit range, rejecting inputs that would
/// overflow a `u32` tick count.
pub fn ms32_to_tick(ms: u32, freq: u32) -> Result<u32> {
    let max_ms = (u32::MAX as u64) * 1000 / freq as u64;
    if ms as u64 > max_ms {
        return Err(Status::InvalidParameter);
    }
    Ok(((ms as u64 * freq as u64) / 1000) as u32)
}

/// `ticks -> ms`, taking the power-of-two shift fast path when `F` allows
/// it and falling back to a 64-bit multiply-divide otherwise.
pub fn tick_to_ms(ticks: u32, freq: u32) -> u32 {
    if freq.is_power_of_two() {
        let shift = freq.trailing_zeros();
        (((ticks as u64) * 1000) >> shift) as u32
    } else {
        ((ticks as u64 * 1000) / freq as u64) as u32
    }
}

/// `ticks -> ms` for the full 64-bit tick range, rejecting inputs whose
/// millisecond value would not fit a `u64`.
pub fn tick64_to_ms(ticks: u64) -> Result<u64> {
    const MAX_TICKS: u64 = u64::MAX / 1000;
    if ticks > MAX_TICKS {
        return Err(Status::InvalidParameter);
    }
    Ok(ticks * 1000)
}
