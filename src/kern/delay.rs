//! Busy-wait delay primitive built on the scheduler itself
//!
//! `delay_millisecond` is not a separate hardware facility - it just
//! registers an ordinary one-shot timer whose callback clears a flag, then
//! spins until that flag clears. Useful for short blocking waits in
//! foreground code without needing a second timer mechanism.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::kern::timer::{self, TimerHandle};
use crate::kern::units::ms_to_tick_u16;

fn clear_flag(data: *mut ()) {
    let flag = unsafe { &*(data as *const AtomicBool) };
    flag.store(false, Ordering::SeqCst);
}

/// Busy-wait for approximately `ms` milliseconds.
pub fn delay_millisecond(ms: u16) {
    let busy = AtomicBool::new(true);
    let freq = timer::get_timer_frequency();
    let ticks = ms_to_tick_u16(ms, freq);

    let mut handle = TimerHandle::new();
    let _ = timer::start_timer(
        &mut handle,
        ticks as u32,
        clear_flag,
        &busy as *const AtomicBool as *mut (),
        0,
        0,
    );

    while busy.load(Ordering::SeqCst) {
        core::hint::spin_loop();
    }
}
