//! Critical section primitive
//!
//! Single-core, cooperative-foreground-plus-one-ISR execution model: there
//! is never a second core to spin against, so the right primitive here is
//! not a mutex (which would deadlock a foreground holder against its own
//! ISR) but a nestable interrupt mask. Entry disables both hardware
//! interrupt sources the first time nesting depth goes 0 -> 1; exit
//! re-enables them once depth returns to 0 - entry saves and exit restores
//! the prior interrupt-enable state, and since the only thing ever disabling
//! interrupts is this primitive itself, the prior state at depth 0 is always
//! enabled.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::hal::{Hal, HalEvent};

static DEPTH: AtomicU32 = AtomicU32::new(0);

/// RAII guard for a critical section. Disables interrupts for its
/// lifetime (on the outermost nesting level) and restores them on drop.
pub struct CriticalGuard<'a> {
    hal: &'a mut dyn Hal,
}

impl<'a> CriticalGuard<'a> {
    /// Enter a (possibly nested) critical section, disabling both
    /// interrupt sources on first entry.
    pub fn enter(hal: &'a mut dyn Hal) -> Self {
        if DEPTH.fetch_add(1, Ordering::AcqRel) == 0 {
            hal.disable_int(HalEvent::Overflow);
            hal.disable_int(HalEvent::Compare);
        }
        Self { hal }
    }

    /// Borrow the HAL while the section is held.
    pub fn hal(&mut self) -> &mut dyn Hal {
        self.hal
    }
}

impl<'a> Drop for CriticalGuard<'a> {
    fn drop(&mut self) {
        if DEPTH.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.hal.enable_int(HalEvent::Overflow);
            self.hal.enable_int(HalEvent::Compare);
        }
    }
}

/// Run `f` with both interrupt sources disabled, nestably.
pub fn with_critical_section<R>(hal: &mut dyn Hal, f: impl FnOnce(&mut dyn Hal) -> R) -> R {
    let mut guard = CriticalGuard::enter(hal);
    f(guard.hal())
}

/// Current nesting depth, for tests and assertions.
pub fn depth() -> u32 {
    DEPTH.load(Ordering::Acquire)
}

/// A value only ever touched from inside a critical section.
///
/// Unlike a spinlock, acquiring access never blocks or contends: on a
/// single core, disabling interrupts before touching the cell is already
/// sufficient exclusion against the ISR, and the foreground never runs
/// concurrently with itself. `T: Send` is still required since the value
/// may be written by the foreground and read back by the ISR (or vice
/// versa) on different calls.
pub struct CsCell<T> {
    inner: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for CsCell<T> {}

impl<T> CsCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: UnsafeCell::new(value),
        }
    }

    /// Access the protected value with interrupts disabled for the
    /// duration of `f`.
    pub fn with<R>(&self, hal: &mut dyn Hal, f: impl FnOnce(&mut T) -> R) -> R {
        let _guard = CriticalGuard::enter(hal);
        let value = unsafe { &mut *self.inner.get() };
        f(value)
    }

    /// Test-only: overwrite the protected value outside a critical section.
    /// Sound only because test execution that touches process-wide cells is
    /// serialized by a test-local lock, so there is never a concurrent ISR
    /// or foreground access while this runs.
    #[cfg(test)]
    pub(crate) fn replace(&self, value: T) {
        unsafe {
            *self.inner.get() = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::MockHal;

    #[test]
    fn nested_sections_only_toggle_interrupts_at_outer_boundary() {
        let hal = MockHal::new(32_768);
        hal.enable_int(HalEvent::Overflow);
        hal.enable_int(HalEvent::Compare);
        let mut hal = hal;

        with_critical_section(&mut hal, |h| {
            assert_eq!(depth(), 1);
            with_critical_section(h, |_| {
                assert_eq!(depth(), 2);
            });
            assert_eq!(depth(), 1);
        });

        assert_eq!(depth(), 0);
        assert!(hal.overflow_enabled.get());
        assert!(hal.compare_enabled.get());
    }

    #[test]
    fn guard_disables_on_entry_and_restores_on_drop() {
        let mut hal = MockHal::new(32_768);
        hal.enable_int(HalEvent::Overflow);
        hal.enable_int(HalEvent::Compare);

        {
            let _guard = CriticalGuard::enter(&mut hal);
        }

        assert!(hal.overflow_enabled.get());
        assert!(hal.compare_enabled.get());
        assert_eq!(depth(), 0);
    }

    #[test]
    fn cs_cell_serializes_foreground_and_irq_style_access() {
        let mut hal = MockHal::new(32_768);
        let cell = CsCell::new(0u32);

        cell.with(&mut hal, |v| *v += 1);
        cell.with(&mut hal, |v| *v += 1);

        let result = cell.with(&mut hal, |v| *v);
        assert_eq!(result, 2);
    }
}
