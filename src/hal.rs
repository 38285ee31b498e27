//! Hardware abstraction layer contract
//!
//! The scheduler never touches hardware registers directly; it only ever
//! calls through this trait. The implementor supplies a free-running N-bit
//! counter with a single compare register and two interrupt sources
//! (overflow, compare-match), and routes both ISRs into
//! [`crate::kern::timer::process_timer_irq`].

use bitflags::bitflags;

/// A single hardware interrupt source this crate can enable/disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalEvent {
    /// The free-running counter wrapped from its maximum value to zero.
    Overflow,
    /// The counter reached the programmed compare value.
    Compare,
}

bitflags! {
    /// Bitmask of pending hardware events, as delivered to
    /// `process_timer_irq`. Unlike [`HalEvent`] (used for the enable/disable
    /// knobs, where exactly one source is named at a time) both bits may be
    /// set simultaneously when the ISR runs, so the IRQ entry point takes a
    /// mask rather than a single event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IrqFlags: u8 {
        /// Overflow interrupt is pending.
        const OVERFLOW = 0b01;
        /// Compare-match interrupt is pending.
        const COMPARE = 0b10;
    }
}

/// Hardware counter/compare contract the scheduler is built on.
///
/// Implementations own one free-running, N-bit, wrapping hardware counter
/// and its single compare register. `init_timer` must be idempotent and
/// leave the counter free-running from 0.
pub trait Hal {
    /// Idempotent hardware init; leaves the counter free-running from 0.
    fn init_timer(&mut self);

    /// Current value of the N-bit counter, zero-extended into a `u32`.
    fn get_counter(&self) -> u32;

    /// Effective tick rate of the counter, in Hz.
    fn get_timer_frequency(&self) -> u32;

    /// Program the next compare-match target (implicitly mod 2^N).
    fn set_compare(&mut self, value: u32);

    /// Enable the given interrupt source.
    fn enable_int(&mut self, event: HalEvent);

    /// Disable the given interrupt source.
    fn disable_int(&mut self, event: HalEvent);

    /// Test-only: simulate the free-running counter advancing by `ticks`,
    /// independent of interrupt delivery. Callers still drive overflow and
    /// compare-match explicitly through `process_timer_irq`.
    #[cfg(test)]
    fn advance_counter(&self, ticks: u32);
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use core::cell::Cell;

    /// A host-testable stand-in for real hardware: a counter the test
    /// drives by hand, plus bookkeeping of which interrupts are armed so
    /// scheduler tests can assert on enable/disable calls.
    pub struct MockHal {
        pub counter: Cell<u32>,
        pub frequency: u32,
        pub compare: Cell<u32>,
        pub overflow_enabled: Cell<bool>,
        pub compare_enabled: Cell<bool>,
    }

    impl MockHal {
        pub fn new(frequency: u32) -> Self {
            Self {
                counter: Cell::new(0),
                frequency,
                compare: Cell::new(0),
                overflow_enabled: Cell::new(false),
                compare_enabled: Cell::new(false),
            }
        }

        pub fn advance(&self, ticks: u32) {
            self.counter.set(self.counter.get().wrapping_add(ticks));
        }
    }

    impl Hal for MockHal {
        fn init_timer(&mut self) {
            self.counter.set(0);
        }

        fn get_counter(&self) -> u32 {
            self.counter.get()
        }

        fn get_timer_frequency(&self) -> u32 {
            self.frequency
        }

        fn set_compare(&mut self, value: u32) {
            self.compare.set(value);
        }

        fn enable_int(&mut self, event: HalEvent) {
            match event {
                HalEvent::Overflow => self.overflow_enabled.set(true),
                HalEvent::Compare => self.compare_enabled.set(true),
            }
        }

        fn disable_int(&mut self, event: HalEvent) {
            match event {
                HalEvent::Overflow => self.overflow_enabled.set(false),
                HalEvent::Compare => self.compare_enabled.set(false),
            }
        }

        fn advance_counter(&self, ticks: u32) {
            self.advance(ticks);
        }
    }

    #[test]
    fn mock_hal_tracks_compare_and_enables() {
        let mut hal = MockHal::new(32_768);
        hal.set_compare(100);
        hal.enable_int(HalEvent::Compare);
        assert_eq!(hal.compare.get(), 100);
        assert!(hal.compare_enabled.get());
        hal.disable_int(HalEvent::Compare);
        assert!(!hal.compare_enabled.get());
    }
}
