//! Seconds-resolution wall clock derived from the free-running counter
//!
//! Rather than dividing on every read, the whole-seconds-per-overflow and
//! leftover-tick-remainder are precomputed once from the frequency and
//! folded in on every hardware overflow IRQ, so a read is just an addition.

/// Wall clock state, feature-gated behind `wall-clock`.
pub struct WallClockState {
    second_count: u32,
    overflow_tick_rest: u32,
    tz_offset: i32,
    calc_sec: u32,
    calc_rest: u32,
    frequency_hz: u32,
}

impl WallClockState {
    /// `calc_sec = floor(2^counter_bits / frequency_hz)`,
    /// `calc_rest = 2^counter_bits mod frequency_hz`.
    pub fn new(frequency_hz: u32, counter_bits: u32) -> Self {
        let period = 1u64 << counter_bits;
        Self {
            second_count: 0,
            overflow_tick_rest: 0,
            tz_offset: 0,
            calc_sec: (period / frequency_hz as u64) as u32,
            calc_rest: (period % frequency_hz as u64) as u32,
            frequency_hz,
        }
    }

    /// Fold one hardware overflow's worth of elapsed time into the clock.
    pub fn advance_epoch(&mut self) {
        self.overflow_tick_rest += self.calc_rest;
        if self.overflow_tick_rest >= self.frequency_hz {
            self.overflow_tick_rest -= self.frequency_hz;
            self.second_count = self.second_count.wrapping_add(1);
        }
        self.second_count = self.second_count.wrapping_add(self.calc_sec);
    }

    /// UNIX seconds "now", given the raw hardware counter reading.
    pub fn get_time(&self, now: u32) -> u32 {
        let whole = now / self.frequency_hz;
        let rest = now % self.frequency_hz;
        let carry = u32::from(rest + self.overflow_tick_rest >= self.frequency_hz);
        self.second_count.wrapping_add(whole).wrapping_add(carry)
    }

    /// Rebase the clock so that `get_time(now) == t` from this call
    /// onward. Fails if `t` predates the in-progress second (i.e. the
    /// rebase would need a negative `second_count`).
    pub fn set_time(&mut self, t: u32, now: u32) -> Result<(), crate::error::Status> {
        let whole = now / self.frequency_hz;
        if t < whole {
            return Err(crate::error::Status::InvalidParameter);
        }
        self.second_count = t - whole;
        self.overflow_tick_rest = 0;
        Ok(())
    }

    pub fn get_tz(&self) -> i32 {
        self.tz_offset
    }

    pub fn set_tz(&mut self, tz: i32) {
        self.tz_offset = tz;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_epoch_accumulates_seconds_and_remainder() {
        // F=32768=2^15 divides 2^32 evenly: calc_sec = 2^17, calc_rest = 0.
        let mut clock = WallClockState::new(32_768, 32);
        assert_eq!(clock.calc_sec, 1 << 17);
        assert_eq!(clock.calc_rest, 0);

        clock.advance_epoch();
        assert_eq!(clock.second_count, 1 << 17);
    }

    #[test]
    fn get_time_adds_whole_seconds_since_last_overflow() {
        let mut clock = WallClockState::new(32_768, 32);
        clock.second_count = 1_600_000_000;
        assert_eq!(clock.get_time(32_768), 1_600_000_001);
        assert_eq!(clock.get_time(0), 1_600_000_000);
    }

    #[test]
    fn scenario_s4_full_counter_period_advances_by_2_to_the_17() {
        // S4: F=32768Hz, second_count starts at 1_600_000_000. After a
        // full 2^32-tick span (i.e. 2^17 overflow IRQs, since
        // overflow happens every 2^32 raw ticks here - one overflow),
        // get_time() should read 1_600_000_000 + floor(2^32/32768).
        let mut clock = WallClockState::new(32_768, 32);
        clock.second_count = 1_600_000_000;
        clock.advance_epoch();
        assert_eq!(clock.get_time(0), 1_600_000_000 + (1u32 << 17));
        assert_eq!(1_600_000_000 + (1u32 << 17), 1_600_131_072);
    }

    #[test]
    fn set_time_rejects_rebase_into_the_past() {
        let mut clock = WallClockState::new(32_768, 32);
        assert!(clock.set_time(0, 32_768).is_err());
        assert!(clock.set_time(1, 32_768).is_ok());
    }

    #[test]
    fn set_time_then_get_time_round_trips() {
        let mut clock = WallClockState::new(32_768, 32);
        clock.set_time(1_700_000_000, 0).unwrap();
        assert_eq!(clock.get_time(0), 1_700_000_000);
    }
}
