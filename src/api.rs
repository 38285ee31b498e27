//! Public facade
//!
//! Re-exports the stable operations named in the service's external
//! interface: scheduler init/start/stop/query, tick counters, unit
//! conversion, the delay primitive, and (feature-gated) the wall clock and
//! calendar. Callers only need `use sleep_timer_core::api::*;` plus the
//! [`Hal`] trait.

pub use crate::error::{Result, Status};
pub use crate::hal::{Hal, HalEvent, IrqFlags};
pub use crate::kern::delay::delay_millisecond;
pub use crate::kern::timer::{
    get_remaining_time_of_first_timer, get_tick_count, get_tick_count64, get_timer_frequency,
    get_timer_time_remaining, init, is_timer_running, process_timer_irq, restart_periodic_timer,
    restart_timer, start_periodic_timer, start_timer, stop_timer, TimerConfig, TimerFn,
    TimerHandle,
};
pub use crate::kern::units::{ms32_to_tick, ms_to_tick_u16, tick64_to_ms, tick_to_ms};

#[cfg(feature = "wall-clock")]
pub use crate::kern::timer::{get_datetime, get_time, get_tz, set_datetime, set_time, set_tz};

#[cfg(feature = "wall-clock")]
pub use crate::kern::calendar::{
    build_datetime, convert_date_to_str, convert_date_to_time, convert_time_to_date, is_valid_date,
    is_valid_time, ntp_to_unix, unix_to_ntp, unix_to_zigbee, zigbee_to_unix, CalendarDate, DateFormat,
    Epoch, Month, NTP_UNIX_OFFSET, ZIGBEE_UNIX_OFFSET,
};
