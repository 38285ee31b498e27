//! Delta-list software timer scheduler
//!
//! One process-wide list of timers is multiplexed over the single
//! free-running hardware counter exposed by [`Hal`]. Each node stores its
//! deadline as a delta relative to its predecessor rather than an absolute
//! tick count, so the compare register only ever has to be reprogrammed for
//! the timer currently at the head of the list (the soonest deadline) - an
//! O(1) rearm regardless of how many timers are pending. This is the same
//! shape as the classic "delta queue" softirq timer used by most small RTOS
//! kernels; nodes are linked by raw `NonNull` pointer the same way an
//! intrusive doubly-linked kernel queue would be, generalized here into a
//! singly-linked, delta-annotated list.
//!
//! Handles are intrusively linked: a [`TimerHandle`] is owned by the
//! caller (static, stack, or embedded in a larger struct) for its entire
//! active lifetime, and the list only ever stores a raw pointer to it.
//! There is no heap anywhere in this module.

use core::ptr::NonNull;

use spin::Mutex;

use crate::error::{Result, Status};
use crate::hal::{Hal, HalEvent, IrqFlags};
use crate::kern::critical::CsCell;

#[cfg(feature = "wall-clock")]
use crate::kern::calendar::CalendarDate;
#[cfg(feature = "wall-clock")]
use crate::kern::wallclock::WallClockState;

/// Signature of a timer callback: a plain function pointer plus an opaque
/// context pointer, since this crate has no allocator and so cannot box a
/// closure. The pointer's provenance and lifetime are the caller's
/// responsibility - it is threaded through unexamined.
pub type TimerFn = fn(*mut ());

#[derive(Clone, Copy)]
struct Callback {
    func: TimerFn,
    data: *mut (),
}

/// Frequency and counter-width parameters fixed at [`init`].
#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    /// Tick rate of the hardware counter, in Hz.
    pub frequency_hz: u32,
    /// Width in bits of the hardware counter (typically 32).
    pub counter_bits: u32,
}

/// An intrusively-linked timer node.
///
/// Owned entirely by the caller. A handle must not be moved or dropped
/// while [`is_timer_running`] reports it active; the scheduler holds a raw
/// pointer into it for as long as it is linked.
pub struct TimerHandle {
    next: Option<NonNull<TimerHandle>>,
    delta: u32,
    timeout_periodic: u32,
    priority: u8,
    option_flags: u16,
    callback: Option<Callback>,
}

impl TimerHandle {
    /// An unlinked, inert handle.
    pub const fn new() -> Self {
        Self {
            next: None,
            delta: 0,
            timeout_periodic: 0,
            priority: 0,
            option_flags: 0,
            callback: None,
        }
    }

    /// The `option_flags` tag this handle was started with.
    pub fn option_flags(&self) -> u16 {
        self.option_flags
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

// Handles cross the foreground/ISR boundary purely by raw pointer, never
// by shared ownership, so marking them Send is sound under the single
// hardware-thread model this crate assumes.
unsafe impl Send for TimerHandle {}

/// The delta-ordered list itself. All deltas satisfy the invariant that
/// the sum of deltas from the head up to and including any node equals
/// that node's remaining ticks from the last reference point
/// (`SchedulerState::last_delta_update_count`).
struct TimerList {
    head: Option<NonNull<TimerHandle>>,
}

impl TimerList {
    const fn new() -> Self {
        Self { head: None }
    }

    fn is_head(&self, h: NonNull<TimerHandle>) -> bool {
        self.head == Some(h)
    }

    fn contains(&self, target: NonNull<TimerHandle>) -> bool {
        let mut cur = self.head;
        while let Some(p) = cur {
            if p == target {
                return true;
            }
            cur = unsafe { p.as_ref().next };
        }
        false
    }

    /// Insert `h`, due in `timeout` ticks from the current reference point.
    ///
    /// Walks the list consuming `timeout` as it passes nodes whose own
    /// delta is smaller (or which already expired: `delta == 0`), stopping
    /// at the first node that would fire later - with nodes due at the
    /// exact same tick broken by priority, lower number first, so equal
    /// deadlines preserve list order among equal priorities.
    fn insert(&mut self, mut h: NonNull<TimerHandle>, mut timeout: u32) {
        unsafe {
            h.as_mut().next = None;
            h.as_mut().delta = 0;
        }
        let h_priority = unsafe { h.as_ref().priority };

        let mut prev: Option<NonNull<TimerHandle>> = None;
        let mut cur = self.head;

        while let Some(cur_ptr) = cur {
            let cur_delta = unsafe { cur_ptr.as_ref().delta };
            let keep_walking = if cur_delta == 0 {
                true
            } else if timeout > cur_delta {
                true
            } else if timeout == cur_delta {
                let cur_priority = unsafe { cur_ptr.as_ref().priority };
                h_priority > cur_priority
            } else {
                false
            };

            if !keep_walking {
                break;
            }

            timeout -= cur_delta;
            prev = Some(cur_ptr);
            cur = unsafe { cur_ptr.as_ref().next };
        }

        unsafe {
            h.as_mut().delta = timeout;
            h.as_mut().next = cur;
        }
        if let Some(mut cur_ptr) = cur {
            unsafe {
                cur_ptr.as_mut().delta -= timeout;
            }
        }

        match prev {
            Some(mut p) => unsafe { p.as_mut().next = Some(h) },
            None => self.head = Some(h),
        }
    }

    /// Unlink `h`, folding its delta into its successor so the successor's
    /// delta remains relative to *its* new predecessor.
    fn remove(&mut self, h: NonNull<TimerHandle>) -> Result<()> {
        let mut prev: Option<NonNull<TimerHandle>> = None;
        let mut cur = self.head;

        while let Some(cur_ptr) = cur {
            if cur_ptr == h {
                let next = unsafe { cur_ptr.as_ref().next };
                let removed_delta = unsafe { cur_ptr.as_ref().delta };
                if let Some(mut next_ptr) = next {
                    unsafe {
                        next_ptr.as_mut().delta += removed_delta;
                    }
                }
                match prev {
                    Some(mut p) => unsafe { p.as_mut().next = next },
                    None => self.head = next,
                }
                unsafe {
                    let mut freed = cur_ptr;
                    freed.as_mut().next = None;
                    freed.as_mut().delta = 0;
                }
                return Ok(());
            }
            prev = Some(cur_ptr);
            cur = unsafe { cur_ptr.as_ref().next };
        }

        Err(Status::InvalidState)
    }

    /// Cumulative ticks remaining until `h` fires, or `None` if not linked.
    fn time_remaining(&self, h: NonNull<TimerHandle>) -> Option<u32> {
        let mut cumulative = 0u32;
        let mut cur = self.head;
        while let Some(cur_ptr) = cur {
            cumulative += unsafe { cur_ptr.as_ref().delta };
            if cur_ptr == h {
                return Some(cumulative);
            }
            cur = unsafe { cur_ptr.as_ref().next };
        }
        None
    }

    /// Cumulative ticks remaining until the first node tagged with
    /// `option_flags`, in list order.
    fn first_matching(&self, option_flags: u16) -> Option<u32> {
        let mut cumulative = 0u32;
        let mut cur = self.head;
        while let Some(cur_ptr) = cur {
            cumulative += unsafe { cur_ptr.as_ref().delta };
            if unsafe { cur_ptr.as_ref().option_flags } == option_flags {
                return Some(cumulative);
            }
            cur = unsafe { cur_ptr.as_ref().next };
        }
        None
    }

    /// Fold the ticks elapsed since `last_delta_update_count` into the
    /// head's delta, clamping to zero (an "already expired" leftover) if
    /// more ticks elapsed than the head still had remaining.
    fn update_first_timer_delta(&mut self, now: u32, last_delta_update_count: &mut u32) {
        if let Some(mut head) = self.head {
            let elapsed = now.wrapping_sub(*last_delta_update_count);
            let head_delta = unsafe { head.as_ref().delta };
            if head_delta >= elapsed {
                unsafe {
                    head.as_mut().delta = head_delta - elapsed;
                }
            } else {
                unsafe {
                    head.as_mut().delta = 0;
                }
            }
        }
        *last_delta_update_count = now;
    }

    /// Reprogram the compare register for the new head, or disable compare
    /// interrupts entirely if the list is empty.
    fn set_comparator_for_next_timer(&self, hal: &mut dyn Hal, last_delta_update_count: u32) {
        match self.head {
            Some(head) => {
                let target = last_delta_update_count.wrapping_add(unsafe { head.as_ref().delta });
                hal.set_compare(target);
                hal.enable_int(HalEvent::Compare);
            }
            None => hal.disable_int(HalEvent::Compare),
        }
    }

    /// Pop the highest-priority (lowest number) timer among all nodes
    /// whose cumulative delta from the head is within `delta_budget`,
    /// breaking ties by list order. Returns the handle, the cumulative
    /// delta it was due at, and its reload period (0 if one-shot).
    fn pop_next_to_fire(&mut self, delta_budget: u32) -> Option<(NonNull<TimerHandle>, u32, u32)> {
        let head = self.head?;
        if delta_budget < unsafe { head.as_ref().delta } {
            return None;
        }

        let mut cumulative = 0u32;
        let mut cur = self.head;
        let mut chosen: Option<NonNull<TimerHandle>> = None;
        let mut chosen_priority = u8::MAX;
        let mut chosen_path_sum = 0u32;

        while let Some(cur_ptr) = cur {
            let next_cumulative = cumulative + unsafe { cur_ptr.as_ref().delta };
            if next_cumulative > delta_budget {
                break;
            }
            cumulative = next_cumulative;
            let priority = unsafe { cur_ptr.as_ref().priority };
            if chosen.is_none() || priority < chosen_priority {
                chosen = Some(cur_ptr);
                chosen_priority = priority;
                chosen_path_sum = cumulative;
            }
            cur = unsafe { cur_ptr.as_ref().next };
        }

        let chosen = chosen?;
        let periodic = unsafe { chosen.as_ref().timeout_periodic };
        unsafe {
            (*chosen.as_ptr()).delta = 0;
        }
        self.remove(chosen).ok()?;
        Some((chosen, chosen_path_sum, periodic))
    }
}

struct SchedulerState {
    list: TimerList,
    overflow_counter: u8,
    last_delta_update_count: u32,
    frequency_hz: u32,
    counter_bits: u32,
    #[cfg(feature = "wall-clock")]
    wall_clock: Option<WallClockState>,
}

impl SchedulerState {
    const fn new() -> Self {
        Self {
            list: TimerList::new(),
            overflow_counter: 0,
            last_delta_update_count: 0,
            frequency_hz: 0,
            counter_bits: 32,
            #[cfg(feature = "wall-clock")]
            wall_clock: None,
        }
    }

    fn counter_mask(&self) -> u64 {
        if self.counter_bits >= 32 {
            u32::MAX as u64
        } else {
            (1u64 << self.counter_bits) - 1
        }
    }
}

static SCHED: CsCell<SchedulerState> = CsCell::new(SchedulerState::new());
static HAL: Mutex<Option<&'static mut dyn Hal>> = Mutex::new(None);

pub(crate) fn with_hal<R>(f: impl FnOnce(&mut dyn Hal) -> R) -> R {
    let mut guard = HAL.lock();
    let hal = guard
        .as_mut()
        .expect("sleep_timer_core::kern::timer::init was never called");
    f(&mut **hal)
}

/// Install the HAL instance and scheduler-wide configuration. Idempotent:
/// later calls are ignored once the HAL has been set - there is only ever
/// one scheduler instance per process.
pub fn init(hal: &'static mut dyn Hal, config: TimerConfig) {
    {
        let mut guard = HAL.lock();
        if guard.is_none() {
            *guard = Some(hal);
        }
    }
    with_hal(|hal| {
        hal.init_timer();
        SCHED.with(hal, |state| {
            state.frequency_hz = config.frequency_hz;
            state.counter_bits = config.counter_bits;
            #[cfg(feature = "wall-clock")]
            {
                state.wall_clock = Some(WallClockState::new(config.frequency_hz, config.counter_bits));
            }
        });
    });
}

/// Test-only: clear the installed HAL and reset the scheduler singleton so
/// `init` can be called fresh by the next test. Callers must serialize
/// access to this alongside every other call that touches `HAL`/`SCHED`.
#[cfg(test)]
pub(crate) fn reset_for_test() {
    *HAL.lock() = None;
    SCHED.replace(SchedulerState::new());
}

fn create_timer(
    h: &mut TimerHandle,
    timeout_initial: u32,
    timeout_periodic: u32,
    func: TimerFn,
    data: *mut (),
    priority: u8,
    option_flags: u16,
) {
    h.priority = priority;
    h.option_flags = option_flags;
    h.timeout_periodic = timeout_periodic;
    h.callback = Some(Callback { func, data });

    if timeout_initial == 0 {
        func(data);
        if timeout_periodic != 0 {
            insert_locked(h, timeout_periodic);
        }
        return;
    }
    insert_locked(h, timeout_initial);
}

fn insert_locked(h: &mut TimerHandle, timeout: u32) {
    let hptr = NonNull::from(&mut *h);
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            let now = hal.get_counter();
            state
                .list
                .update_first_timer_delta(now, &mut state.last_delta_update_count);
            state.list.insert(hptr, timeout);
            state
                .list
                .set_comparator_for_next_timer(hal, state.last_delta_update_count);
        });
    });
}

/// Start a one-shot timer. Fails with [`Status::NotReady`] if `h` is
/// already running.
pub fn start_timer(
    h: &mut TimerHandle,
    ticks: u32,
    func: TimerFn,
    data: *mut (),
    priority: u8,
    option_flags: u16,
) -> Result<()> {
    if is_timer_running(h) {
        return Err(Status::NotReady);
    }
    create_timer(h, ticks, 0, func, data, priority, option_flags);
    Ok(())
}

/// Stop `h` if running, then start it as a fresh one-shot timer.
pub fn restart_timer(
    h: &mut TimerHandle,
    ticks: u32,
    func: TimerFn,
    data: *mut (),
    priority: u8,
    option_flags: u16,
) -> Result<()> {
    let _ = stop_timer(h);
    create_timer(h, ticks, 0, func, data, priority, option_flags);
    Ok(())
}

/// Start a periodic timer. Fails with [`Status::InvalidState`] if `h` is
/// already running (unlike [`start_timer`], which uses `NotReady` - a
/// periodic timer restarting itself is a caller bug worth distinguishing
/// from a one-shot timer simply not having fired yet).
pub fn start_periodic_timer(
    h: &mut TimerHandle,
    period: u32,
    func: TimerFn,
    data: *mut (),
    priority: u8,
    option_flags: u16,
) -> Result<()> {
    if is_timer_running(h) {
        return Err(Status::InvalidState);
    }
    create_timer(h, period, period, func, data, priority, option_flags);
    Ok(())
}

/// Stop `h` if running, then start it as a fresh periodic timer.
pub fn restart_periodic_timer(
    h: &mut TimerHandle,
    period: u32,
    func: TimerFn,
    data: *mut (),
    priority: u8,
    option_flags: u16,
) -> Result<()> {
    let _ = stop_timer(h);
    create_timer(h, period, period, func, data, priority, option_flags);
    Ok(())
}

/// Stop a running timer. Errors with [`Status::InvalidState`] if it was
/// not linked.
pub fn stop_timer(h: &mut TimerHandle) -> Result<()> {
    let hptr = NonNull::from(&mut *h);
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            let was_head = state.list.is_head(hptr);
            state.list.remove(hptr)?;
            if was_head {
                state
                    .list
                    .set_comparator_for_next_timer(hal, state.last_delta_update_count);
            }
            Ok(())
        })
    })
}

/// Whether `h` is currently linked into the scheduler.
pub fn is_timer_running(h: &TimerHandle) -> bool {
    let hptr = NonNull::from(h);
    with_hal(|hal| SCHED.with(hal, |state| state.list.contains(hptr)))
}

/// Ticks remaining until `h` fires. `NotReady` if it is not running.
pub fn get_timer_time_remaining(h: &TimerHandle) -> Result<u32> {
    let hptr = NonNull::from(h);
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            let now = hal.get_counter();
            state
                .list
                .update_first_timer_delta(now, &mut state.last_delta_update_count);
            state.list.time_remaining(hptr).ok_or(Status::NotReady)
        })
    })
}

/// Ticks remaining until the first linked timer tagged with
/// `option_flags`, in list order. `Empty` if none matches.
pub fn get_remaining_time_of_first_timer(option_flags: u16) -> Result<u32> {
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            let now = hal.get_counter();
            state
                .list
                .update_first_timer_delta(now, &mut state.last_delta_update_count);
            state.list.first_matching(option_flags).ok_or(Status::Empty)
        })
    })
}

/// Raw 32-bit hardware counter value.
pub fn get_tick_count() -> u32 {
    with_hal(|hal| hal.get_counter())
}

/// 64-bit monotonic tick count: the hardware counter widened by the
/// overflow epoch recorded so far.
pub fn get_tick_count64() -> u64 {
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            let counter = hal.get_counter() as u64 & state.counter_mask();
            ((state.overflow_counter as u64) << state.counter_bits) | counter
        })
    })
}

/// Effective tick rate of the underlying hardware counter, in Hz.
pub fn get_timer_frequency() -> u32 {
    with_hal(|hal| hal.get_timer_frequency())
}

/// Current UNIX time, per the wall clock derived from overflow bookkeeping.
#[cfg(feature = "wall-clock")]
pub fn get_time() -> Result<u32> {
    with_hal(|hal| {
        let now = hal.get_counter();
        SCHED.with(hal, |state| {
            state
                .wall_clock
                .as_ref()
                .map(|wc| wc.get_time(now))
                .ok_or(Status::NotReady)
        })
    })
}

/// Rebase the wall clock so `get_time()` reads `t` from now on.
#[cfg(feature = "wall-clock")]
pub fn set_time(t: u32) -> Result<()> {
    with_hal(|hal| {
        let now = hal.get_counter();
        SCHED.with(hal, |state| match state.wall_clock.as_mut() {
            Some(wc) => wc.set_time(t, now),
            None => Err(Status::NotReady),
        })
    })
}

/// The wall clock's current timezone offset, in seconds.
#[cfg(feature = "wall-clock")]
pub fn get_tz() -> Result<i32> {
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            state.wall_clock.as_ref().map(|wc| wc.get_tz()).ok_or(Status::NotReady)
        })
    })
}

/// Set the wall clock's timezone offset, in seconds.
#[cfg(feature = "wall-clock")]
pub fn set_tz(tz: i32) -> Result<()> {
    with_hal(|hal| {
        SCHED.with(hal, |state| match state.wall_clock.as_mut() {
            Some(wc) => {
                wc.set_tz(tz);
                Ok(())
            }
            None => Err(Status::NotReady),
        })
    })
}

/// The current wall-clock time broken down into calendar fields, in the
/// wall clock's own timezone.
#[cfg(feature = "wall-clock")]
pub fn get_datetime() -> Result<CalendarDate> {
    crate::kern::calendar::convert_time_to_date(get_time()?, get_tz()?)
}

/// Rebase the wall clock so `get_datetime()`/`get_time()` read `d` from now
/// on, converting through the wall clock's current timezone.
#[cfg(feature = "wall-clock")]
pub fn set_datetime(d: &CalendarDate) -> Result<()> {
    set_time(crate::kern::calendar::convert_date_to_time(d)?)
}

/// Entry point the HAL's ISR calls with whichever sources are pending.
pub fn process_timer_irq(flags: IrqFlags) {
    if flags.contains(IrqFlags::OVERFLOW) {
        handle_overflow();
    }
    if flags.contains(IrqFlags::COMPARE) {
        dispatch();
    }
}

fn handle_overflow() {
    with_hal(|hal| {
        SCHED.with(hal, |state| {
            state.overflow_counter = state.overflow_counter.wrapping_add(1);
            #[cfg(feature = "wall-clock")]
            if let Some(wall_clock) = state.wall_clock.as_mut() {
                wall_clock.advance_epoch();
            }
            let now = hal.get_counter();
            state
                .list
                .update_first_timer_delta(now, &mut state.last_delta_update_count);
            state
                .list
                .set_comparator_for_next_timer(hal, state.last_delta_update_count);
        });
    });
}

/// Drain every timer due at or before "now", firing the highest-priority
/// one in each simultaneous cluster first, reloading periodic timers, and
/// re-sampling the counter around each callback so a slow callback cannot
/// make the scheduler think time stood still.
fn dispatch() {
    let mut current_cnt = with_hal(|hal| hal.get_counter());
    let mut delta_tot = with_hal(|hal| {
        SCHED.with(hal, |state| {
            current_cnt.wrapping_sub(state.last_delta_update_count)
        })
    });

    loop {
        let fired = with_hal(|hal| {
            SCHED.with(hal, |state| {
                state
                    .list
                    .update_first_timer_delta(current_cnt, &mut state.last_delta_update_count);
                state.list.pop_next_to_fire(delta_tot)
            })
        });

        let (handle, path_sum, periodic) = match fired {
            Some(v) => v,
            None => break,
        };
        delta_tot -= path_sum;

        let callback = unsafe { (*handle.as_ptr()).callback };
        if periodic != 0 {
            insert_locked(unsafe { &mut *handle.as_ptr() }, periodic);
        }

        if let Some(cb) = callback {
            (cb.func)(cb.data);
        }

        let now = with_hal(|hal| hal.get_counter());
        let elapsed = now.wrapping_sub(current_cnt);
        current_cnt = now;
        delta_tot = delta_tot.wrapping_add(elapsed);
    }

    with_hal(|hal| {
        SCHED.with(hal, |state| {
            state
                .list
                .update_first_timer_delta(current_cnt, &mut state.last_delta_update_count);
            state
                .list
                .set_comparator_for_next_timer(hal, state.last_delta_update_count);
        });
    });
}


/// End-to-end tests driving the public API (`init`, `start_timer`,
/// `process_timer_irq`, `get_tick_count64`) against a `'static` `MockHal`,
/// rather than against `TimerList` directly. All tests here mutate the
/// process-wide `SCHED`/`HAL` singletons, so every test serializes on
/// `TEST_LOCK` and resets the singletons first via `reset_for_test`.
#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::hal::mock::MockHal;
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn fresh_hal(frequency: u32) -> &'static mut MockHal {
        Box::leak(Box::new(MockHal::new(frequency)))
    }

    /// S1: a one-shot timer due in 32768 ticks does not fire one tick
    /// early, and does fire once the full interval has elapsed - driven
    /// through `start_timer`/`process_timer_irq`, not `TimerList` directly.
    #[test]
    fn scenario_s1_one_shot_fires_through_dispatch() {
        let _guard = TEST_LOCK.lock();
        reset_for_test();
        let hal = fresh_hal(32_768);
        init(
            hal,
            TimerConfig {
                frequency_hz: 32_768,
                counter_bits: 32,
            },
        );

        static FIRED: AtomicBool = AtomicBool::new(false);
        FIRED.store(false, Ordering::SeqCst);
        fn mark_fired(data: *mut ()) {
            unsafe { &*(data as *const AtomicBool) }.store(true, Ordering::SeqCst);
        }

        let mut handle = TimerHandle::new();
        start_timer(&mut handle, 32_768, mark_fired, &FIRED as *const AtomicBool as *mut (), 0, 0)
            .unwrap();

        with_hal(|hal| hal.advance_counter(32_767));
        process_timer_irq(IrqFlags::COMPARE);
        assert!(!FIRED.load(Ordering::SeqCst));
        assert!(is_timer_running(&handle));

        with_hal(|hal| hal.advance_counter(1));
        process_timer_irq(IrqFlags::COMPARE);
        assert!(FIRED.load(Ordering::SeqCst));
        assert!(!is_timer_running(&handle));
    }

    /// S2: A(delta=10, prio=5), B(delta=10, prio=2), C(delta=10, prio=3)
    /// started in that order; at t=10 they must dispatch B, C, A - driven
    /// through `process_timer_irq` rather than `pop_next_to_fire` directly.
    #[test]
    fn scenario_s2_priority_breaks_ties_through_dispatch() {
        let _guard = TEST_LOCK.lock();
        reset_for_test();
        let hal = fresh_hal(1_000);
        init(
            hal,
            TimerConfig {
                frequency_hz: 1_000,
                counter_bits: 32,
            },
        );

        static COUNTER: AtomicU32 = AtomicU32::new(0);
        static ORDER_A: AtomicU32 = AtomicU32::new(u32::MAX);
        static ORDER_B: AtomicU32 = AtomicU32::new(u32::MAX);
        static ORDER_C: AtomicU32 = AtomicU32::new(u32::MAX);
        COUNTER.store(0, Ordering::SeqCst);
        ORDER_A.store(u32::MAX, Ordering::SeqCst);
        ORDER_B.store(u32::MAX, Ordering::SeqCst);
        ORDER_C.store(u32::MAX, Ordering::SeqCst);

        fn record(data: *mut ()) {
            let slot = unsafe { &*(data as *const AtomicU32) };
            slot.store(COUNTER.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
        }

        let mut a = TimerHandle::new();
        let mut b = TimerHandle::new();
        let mut c = TimerHandle::new();
        start_timer(&mut a, 10, record, &ORDER_A as *const AtomicU32 as *mut (), 5, 0).unwrap();
        start_timer(&mut b, 10, record, &ORDER_B as *const AtomicU32 as *mut (), 2, 0).unwrap();
        start_timer(&mut c, 10, record, &ORDER_C as *const AtomicU32 as *mut (), 3, 0).unwrap();

        with_hal(|hal| hal.advance_counter(10));
        process_timer_irq(IrqFlags::COMPARE);

        let (oa, ob, oc) = (
            ORDER_A.load(Ordering::SeqCst),
            ORDER_B.load(Ordering::SeqCst),
            ORDER_C.load(Ordering::SeqCst),
        );
        assert!(ob < oc && oc < oa, "expected B, C, A order; got A={oa} B={ob} C={oc}");
        assert!(!is_timer_running(&a));
        assert!(!is_timer_running(&b));
        assert!(!is_timer_running(&c));
    }

    /// S3: a periodic timer with period=100 fires at t=100, 200, 300 and is
    /// still pending (not yet due) at t=350 - driven through
    /// `start_periodic_timer`/`process_timer_irq`.
    #[test]
    fn scenario_s3_periodic_timer_reloads_through_dispatch() {
        let _guard = TEST_LOCK.lock();
        reset_for_test();
        let hal = fresh_hal(1_000);
        init(
            hal,
            TimerConfig {
                frequency_hz: 1_000,
                counter_bits: 32,
            },
        );

        static FIRE_COUNT: AtomicU32 = AtomicU32::new(0);
        FIRE_COUNT.store(0, Ordering::SeqCst);
        fn bump(data: *mut ()) {
            unsafe { &*(data as *const AtomicU32) }.fetch_add(1, Ordering::SeqCst);
        }

        let mut h = TimerHandle::new();
        start_periodic_timer(&mut h, 100, bump, &FIRE_COUNT as *const AtomicU32 as *mut (), 0, 0)
            .unwrap();

        for _ in 0..3 {
            with_hal(|hal| hal.advance_counter(100));
            process_timer_irq(IrqFlags::COMPARE);
        }
        assert_eq!(FIRE_COUNT.load(Ordering::SeqCst), 3);
        assert!(is_timer_running(&h));

        with_hal(|hal| hal.advance_counter(50));
        process_timer_irq(IrqFlags::COMPARE);
        assert_eq!(FIRE_COUNT.load(Ordering::SeqCst), 3);
        assert_eq!(get_timer_time_remaining(&h).unwrap(), 50);
    }

    /// Overflow bookkeeping advances the overflow epoch on every
    /// `IrqFlags::OVERFLOW` delivery, independent of any pending
    /// compare-match.
    #[test]
    fn handle_overflow_advances_epoch_on_each_overflow_irq() {
        let _guard = TEST_LOCK.lock();
        reset_for_test();
        let hal = fresh_hal(1_000);
        init(
            hal,
            TimerConfig {
                frequency_hz: 1_000,
                counter_bits: 32,
            },
        );

        let before = get_tick_count64();
        with_hal(|hal| hal.advance_counter(100));
        process_timer_irq(IrqFlags::OVERFLOW);
        let after_one = get_tick_count64();
        assert_eq!(after_one, (1u64 << 32) | 100);
        assert!(after_one > before);

        with_hal(|hal| hal.advance_counter(50));
        process_timer_irq(IrqFlags::OVERFLOW);
        let after_two = get_tick_count64();
        assert_eq!(after_two, (2u64 << 32) | 150);
        assert!(after_two > after_one);
    }

    /// `get_tick_count64` composes the raw counter with the overflow epoch
    /// rather than wrapping at the 32-bit boundary.
    #[test]
    fn get_tick_count64_widens_raw_counter_by_overflow_epoch() {
        let _guard = TEST_LOCK.lock();
        reset_for_test();
        let hal = fresh_hal(1_000);
        init(
            hal,
            TimerConfig {
                frequency_hz: 1_000,
                counter_bits: 32,
            },
        );

        assert_eq!(get_tick_count64(), 0);

        with_hal(|hal| hal.advance_counter(u32::MAX));
        assert_eq!(get_tick_count64(), u32::MAX as u64);

        // The counter wraps in hardware; only an overflow IRQ advances the
        // epoch half of the 64-bit count.
        with_hal(|hal| hal.advance_counter(1));
        assert_eq!(get_tick_count(), 0);
        assert_eq!(get_tick_count64(), 0);

        process_timer_irq(IrqFlags::OVERFLOW);
        assert_eq!(get_tick_count64(), 1u64 << 32);
    }
}
