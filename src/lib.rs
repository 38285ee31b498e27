//! sleep_timer_core - delta-list software timer scheduler
//!
//! Multiplexes one free-running hardware counter into an unbounded set of
//! one-shot and periodic software timers, a 64-bit monotonic tick stream,
//! and (optionally) a seconds-resolution wall clock with UNIX/NTP/Zigbee
//! calendar conversions. The hardware itself - counter, compare register,
//! interrupt vectoring - is supplied by the integrator through the [`hal`]
//! trait; this crate owns only the scheduling and time arithmetic built on
//! top of it.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![allow(clippy::new_without_default)]
#![allow(clippy::identity_op)]
#![allow(clippy::unnecessary_cast)]

pub mod api;
pub mod console;
pub mod error;
pub mod hal;
pub mod kern;
pub mod panic;

/// Crate version, for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
