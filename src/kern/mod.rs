//! Kernel-side scheduler primitives
//!
//! `critical` is the interrupt-mask primitive everything else is built on;
//! `timer` is the delta-list scheduler; `units`, `delay` and the
//! feature-gated `wallclock`/`calendar` are built on top of it.

pub mod critical;
pub mod delay;
pub mod timer;
pub mod units;

#[cfg(feature = "wall-clock")]
pub mod calendar;
#[cfg(feature = "wall-clock")]
pub mod wallclock;
