//! Injectable monotonic time source.
//!
//! The sweep controller never reads the platform timer directly; it is handed
//! a [`Clock`] so tests can drive the rate limiter tick-by-tick with a fake
//! clock and assert exact motion.

use embassy_time::Instant;

/// Something which reports the current monotonic time.
///
/// Takes a shared reference because one clock may be consulted by several
/// components in the same scheduling context.
pub trait Clock {
    /// Current monotonic instant. Must never decrease between calls.
    fn now(&self) -> Instant;
}

impl<F> Clock for F
where
    F: Fn() -> Instant,
{
    fn now(&self) -> Instant {
        self()
    }
}

/// The platform timer, via `embassy-time`.
///
/// Requires an embassy time driver to be linked (any embassy HAL on target,
/// or the `std` feature of `embassy-time` on a host).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
