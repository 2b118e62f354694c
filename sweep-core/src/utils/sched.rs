//! Cooperative tick scheduler.
//!
//! Periodic components implement [`Tickable`] and are registered with a
//! [`Scheduler`] together with a dispatch period. A single owner polls the
//! scheduler from its main loop; there is no preemption, so components are
//! free to keep plain `&mut` state. Components that care about precise motion
//! scale their work by the `now` they are handed rather than by the nominal
//! period, which makes the whole arrangement tolerant of polling jitter.

use embassy_time::{Duration, Instant};

/// A component that wants periodic service from the scheduler.
pub trait Tickable {
    /// Run one update. `now` is the scheduler's current monotonic time.
    fn tick(&mut self, now: Instant);
}

/// Returned by [`Scheduler::add`] when all `N` slots are taken.
#[derive(Debug, PartialEq, Eq)]
pub struct SchedulerFull;

struct Slot<'a> {
    component: &'a mut dyn Tickable,
    period: Duration,
    due: Option<Instant>,
}

/// Fixed-capacity collection of periodic components.
///
/// Each registered component is dispatched whenever `poll` observes that its
/// period has elapsed; the first `poll` after registration dispatches
/// immediately.
pub struct Scheduler<'a, const N: usize> {
    slots: heapless::Vec<Slot<'a>, N>,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
        }
    }

    /// Register a component to be ticked every `period`.
    pub fn add(
        &mut self,
        component: &'a mut dyn Tickable,
        period: Duration,
    ) -> Result<(), SchedulerFull> {
        self.slots
            .push(Slot {
                component,
                period,
                due: None,
            })
            .map_err(|_| SchedulerFull)
    }

    /// Dispatch every component whose period has elapsed.
    ///
    /// `now` must come from the same monotonic source on every call.
    pub fn poll(&mut self, now: Instant) {
        for slot in self.slots.iter_mut() {
            let due = slot.due.map_or(true, |due| now >= due);
            if due {
                slot.component.tick(now);
                slot.due = Some(now + slot.period);
            }
        }
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no components are registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a, const N: usize> Default for Scheduler<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        ticks: u32,
    }

    impl Tickable for Counter {
        fn tick(&mut self, _now: Instant) {
            self.ticks += 1;
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn dispatches_on_period() {
        let mut fast = Counter { ticks: 0 };
        let mut slow = Counter { ticks: 0 };
        {
            let mut sched: Scheduler<'_, 4> = Scheduler::new();
            sched.add(&mut fast, Duration::from_millis(10)).unwrap();
            sched.add(&mut slow, Duration::from_millis(50)).unwrap();

            for ms in (0..=100).step_by(10) {
                sched.poll(at(ms));
            }
        }
        // First poll fires both, then every 10ms / 50ms respectively.
        assert_eq!(fast.ticks, 11);
        assert_eq!(slow.ticks, 3);
    }

    #[test]
    fn rejects_when_full() {
        let mut a = Counter { ticks: 0 };
        let mut b = Counter { ticks: 0 };
        let mut sched: Scheduler<'_, 1> = Scheduler::new();
        assert!(sched.add(&mut a, Duration::from_millis(1)).is_ok());
        assert_eq!(
            sched.add(&mut b, Duration::from_millis(1)),
            Err(SchedulerFull)
        );
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn late_poll_does_not_double_fire() {
        let mut c = Counter { ticks: 0 };
        {
            let mut sched: Scheduler<'_, 1> = Scheduler::new();
            sched.add(&mut c, Duration::from_millis(10)).unwrap();
            sched.poll(at(0));
            // One very late poll still dispatches exactly once.
            sched.poll(at(95));
        }
        assert_eq!(c.ticks, 2);
    }
}
