//! Asynchronous sweep controller for position servos.
//!
//! [`SweepServo`] tracks a current and a commanded pulse width and, on every
//! scheduler tick, moves the physical output toward the target by at most the
//! configured angular rate scaled by the real elapsed time, so the delivered
//! rate does not depend on the tick cadence. Nothing here blocks except
//! [`SweepServo::initialize`], the one-shot startup calibration.

use embassy_time::{Duration, Instant};

use crate::utils::{math::calib::PulseCalibration, sched::Tickable, time::Clock};

/// Rate used until a caller configures one: 6° per 50 ms.
pub const DEFAULT_SPEED: SweepSpeed = SweepSpeed {
    angle: 6.0,
    interval: Duration::from_millis(50),
};

/// Interface to the physical position channel.
///
/// Implemented by hardware bindings (see `controllers::pca`) and by logging or
/// recording outputs on the host.
pub trait ServoOutput {
    /// Error type of the underlying output layer.
    type Error: core::fmt::Debug;

    /// Bring the output out of standby. Called once by [`SweepServo::attach`];
    /// failure here is the binding-failure sentinel.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Command a pulse width in microseconds.
    fn write_pulse(
        &mut self,
        pulse_us: u16,
    ) -> Result<(), Self::Error>;
}

/// Motion state of a sweep controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// Tracked position equals the commanded position; no writes are issued.
    Idle,
    /// The controller is slewing toward the commanded position.
    Active,
}

/// Angular rate expressed as an (angle, interval) pair, e.g. 18° per 50 ms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSpeed {
    /// Degrees of travel per `interval`.
    pub angle: f32,
    /// Reference interval for `angle`.
    pub interval: Duration,
}

impl SweepSpeed {
    /// Construct a rate of `angle` degrees per `interval`.
    pub const fn per(
        angle: f32,
        interval: Duration,
    ) -> Self {
        Self { angle, interval }
    }

    /// A zero angle or zero interval carries no rate information.
    pub fn is_valid(&self) -> bool {
        self.angle > 0.0 && self.interval.as_ticks() > 0
    }
}

/// Errors that can occur when driving a sweep servo.
#[derive(Debug)]
pub enum SweepError<E: core::fmt::Debug> {
    /// No output is bound; `attach` has not succeeded yet.
    NotAttached,
    /// No servo is registered on the addressed channel.
    UnknownChannel(u8),
    /// The output layer rejected a write.
    Output(E),
}

/// Non-blocking sweep controller for a single position servo.
///
/// The controller is exclusively owned by one scheduling context. Commands
/// (`sweep`, `set_speed`) only store pending values; all hardware writes
/// happen inside [`SweepServo::step`], so issuing a new command mid-motion
/// simply redirects the trajectory on the next tick.
pub struct SweepServo<O: ServoOutput> {
    output: Option<O>,
    calib: PulseCalibration,
    current_us: u16,
    target_us: u16,
    /// Idle default rate, set via `set_speed`.
    configured: SweepSpeed,
    /// Rate governing the trajectory in flight.
    commanded: SweepSpeed,
    state: SweepState,
    observer: Option<fn(SweepState)>,
    last_tick: Option<Instant>,
    suppress_observer: bool,
}

impl<O: ServoOutput> SweepServo<O> {
    /// Create an unbound controller over the given calibration table.
    ///
    /// The tracked position starts at 0° and the rate at [`DEFAULT_SPEED`];
    /// nothing touches hardware until [`SweepServo::attach`] succeeds.
    pub fn new(calib: PulseCalibration) -> Self {
        let rest = calib.angle_to_pulse(0.0);
        Self {
            output: None,
            calib,
            current_us: rest,
            target_us: rest,
            configured: DEFAULT_SPEED,
            commanded: DEFAULT_SPEED,
            state: SweepState::Idle,
            observer: None,
            last_tick: None,
            suppress_observer: false,
        }
    }

    /// Bind the controller to a physical output.
    ///
    /// The output's `enable` failing is reported as [`SweepError::Output`]
    /// and leaves the controller unbound; callers may retry with a different
    /// output. A controller without a binding accepts commands but performs
    /// no writes.
    pub fn attach(
        &mut self,
        mut output: O,
    ) -> Result<(), SweepError<O::Error>> {
        output.enable().map_err(SweepError::Output)?;
        self.output = Some(output);
        self.state = SweepState::Idle;
        self.last_tick = None;
        Ok(())
    }

    /// True once an output is bound.
    pub fn is_attached(&self) -> bool {
        self.output.is_some()
    }

    /// Blocking startup calibration.
    ///
    /// Drives the output to its full extent so the mechanical position is
    /// known, waits out the worst-case travel time against `clock`, then
    /// rate-limit-sweeps back to `angle`. Transition observers are suppressed
    /// throughout. Intended to run once, before the scheduler starts
    /// dispatching; at the configured rate a full-travel calibration takes
    /// hundreds of milliseconds.
    pub fn initialize(
        &mut self,
        clock: &impl Clock,
        angle: f32,
    ) -> Result<(), SweepError<O::Error>> {
        if self.output.is_none() {
            return Err(SweepError::NotAttached);
        }
        self.suppress_observer = true;
        let result = self.calibrate(clock, angle);
        self.suppress_observer = false;
        self.last_tick = None;
        result
    }

    /// Command a new target angle, optionally overriding the rate.
    ///
    /// Does not block. The angle is clamped to the calibration range. A
    /// `None` or invalid `speed` reuses the previously configured rate; in
    /// particular a zero-angle speed is "no override", never "stop".
    /// Last write wins: a command issued mid-motion redirects the trajectory
    /// on the next tick.
    pub fn sweep(
        &mut self,
        angle: f32,
        speed: Option<SweepSpeed>,
    ) {
        self.target_us = self.calib.angle_to_pulse(angle);
        self.commanded = match speed {
            Some(rate) if rate.is_valid() => rate,
            _ => self.configured,
        };
    }

    /// The tracked (current) angle in degrees — not the commanded target.
    pub fn angle(&self) -> f32 {
        self.calib.pulse_to_angle(self.current_us)
    }

    /// The tracked position as a raw pulse width.
    pub fn pulse(&self) -> u16 {
        self.current_us
    }

    /// Governing rate: the commanded rate while a sweep is in flight, the
    /// configured default while settled.
    pub fn speed(&self) -> SweepSpeed {
        match self.state {
            SweepState::Active => self.commanded,
            SweepState::Idle => self.configured,
        }
    }

    /// Set the configured default rate. Invalid rates are ignored.
    pub fn set_speed(
        &mut self,
        speed: SweepSpeed,
    ) {
        if speed.is_valid() {
            self.configured = speed;
        }
    }

    /// Current motion state.
    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Register the observer invoked once per Idle/Active transition.
    ///
    /// The observer fires on transitions only, never per tick, and never
    /// during [`SweepServo::initialize`].
    pub fn on_transition(
        &mut self,
        observer: fn(SweepState),
    ) {
        self.observer = Some(observer);
    }

    /// Run one rate-limiting update.
    ///
    /// `now` must come from the same monotonic source on every call. Moves
    /// the output by at most the governing rate scaled by the time elapsed
    /// since the last update that consumed time, clamped to never overshoot
    /// the target. A tick too short to earn a whole microsecond of travel
    /// leaves the elapsed-time accumulator running, so arbitrarily fast
    /// polling still adds up to rate-limited motion. Unbound controllers
    /// only maintain the accumulator.
    pub fn step(
        &mut self,
        now: Instant,
    ) -> Result<(), SweepError<O::Error>> {
        let elapsed = match self.last_tick {
            Some(prev) if now > prev => now - prev,
            _ => Duration::from_ticks(0),
        };
        if self.last_tick.is_none() {
            self.last_tick = Some(now);
        }

        if self.output.is_none() {
            self.last_tick = Some(now);
            return Ok(());
        }

        let remaining = self.target_us as i32 - self.current_us as i32;
        if remaining == 0 {
            // Settled: no redundant writes while at rest.
            self.last_tick = Some(now);
            self.transition(SweepState::Idle);
            return Ok(());
        }

        let budget = rate_budget_us(&self.calib, &self.commanded, elapsed);
        let magnitude = remaining.unsigned_abs().min(budget);
        if magnitude == 0 {
            // Below the output's step resolution: keep accumulating elapsed
            // time until a whole microsecond of travel is earned.
            return Ok(());
        }
        self.last_tick = Some(now);
        let next = if remaining > 0 {
            self.current_us + magnitude as u16
        } else {
            self.current_us - magnitude as u16
        };
        if let Some(output) = self.output.as_mut() {
            output.write_pulse(next).map_err(SweepError::Output)?;
        }
        self.current_us = next;
        self.transition(SweepState::Active);
        if self.current_us == self.target_us {
            self.transition(SweepState::Idle);
        }
        Ok(())
    }

    fn calibrate(
        &mut self,
        clock: &impl Clock,
        angle: f32,
    ) -> Result<(), SweepError<O::Error>> {
        self.commanded = self.configured;

        // Drive to full extent so the mechanical position is known.
        if let Some(output) = self.output.as_mut() {
            output
                .write_pulse(self.calib.max_us)
                .map_err(SweepError::Output)?;
        }
        self.current_us = self.calib.max_us;
        self.target_us = self.calib.max_us;
        self.wait(clock, self.full_travel_time());

        // Rate-limited sweep back to the requested starting angle.
        self.target_us = self.calib.angle_to_pulse(angle);
        self.last_tick = Some(clock.now());
        while self.current_us != self.target_us {
            self.step(clock.now())?;
        }
        self.state = SweepState::Idle;
        Ok(())
    }

    /// Worst-case travel time across the full range at the configured rate.
    fn full_travel_time(&self) -> Duration {
        if !self.configured.is_valid() {
            return Duration::from_ticks(0);
        }
        let intervals = libm::ceilf(self.calib.max_angle / self.configured.angle);
        Duration::from_micros(
            self.configured
                .interval
                .as_micros()
                .saturating_mul(intervals as u64),
        )
    }

    fn wait(
        &self,
        clock: &impl Clock,
        duration: Duration,
    ) {
        let deadline = clock.now() + duration;
        while clock.now() < deadline {}
    }

    fn transition(
        &mut self,
        next: SweepState,
    ) {
        if self.state != next {
            self.state = next;
            tracing::debug!(state = ?next, "sweep transition");
            if !self.suppress_observer {
                if let Some(observer) = self.observer {
                    observer(next);
                }
            }
        }
    }
}

impl<O: ServoOutput> Tickable for SweepServo<O> {
    fn tick(
        &mut self,
        now: Instant,
    ) {
        if let Err(error) = self.step(now) {
            tracing::warn!(?error, "sweep tick failed");
        }
    }
}

/// Pulse budget for one tick: the rate's pulse span per interval, scaled by
/// the elapsed time actually observed. Whole microseconds; smaller motions
/// are below the output's step resolution and count as zero.
fn rate_budget_us(
    calib: &PulseCalibration,
    rate: &SweepSpeed,
    elapsed: Duration,
) -> u32 {
    let interval_us = rate.interval.as_micros();
    if interval_us == 0 {
        return u32::MAX;
    }
    let span = calib.angle_to_span_us(rate.angle) as u64;
    let budget = span * elapsed.as_micros() / interval_us;
    budget.min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_scales_with_elapsed_time() {
        let cal = PulseCalibration::sg90();
        let rate = SweepSpeed::per(18.0, Duration::from_millis(50));
        // 18° is 190µs of pulse on an SG90; a nominal tick grants exactly that.
        assert_eq!(rate_budget_us(&cal, &rate, Duration::from_millis(50)), 190);
        assert_eq!(rate_budget_us(&cal, &rate, Duration::from_millis(25)), 95);
        assert_eq!(rate_budget_us(&cal, &rate, Duration::from_millis(0)), 0);
    }

    #[test]
    fn zero_interval_is_unlimited() {
        let cal = PulseCalibration::sg90();
        let rate = SweepSpeed {
            angle: 18.0,
            interval: Duration::from_ticks(0),
        };
        assert_eq!(
            rate_budget_us(&cal, &rate, Duration::from_millis(1)),
            u32::MAX
        );
    }

    #[test]
    fn speed_validity() {
        assert!(DEFAULT_SPEED.is_valid());
        assert!(!SweepSpeed::per(0.0, Duration::from_millis(50)).is_valid());
        assert!(!SweepSpeed::per(18.0, Duration::from_ticks(0)).is_valid());
    }
}
