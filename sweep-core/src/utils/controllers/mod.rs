//! Module Exports
//!
//! This file exports the sweep-control modules and the command dispatch layer.
//!
//! - `sweep`: rate-limited sweep state machine for a single servo
//! - `pca`: PCA9685-backed PWM output channels over a shared I2C bus

pub mod pca;
pub mod sweep;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::utils::sched::Tickable;
use sweep::{ServoOutput, SweepError, SweepServo, SweepSpeed};

/// Channel used to receive servo commands (`ServoCommand` messages).
pub static SERVO_CHANNEL: embassy_sync::channel::Channel<CriticalSectionRawMutex, ServoCommand, 16> =
    embassy_sync::channel::Channel::new();

/// Servo command variants for motion control and status queries.
///
/// Serialized as JSON with tag `"sc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(tag = "sc", rename_all = "snake_case")]
pub enum ServoCommand {
    /// Sweep channel `ch` to angle `a`, optionally at `d` degrees per `ms`
    /// milliseconds. Omitting the rate reuses the configured one.
    S {
        ch: u8,
        a: f32,
        d: Option<f32>,
        ms: Option<u64>,
    },
    /// Set the configured rate of channel `ch` to `d` degrees per `ms` ms.
    R { ch: u8, d: f32, ms: u64 },
    /// Log the tracked angle and motion state of channel `ch`.
    Q { ch: u8 },
}

/// Bank of sweep controllers driven from one scheduling context.
///
/// On every tick the bank first drains `SERVO_CHANNEL` — a pending command is
/// consumed by the next tick, which is what makes a mid-motion command an
/// immediate redirect — and then steps each servo.
pub struct ServoController<O: ServoOutput, const N: usize> {
    servos: heapless::Vec<SweepServo<O>, N>,
}

impl<O: ServoOutput, const N: usize> ServoController<O, N> {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self {
            servos: heapless::Vec::new(),
        }
    }

    /// Add a servo; its channel number is its index in insertion order.
    ///
    /// Returns the servo back when all `N` slots are taken.
    pub fn push(
        &mut self,
        servo: SweepServo<O>,
    ) -> Result<(), SweepServo<O>> {
        self.servos.push(servo)
    }

    /// Borrow the servo on `channel`.
    pub fn servo(
        &mut self,
        channel: u8,
    ) -> Result<&mut SweepServo<O>, SweepError<O::Error>> {
        self.servos
            .get_mut(channel as usize)
            .ok_or(SweepError::UnknownChannel(channel))
    }

    /// Execute an incoming `ServoCommand`.
    pub fn execute(
        &mut self,
        command: ServoCommand,
    ) -> Result<(), SweepError<O::Error>> {
        match command {
            ServoCommand::S { ch, a, d, ms } => {
                let rate = match (d, ms) {
                    (Some(d), Some(ms)) => {
                        Some(SweepSpeed::per(d, Duration::from_millis(ms)))
                    }
                    _ => None,
                };
                self.servo(ch)?.sweep(a, rate);
                Ok(())
            }
            ServoCommand::R { ch, d, ms } => {
                self.servo(ch)?
                    .set_speed(SweepSpeed::per(d, Duration::from_millis(ms)));
                Ok(())
            }
            ServoCommand::Q { ch } => {
                let servo = self.servo(ch)?;
                tracing::info!(
                    channel = ch,
                    angle = servo.angle(),
                    state = ?servo.state(),
                    "servo status"
                );
                Ok(())
            }
        }
    }

    /// Step every servo in the bank, logging failures.
    pub fn service(
        &mut self,
        now: Instant,
    ) {
        for (channel, servo) in self.servos.iter_mut().enumerate() {
            if let Err(error) = servo.step(now) {
                tracing::warn!(channel, ?error, "servo step failed");
            }
        }
    }
}

impl<O: ServoOutput, const N: usize> Default for ServoController<O, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ServoOutput, const N: usize> Tickable for ServoController<O, N> {
    fn tick(
        &mut self,
        now: Instant,
    ) {
        while let Ok(command) = SERVO_CHANNEL.try_receive() {
            tracing::debug!(?command, "received servo command");
            if let Err(error) = self.execute(command) {
                tracing::warn!(?error, "servo command failed");
            }
        }
        self.service(now);
    }
}
