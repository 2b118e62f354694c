//! PCA9685 PWM output channels for sweep servos.
//!
//! One [`PcaChannel`] exposes a single channel of a PCA9685 16-channel PWM
//! controller as a [`ServoOutput`]. Channels share the I2C bus through a
//! `RefCell`, so several servos can hang off the same chip.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use embedded_hal_bus::i2c::RefCellDevice;
use pwm_pca9685::{Address as PwmAddress, Channel, Error as PwmError, Pca9685};

use super::sweep::ServoOutput;

/// Factory-default I2C address of a PCA9685 servo board.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Servo frame length at 50 Hz.
const FRAME_US: u32 = 20_000;
/// 12-bit counter resolution.
const MAX_COUNT: u32 = 4096;
/// 25 MHz internal oscillator / (4096 * 50 Hz) - 1.
const PRESCALE_50HZ: u8 = 121;

/// Convert a pulse width in microseconds to PCA9685 off-counts.
///
/// At 50 Hz and 12 bits, the usable SG90 range of 500–2400 µs maps to counts
/// 102–491, so one count is just under 5 µs of pulse.
pub fn pulse_to_counts(pulse_us: u16) -> u16 {
    (pulse_us as u32 * MAX_COUNT / FRAME_US) as u16
}

/// A single PCA9685 channel driving one servo.
pub struct PcaChannel<'a, I2C: 'static> {
    pwm: Pca9685<RefCellDevice<'a, I2C>>,
    channel: Channel,
}

impl<'a, I2C, E> PcaChannel<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    /// Open `channel` of the PCA9685 at `address` on the shared bus.
    pub fn new(
        bus: &'a RefCell<I2C>,
        address: u8,
        channel: Channel,
    ) -> Result<Self, PwmError<E>> {
        let pwm = Pca9685::new(RefCellDevice::new(bus), PwmAddress::from(address))?;
        Ok(Self { pwm, channel })
    }

    /// Configure and enable the PWM controller for 50 Hz servo frames.
    ///
    /// Run once per chip before attaching servos to its channels.
    pub fn configure(&mut self) -> Result<(), PwmError<E>> {
        self.pwm.enable()?;
        tracing::info!("PWM enabled");
        self.pwm.set_prescale(PRESCALE_50HZ)?;
        tracing::info!("PWM prescale set to 50Hz");
        Ok(())
    }
}

impl<'a, I2C, E> ServoOutput for PcaChannel<'a, I2C>
where
    I2C: I2c<Error = E> + 'static,
    E: core::fmt::Debug,
{
    type Error = PwmError<E>;

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.pwm.enable()
    }

    fn write_pulse(
        &mut self,
        pulse_us: u16,
    ) -> Result<(), Self::Error> {
        self.pwm
            .set_channel_on_off(self.channel, 0, pulse_to_counts(pulse_us))
    }
}
