//! Pulse-width calibration for position actuators.
//!
//! Hobby servos are commanded with a pulse width in microseconds; the
//! `PulseCalibration` struct maps that range linearly onto degrees and back.
//!
//! # Example
//! ```rust
//! use sweep_core::utils::math::calib::PulseCalibration;
//! let cal = PulseCalibration::sg90();
//! assert_eq!(cal.angle_to_pulse(90.0), 1450);
//! ```

use libm;

/// Linear mapping between angular position (degrees) and pulse width (µs).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseCalibration {
    /// Pulse width commanding the minimum (0°) position.
    pub min_us: u16,
    /// Pulse width commanding the maximum position.
    pub max_us: u16,
    /// Angle at the maximum position, in degrees.
    pub max_angle: f32,
}

impl PulseCalibration {
    /// Instantiate with explicit pulse bounds and travel.
    ///
    /// `min_us` must be below `max_us` and `max_angle` positive; both are
    /// debug-asserted, matching how far a miswired table can be trusted.
    pub fn new(
        min_us: u16,
        max_us: u16,
        max_angle: f32,
    ) -> Self {
        debug_assert!(min_us < max_us);
        debug_assert!(max_angle > 0.0);
        Self {
            min_us,
            max_us,
            max_angle,
        }
    }

    /// Calibration for the ubiquitous SG90 micro servo: 500–2400 µs over 180°.
    pub const fn sg90() -> Self {
        Self {
            min_us: 500,
            max_us: 2400,
            max_angle: 180.0,
        }
    }

    /// Full addressable pulse span in microseconds.
    pub fn span_us(&self) -> u16 {
        self.max_us - self.min_us
    }

    /// Convert an angle to the nearest addressable pulse width.
    ///
    /// Angles outside `[0, max_angle]` are clamped to the nearest extreme.
    pub fn angle_to_pulse(
        &self,
        angle: f32,
    ) -> u16 {
        let a = angle.clamp(0.0, self.max_angle);
        let offset = libm::roundf(a / self.max_angle * self.span_us() as f32);
        self.min_us + offset as u16
    }

    /// Recover the angle a pulse width commands.
    pub fn pulse_to_angle(
        &self,
        pulse_us: u16,
    ) -> f32 {
        let p = pulse_us.clamp(self.min_us, self.max_us);
        (p - self.min_us) as f32 / self.span_us() as f32 * self.max_angle
    }

    /// Pulse span equivalent to an angular travel, rounded to whole µs.
    ///
    /// This is the quantity the rate limiter budgets per interval.
    pub fn angle_to_span_us(
        &self,
        angle: f32,
    ) -> u32 {
        let a = angle.clamp(0.0, self.max_angle);
        libm::roundf(a / self.max_angle * self.span_us() as f32) as u32
    }
}

impl Default for PulseCalibration {
    fn default() -> Self {
        Self::sg90()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sg90_endpoints() {
        let cal = PulseCalibration::sg90();
        assert_eq!(cal.angle_to_pulse(0.0), 500);
        assert_eq!(cal.angle_to_pulse(180.0), 2400);
        assert_eq!(cal.angle_to_pulse(90.0), 1450);
    }

    #[test]
    fn clamps_out_of_range_angles() {
        let cal = PulseCalibration::sg90();
        assert_eq!(cal.angle_to_pulse(-45.0), 500);
        assert_eq!(cal.angle_to_pulse(720.0), 2400);
    }

    #[test]
    fn pulse_round_trip() {
        let cal = PulseCalibration::sg90();
        for angle in [0.0f32, 18.0, 45.0, 90.0, 135.0, 180.0] {
            let pulse = cal.angle_to_pulse(angle);
            let back = cal.pulse_to_angle(pulse);
            // One µs of pulse is just under 0.1° on an SG90.
            assert!((back - angle).abs() < 0.1, "angle {} -> {}", angle, back);
        }
    }

    #[test]
    fn span_for_rate_limiting() {
        let cal = PulseCalibration::sg90();
        // 18° of a 180° / 1900µs servo is 190µs of pulse.
        assert_eq!(cal.angle_to_span_us(18.0), 190);
        assert_eq!(cal.angle_to_span_us(0.0), 0);
        assert_eq!(cal.angle_to_span_us(-5.0), 0);
    }

    #[test]
    fn custom_table() {
        let cal = PulseCalibration::new(1000, 2000, 90.0);
        assert_eq!(cal.span_us(), 1000);
        assert_eq!(cal.angle_to_pulse(45.0), 1500);
        assert!((cal.pulse_to_angle(1250) - 22.5).abs() < 1e-3);
    }
}
