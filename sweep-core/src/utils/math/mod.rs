/// Pulse-width calibration for position actuators.
pub mod calib;
