//! Utility re-exports and helper macros for the sweep-servo stack.
//!
//! This module re-exports the sweep controllers, calibration math, timing,
//! and the cooperative scheduler:
//!
//! - `controllers`: sweep state machine, command dispatch, PCA9685 binding
//! - `math`: pulse-width calibration for position actuators
//! - `sched`: tick scheduler driving periodic components
//! - `time`: injectable monotonic clock source
//!
//! The `mk_static!` macro simplifies static initialization in no-std contexts.

pub mod controllers;
pub mod math;
pub mod sched;
pub mod time;

pub use controllers::ServoController;
pub use controllers::sweep::{SweepServo, SweepState};
pub use embassy_time::*;
pub use math::calib::PulseCalibration;

#[macro_export]
/// Initialize a no-std static cell and write the given value into it.
///
/// This macro creates a `static_cell::StaticCell` for type `$t` and initializes
/// it with `$val`, returning a mutable reference to the stored value.
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        STATIC_CELL.uninit().write($val)
    }};
}
