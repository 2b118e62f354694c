//! Non-blocking sweep control for hobby servos on no-std embedded platforms.
//!
//! For a runnable host-side demo, see the `mock-mcu` binary in this workspace.
#![no_std]

pub mod utils;
