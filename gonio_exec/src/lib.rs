//! # Goniophotometer library.
//!
//! This library contains the motion core of the goniophotometer along with the hardware
//! abstractions it is driven through and the measurement sweep which strings it all together.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Motion control - coordinates the theta and phi steppers and finds the reference positions
pub mod motion_ctrl;

/// Hardware abstraction - stepper, reference input and delay capabilities and their adapters
pub mod hal;

/// Measurement sweep - calibrates the rig then samples the light sensor over the hemisphere
pub mod sweep;

/// Photometry - luminous intensity, luminous flux and beam widths from the sweep samples
pub mod photometry;

/// Executable parameters - axis angles, timing, calibration and hardware assignments
pub mod params;

/// Simulated rig - steppers, interrupters and a light source with no hardware attached
pub mod sim;

/// Raspberry Pi GPIO bindings for the rig
#[cfg(all(target_arch = "arm", target_os = "linux"))]
pub mod rpi;
