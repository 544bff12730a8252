//! # Goniophotometer Executable Parameters
//!
//! This module provides parameters for the goniophotometer executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::motion_ctrl::{whole_steps, Axis, MotionCtrlError, MotionParams};
use crate::sim::SimParams;
use crate::sweep::SweepParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GonioExecParams {
    /// Polar axis
    pub theta: AxisParams,

    /// Azimuthal axis
    pub phi: AxisParams,

    /// Settle delays, search timing and polar range
    #[serde(default)]
    pub motion: MotionParams,

    /// Sweep budget, dark offset and reference search directions
    #[serde(default)]
    pub sweep: SweepParams,

    /// Number of times calibration is attempted before giving up
    #[serde(default = "default_max_calibration_attempts")]
    pub max_calibration_attempts: u32,

    /// Drive the rig back to its reference once the sweep ends
    #[serde(default = "default_park_on_end")]
    pub park_on_end: bool,

    /// Simulated rig, used with `--sim`
    #[serde(default)]
    pub sim: SimParams,

    /// GPIO assignments of the real rig
    #[serde(default)]
    pub pins: PinParams,

    /// Light sensor of the real rig
    #[serde(default)]
    pub sensor: SensorParams,
}

/// Angular configuration of one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisParams {
    /// Angle of one motor microstep.
    ///
    /// Units: degrees
    pub degrees_per_step: f64,

    /// Angle between two samples.
    ///
    /// Units: degrees
    pub degrees_per_sample: f64,
}

/// BCM GPIO numbers of the rig's connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinParams {
    /// Coil driver inputs of the theta motor, in phase order
    pub theta_coils: [u8; 4],

    /// Coil driver inputs of the phi motor, in phase order
    pub phi_coils: [u8; 4],

    /// Theta optical interrupter output
    pub theta_reference: u8,

    /// Phi optical interrupter output
    pub phi_reference: u8,

    /// Whether the interrupters drive their output high at the reference
    pub reference_active_high: bool,
}

/// Lux meter read through an MCP342x ADC.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorParams {
    /// Bus address of the ADC
    pub i2c_address: u8,

    /// Output scale of the lux meter
    ///
    /// Units: lux per volt
    pub lux_per_volt: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AxisParams {
    /// Number of microsteps in one revolution of the axis.
    pub fn steps_per_rev(&self) -> Option<i32> {
        whole_steps(360.0, self.degrees_per_step).filter(|&s| s > 0)
    }

    /// Number of microsteps the axis advances by per sample.
    pub fn resolution(&self, axis: Axis) -> Result<u32, MotionCtrlError> {
        if !self.degrees_per_step.is_finite() || self.degrees_per_step <= 0.0 {
            return Err(MotionCtrlError::InvalidDegreesPerStep(
                axis,
                self.degrees_per_step,
            ));
        }

        let res = (self.degrees_per_sample / self.degrees_per_step).round();

        if res.is_finite() && res >= 1.0 && res <= u32::MAX as f64 {
            Ok(res as u32)
        } else {
            Err(MotionCtrlError::InvalidResolution(axis, 0))
        }
    }
}

impl Default for PinParams {
    fn default() -> Self {
        Self {
            theta_coils: [5, 6, 13, 19],
            phi_coils: [12, 16, 20, 21],
            theta_reference: 26,
            phi_reference: 17,
            reference_active_high: true,
        }
    }
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            i2c_address: crate::hal::mcp342x::DEFAULT_ADDRESS,
            lux_per_volt: 1.0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_max_calibration_attempts() -> u32 {
    3
}

fn default_park_on_end() -> bool {
    true
}
