//! Measurement sweep module
//!
//! Drives a [`MotionCtrl`](crate::motion_ctrl::MotionCtrl) through a complete excursion, reading
//! a [`LightSensor`] at every sample position and handing the resulting [`Sample`]s to a
//! [`SampleSink`]. The luminous flux and beam widths of the source are worked out from the
//! samples once the sweep ends.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use util::archive::{ArchiveError, Archiver};

// Internal
use crate::motion_ctrl::{Axis, Direction, MotionCtrlError};
pub use state::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A sensor measuring the illuminance at the rig's sample position.
pub trait LightSensor {
    /// Take a single raw reading.
    ///
    /// Units: lux
    fn read_illuminance(&mut self) -> Result<f64, SensorError>;
}

/// Destination of the samples recorded during a sweep.
pub trait SampleSink {
    /// Store one sample. Samples arrive in index order.
    fn record(&mut self, sample: &Sample) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single measurement at one rig position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Index of the sample within its sweep, starting at zero.
    pub index: u64,

    pub theta_steps: i32,
    pub phi_steps: i32,

    /// Units: degrees
    pub theta_deg: f64,

    /// Units: degrees
    pub phi_deg: f64,

    /// Reading with the dark offset removed.
    ///
    /// Units: lux
    pub illuminance_lux: f64,

    /// Luminous intensity of the source towards the sensor.
    ///
    /// Units: candela
    pub intensity_cd: f64,
}

/// Parameters of a measurement sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweepParams {
    /// Maximum number of ticks a sweep may take before it is aborted.
    pub max_ticks: u64,

    /// Reading of the sensor in darkness, subtracted from every sample.
    ///
    /// Units: lux
    pub dark_offset_lux: f64,

    /// Distance from the source to the sensor, used to turn illuminance into intensity.
    ///
    /// Units: meters
    pub sensor_distance_m: f64,

    /// Direction each axis starts its reference search in.
    pub theta_search_direction: Direction,
    pub phi_search_direction: Direction,
}

/// Summary of a completed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepReport {
    pub num_samples: u64,
    pub num_ticks: u64,

    /// Units: seconds
    pub duration_s: f64,

    /// Total luminous flux of the source, `None` if the samples could not be integrated.
    ///
    /// Units: lumen
    pub luminous_flux_lm: Option<f64>,

    /// Full width at half maximum in the horizontal plane.
    ///
    /// Units: degrees
    pub h_fwhm_deg: f64,

    /// Full width at half maximum in the vertical plane.
    ///
    /// Units: degrees
    pub v_fwhm_deg: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by a [`LightSensor`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("Could not read the light sensor: {0}")]
    ReadFailed(String),

    #[error("The light sensor returned a non-finite reading ({0})")]
    NonFiniteReading(f64),
}

/// Errors which can occur during a sweep.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Motion control error: {0}")]
    MotionCtrlError(#[from] MotionCtrlError),

    #[error("Light sensor error: {0}")]
    SensorError(#[from] SensorError),

    #[error("Could not record a sample: {0}")]
    SinkError(#[from] ArchiveError),

    #[error("The {0:?} reference could not be found")]
    ReferenceNotFound(Axis),

    #[error("The sweep did not end within {0} ticks")]
    TickBudgetExceeded(u64),

    #[error("Invalid sensor distance of {0} m, expected a positive distance")]
    InvalidSensorDistance(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            max_ticks: 1_000_000,
            dark_offset_lux: 0.0,
            sensor_distance_m: 1.0,
            theta_search_direction: Direction::Clockwise,
            phi_search_direction: Direction::Clockwise,
        }
    }
}

impl SampleSink for Vec<Sample> {
    fn record(&mut self, sample: &Sample) -> Result<(), ArchiveError> {
        self.push(*sample);
        Ok(())
    }
}

impl SampleSink for Archiver {
    fn record(&mut self, sample: &Sample) -> Result<(), ArchiveError> {
        self.serialise(sample)
    }
}
