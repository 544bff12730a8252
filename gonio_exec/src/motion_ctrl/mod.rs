//! Motion control module
//!
//! Coordinates the polar (theta) and azimuthal (phi) steppers of the goniophotometer. Each call to
//! [`MotionCtrl::advance_tick`] moves the rig on to the next sample position of a raster scan over
//! the hemisphere: phi sweeps back and forth through a full revolution for every theta increment,
//! and theta alone is moved at its start and limit positions. Before a sweep the reference
//! position of each axis is found with [`MotionCtrl::search_reference`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod axis;
mod params;
mod search;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use axis::*;
pub use params::*;
pub use search::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The direction both axes start sweeping in.
pub const FIRST_DIRECTION: Direction = Direction::Clockwise;

/// The direction phi travels in on its way back to position zero.
pub const RETURN_DIRECTION: Direction = Direction::CounterClockwise;

/// Allowed distance of `360 / degrees_per_step` from a whole number of steps.
pub const STEP_COUNT_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during MotionCtrl operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MotionCtrlError {
    #[error("The {0:?} axis has not been initialised")]
    AxisNotInitialised(Axis),

    #[error(
        "Invalid degrees per step for the {0:?} axis ({1}), must be positive and divide a \
         revolution into a whole number of steps"
    )]
    InvalidDegreesPerStep(Axis, f64),

    #[error(
        "Invalid resolution for the {0:?} axis ({1} steps per sample), must be between 1 and the \
         number of steps in a revolution"
    )]
    InvalidResolution(Axis, u32),

    #[error("Invalid polar angle limit ({0} degrees), must be at least one theta step")]
    InvalidPolarLimit(f64),
}
