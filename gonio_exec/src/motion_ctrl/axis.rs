//! Per-axis state of the motion controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{MotionCtrlError, FIRST_DIRECTION, STEP_COUNT_TOLERANCE};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The two axes of the goniophotometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Polar (elevation) axis
    Theta,

    /// Azimuthal axis
    Phi,
}

/// Turn direction of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Configuration and step counting for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisState {
    /// Physical angle of one motor microstep.
    ///
    /// Units: degrees
    pub degrees_per_step: f64,

    /// Number of microsteps advanced per sample tick.
    pub resolution: i32,

    /// Number of microsteps in a full revolution of the axis.
    pub steps_per_rev: i32,

    /// Current sweep direction.
    pub direction: Direction,

    /// Signed step count since the axis was initialised or referenced.
    pub position: i32,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Direction {
    /// The sign of a step taken in this direction.
    pub fn signum(self) -> i32 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

impl AxisState {
    /// Create the state for an axis at position zero, sweeping in the first direction.
    ///
    /// `degrees_per_step` must divide 360 into a whole number of steps and `resolution` must be
    /// between 1 and the number of steps in a revolution.
    pub fn new(axis: Axis, degrees_per_step: f64, resolution: u32) -> Result<Self, MotionCtrlError> {
        let steps_per_rev = whole_steps(360.0, degrees_per_step)
            .filter(|&spr| spr > 0)
            .filter(|&spr| {
                (360.0 / degrees_per_step - spr as f64).abs() < STEP_COUNT_TOLERANCE
            })
            .ok_or(MotionCtrlError::InvalidDegreesPerStep(axis, degrees_per_step))?;

        if resolution == 0 || resolution as i64 > steps_per_rev as i64 {
            return Err(MotionCtrlError::InvalidResolution(axis, resolution));
        }

        Ok(Self {
            degrees_per_step,
            resolution: resolution as i32,
            steps_per_rev,
            direction: FIRST_DIRECTION,
            position: 0,
        })
    }

    /// The signed step delta of one sample tick in the current direction.
    pub fn tick_delta(&self) -> i32 {
        self.direction.signum() * self.resolution
    }

    /// Current position of the axis.
    ///
    /// Units: degrees
    pub fn position_deg(&self) -> f64 {
        self.position as f64 * self.degrees_per_step
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Number of whole steps of `degrees_per_step` contained in `angle_deg`.
///
/// Quotients within [`STEP_COUNT_TOLERANCE`] of a whole number are rounded to it, so that
/// `360 / 1.8` is 200 steps rather than 199. Other quotients are truncated. Returns `None` if
/// `degrees_per_step` is not a positive finite number or the result does not fit in an `i32`.
pub fn whole_steps(angle_deg: f64, degrees_per_step: f64) -> Option<i32> {
    if !degrees_per_step.is_finite() || degrees_per_step <= 0.0 || !angle_deg.is_finite() {
        return None;
    }

    let quotient = angle_deg / degrees_per_step;
    let steps = if (quotient - quotient.round()).abs() < STEP_COUNT_TOLERANCE {
        quotient.round()
    } else {
        quotient.trunc()
    };

    if steps.abs() > i32::MAX as f64 {
        None
    } else {
        Some(steps as i32)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_whole_steps() {
        assert_eq!(whole_steps(360.0, 18.0), Some(20));
        assert_eq!(whole_steps(90.0, 18.0), Some(5));
        assert_eq!(whole_steps(360.0, 1.8), Some(200));
        assert_eq!(whole_steps(90.0, 0.17578125), Some(512));
        assert_eq!(whole_steps(100.0, 18.0), Some(5));
        assert_eq!(whole_steps(360.0, 0.0), None);
        assert_eq!(whole_steps(360.0, -1.8), None);
        assert_eq!(whole_steps(360.0, f64::NAN), None);
    }

    #[test]
    fn test_axis_state_new() {
        let a = AxisState::new(Axis::Phi, 1.8, 5).unwrap();
        assert_eq!(a.steps_per_rev, 200);
        assert_eq!(a.resolution, 5);
        assert_eq!(a.position, 0);
        assert_eq!(a.direction, Direction::Clockwise);
        assert_eq!(a.tick_delta(), 5);

        assert_eq!(
            AxisState::new(Axis::Theta, 7.0, 1),
            Err(MotionCtrlError::InvalidDegreesPerStep(Axis::Theta, 7.0))
        );
        assert_eq!(
            AxisState::new(Axis::Theta, 0.0, 1),
            Err(MotionCtrlError::InvalidDegreesPerStep(Axis::Theta, 0.0))
        );
        assert_eq!(
            AxisState::new(Axis::Phi, 18.0, 0),
            Err(MotionCtrlError::InvalidResolution(Axis::Phi, 0))
        );
        assert_eq!(
            AxisState::new(Axis::Phi, 18.0, 21),
            Err(MotionCtrlError::InvalidResolution(Axis::Phi, 21))
        );
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::Clockwise.signum(), 1);
        assert_eq!(Direction::CounterClockwise.signum(), -1);
        assert_eq!(Direction::Clockwise.reversed(), Direction::CounterClockwise);
        assert_eq!(Direction::CounterClockwise.reversed(), Direction::Clockwise);
    }
}
