//! Parameters structure for MotionCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timing and range parameters for motion control.
///
/// Missing fields in a parameter file take the values from [`MotionParams::default`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionParams {
    // ---- SETTLING ----
    /// Time to wait after each phi step.
    ///
    /// Units: milliseconds
    pub phi_settle_delay_ms: u32,

    /// Time to wait after each individual theta microstep.
    ///
    /// Units: milliseconds
    pub theta_settle_delay_ms: u32,

    // ---- REFERENCE SEARCH ----
    /// Time to wait after each microstep of a reference search.
    ///
    /// Units: milliseconds
    pub search_step_delay_ms: u32,

    /// Pause before scanning in the opposite direction when the reference was not found.
    ///
    /// Units: milliseconds
    pub search_retry_pause_ms: u32,

    // ---- RANGE ----
    /// Polar angle at which the theta excursion ends.
    ///
    /// Units: degrees
    pub polar_angle_limit_deg: f64,

    // ---- MOTORS ----
    /// Speed of the stepper motors.
    ///
    /// Units: revolutions per minute
    pub motor_speed_rpm: u32,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            phi_settle_delay_ms: 100,
            theta_settle_delay_ms: 250,
            search_step_delay_ms: 250,
            search_retry_pause_ms: 1000,
            polar_angle_limit_deg: 90.0,
            motor_speed_rpm: 1,
        }
    }
}

impl MotionParams {
    /// Parameters with every delay set to zero, for simulations and tests.
    pub fn without_delays(polar_angle_limit_deg: f64) -> Self {
        Self {
            phi_settle_delay_ms: 0,
            theta_settle_delay_ms: 0,
            search_step_delay_ms: 0,
            search_retry_pause_ms: 0,
            polar_angle_limit_deg,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params_use_defaults() {
        let p: MotionParams =
            util::params::from_str("polar_angle_limit_deg = 45.0\nphi_settle_delay_ms = 10")
                .unwrap();

        assert_eq!(p.polar_angle_limit_deg, 45.0);
        assert_eq!(p.phi_settle_delay_ms, 10);
        assert_eq!(p.theta_settle_delay_ms, 250);
        assert_eq!(p.search_retry_pause_ms, 1000);
        assert_eq!(p.motor_speed_rpm, 1);
    }
}
