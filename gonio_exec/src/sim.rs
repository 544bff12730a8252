//! Simulated goniophotometer rig
//!
//! Steppers move a shared shaft position, interrupters trigger when the shaft passes a configured
//! reference and the light source follows Lambert's cosine law over the polar angle. Used by the
//! `--sim` mode of the executable and by the unit tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

// Internal
use crate::hal::{ReferenceInput, Stepper};
use crate::motion_ctrl::AxisHw;
use crate::sweep::{LightSensor, SensorError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated rig.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimParams {
    /// Shaft position of the theta reference relative to where the shaft starts.
    ///
    /// Units: microsteps
    pub theta_reference_steps: i64,

    /// Shaft position of the phi reference relative to where the shaft starts.
    ///
    /// Units: microsteps
    pub phi_reference_steps: i64,

    /// Illuminance on the source's normal.
    ///
    /// Units: lux
    pub peak_lux: f64,

    /// Constant illuminance added to every reading, e.g. from sensor dark current.
    ///
    /// Units: lux
    pub dark_lux: f64,
}

/// Handle to a simulated motor shaft, shared between a stepper, its interrupter and the light
/// source.
#[derive(Debug, Clone, Default)]
pub struct SimShaft(Rc<RefCell<ShaftState>>);

#[derive(Debug, Default)]
struct ShaftState {
    position: i64,
    steps_taken: u64,
    moves: Vec<i32>,
}

/// Stepper moving a simulated shaft.
pub struct SimStepper {
    shaft: SimShaft,
}

/// Optical interrupter on a simulated shaft.
pub struct SimInterrupter {
    shaft: SimShaft,

    /// Reference position and the number of steps in a revolution, or `None` for an interrupter
    /// which never triggers
    reference: Option<(i64, i64)>,
}

/// Lambertian light source seen by a sensor on the theta arm.
pub struct SimLightSource {
    theta_shaft: SimShaft,
    theta_zero_steps: i64,
    theta_degrees_per_step: f64,
    peak_lux: f64,
    dark_lux: f64,
}

/// Hardware of a complete simulated rig.
pub struct SimRig {
    pub theta_hw: AxisHw<SimStepper, SimInterrupter>,
    pub phi_hw: AxisHw<SimStepper, SimInterrupter>,
    pub light_source: SimLightSource,

    pub theta_shaft: SimShaft,
    pub phi_shaft: SimShaft,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            theta_reference_steps: 3,
            phi_reference_steps: -2,
            peak_lux: 1000.0,
            dark_lux: 0.0,
        }
    }
}

impl SimShaft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute position of the shaft in microsteps.
    pub fn position(&self) -> i64 {
        self.0.borrow().position
    }

    /// Total number of microsteps taken in either direction.
    pub fn steps_taken(&self) -> u64 {
        self.0.borrow().steps_taken
    }

    /// Every call made to the stepper, in order.
    pub fn moves(&self) -> Vec<i32> {
        self.0.borrow().moves.clone()
    }

    fn step(&self, steps: i32) {
        let mut s = self.0.borrow_mut();
        s.position += steps as i64;
        s.steps_taken += steps.unsigned_abs() as u64;
        s.moves.push(steps);
    }
}

impl SimStepper {
    pub fn new(shaft: &SimShaft) -> Self {
        Self {
            shaft: shaft.clone(),
        }
    }
}

impl Stepper for SimStepper {
    fn step(&mut self, steps: i32) {
        self.shaft.step(steps);
    }
}

impl SimInterrupter {
    /// Interrupter triggering whenever the shaft is at `reference_steps` modulo a revolution.
    pub fn at(shaft: &SimShaft, reference_steps: i64, steps_per_rev: i64) -> Self {
        Self {
            shaft: shaft.clone(),
            reference: Some((reference_steps, steps_per_rev.max(1))),
        }
    }

    /// Interrupter which never triggers, e.g. a disconnected sensor.
    pub fn never(shaft: &SimShaft) -> Self {
        Self {
            shaft: shaft.clone(),
            reference: None,
        }
    }
}

impl ReferenceInput for SimInterrupter {
    fn is_triggered(&mut self) -> bool {
        match self.reference {
            Some((r, spr)) => self.shaft.position().rem_euclid(spr) == r.rem_euclid(spr),
            None => false,
        }
    }
}

impl SimLightSource {
    /// Illuminance the sensor would see right now, before any dark offset is removed.
    pub fn illuminance(&self) -> f64 {
        let theta_deg =
            (self.theta_shaft.position() - self.theta_zero_steps) as f64 * self.theta_degrees_per_step;

        self.dark_lux + self.peak_lux * theta_deg.to_radians().cos().max(0.0)
    }
}

impl LightSensor for SimLightSource {
    fn read_illuminance(&mut self) -> Result<f64, SensorError> {
        Ok(self.illuminance())
    }
}

impl SimRig {
    /// Build a simulated rig.
    ///
    /// ## Arguments
    /// - `params` - Reference positions and light source of the simulation
    /// - `theta_steps_per_rev` - Number of microsteps in a theta revolution
    /// - `phi_steps_per_rev` - Number of microsteps in a phi revolution
    /// - `theta_degrees_per_step` - Angle of one theta microstep
    pub fn new(
        params: &SimParams,
        theta_steps_per_rev: i64,
        phi_steps_per_rev: i64,
        theta_degrees_per_step: f64,
    ) -> Self {
        let theta_shaft = SimShaft::new();
        let phi_shaft = SimShaft::new();

        Self {
            theta_hw: AxisHw {
                stepper: SimStepper::new(&theta_shaft),
                reference: SimInterrupter::at(
                    &theta_shaft,
                    params.theta_reference_steps,
                    theta_steps_per_rev,
                ),
            },
            phi_hw: AxisHw {
                stepper: SimStepper::new(&phi_shaft),
                reference: SimInterrupter::at(
                    &phi_shaft,
                    params.phi_reference_steps,
                    phi_steps_per_rev,
                ),
            },
            light_source: SimLightSource {
                theta_shaft: theta_shaft.clone(),
                theta_zero_steps: params.theta_reference_steps,
                theta_degrees_per_step,
                peak_lux: params.peak_lux,
                dark_lux: params.dark_lux,
            },
            theta_shaft,
            phi_shaft,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shaft_tracks_steps() {
        let shaft = SimShaft::new();
        let mut stepper = SimStepper::new(&shaft);

        stepper.step(5);
        stepper.step(-7);

        assert_eq!(shaft.position(), -2);
        assert_eq!(shaft.steps_taken(), 12);
        assert_eq!(shaft.moves(), vec![5, -7]);
    }

    #[test]
    fn test_interrupter_wraps_revolution() {
        let shaft = SimShaft::new();
        let mut stepper = SimStepper::new(&shaft);
        let mut int = SimInterrupter::at(&shaft, -2, 20);

        assert!(!int.is_triggered());
        stepper.step(18);
        assert!(int.is_triggered());
        stepper.step(-20);
        assert!(int.is_triggered());
        stepper.step(1);
        assert!(!int.is_triggered());

        assert!(!SimInterrupter::never(&shaft).is_triggered());
    }

    #[test]
    fn test_lambertian_source() {
        let params = SimParams {
            theta_reference_steps: 2,
            dark_lux: 5.0,
            peak_lux: 100.0,
            ..SimParams::default()
        };
        let mut rig = SimRig::new(&params, 20, 20, 18.0);

        // Shaft at the theta reference sees the peak
        rig.theta_hw.stepper.step(2);
        assert!((rig.light_source.read_illuminance().unwrap() - 105.0).abs() < 1e-9);

        // 90 degrees off the normal only the dark reading is left
        rig.theta_hw.stepper.step(5);
        assert!((rig.light_source.read_illuminance().unwrap() - 5.0).abs() < 1e-9);

        // Beyond the horizon the source is not visible
        rig.theta_hw.stepper.step(2);
        assert!((rig.light_source.read_illuminance().unwrap() - 5.0).abs() < 1e-9);
    }
}
