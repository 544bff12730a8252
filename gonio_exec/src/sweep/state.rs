//! Implementations for the Sweep state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, trace, warn};

// Internal
use super::{LightSensor, Sample, SampleSink, SensorError, SweepError, SweepParams, SweepReport};
use crate::hal::{ReferenceInput, Stepper};
use crate::motion_ctrl::{Axis, AxisState, MotionCtrl, MotionCtrlError, SearchOutcome};
use crate::photometry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A measurement sweep over the rig's hemisphere.
pub struct Sweep<S, I, D, L> {
    params: SweepParams,
    motion: MotionCtrl<S, I, D>,
    sensor: L,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S, I, D, L> Sweep<S, I, D, L>
where
    S: Stepper,
    I: ReferenceInput,
    D: DelayMs<u32>,
    L: LightSensor,
{
    /// Create a new sweep. Both axes of `motion` must already be initialised.
    pub fn new(params: SweepParams, motion: MotionCtrl<S, I, D>, sensor: L) -> Self {
        Self {
            params,
            motion,
            sensor,
        }
    }

    pub fn motion(&self) -> &MotionCtrl<S, I, D> {
        &self.motion
    }

    pub fn motion_mut(&mut self) -> &mut MotionCtrl<S, I, D> {
        &mut self.motion
    }

    /// Find the reference position of theta and then phi.
    pub fn calibrate(&mut self) -> Result<(), SweepError> {
        let searches = [
            (Axis::Theta, self.params.theta_search_direction),
            (Axis::Phi, self.params.phi_search_direction),
        ];

        for &(axis, direction) in searches.iter() {
            match self.motion.search_reference(axis, direction)? {
                SearchOutcome::Found { steps } => {
                    debug!("{:?} calibrated in {} steps", axis, steps)
                }
                SearchOutcome::NotFound { .. } => return Err(SweepError::ReferenceNotFound(axis)),
            }
        }

        info!("Calibration complete");

        Ok(())
    }

    /// Run a complete sweep, recording every sample into `sink`.
    ///
    /// A sample is taken at the start position and after every tick until the end of the
    /// measure. If a previous sweep has already ended the rig is parked and reset first. The
    /// report carries the luminous flux and beam widths worked out from the samples.
    pub fn run<K: SampleSink>(&mut self, sink: &mut K) -> Result<SweepReport, SweepError> {
        let distance = self.params.sensor_distance_m;
        if !distance.is_finite() || distance <= 0.0 {
            return Err(SweepError::InvalidSensorDistance(distance));
        }

        if self.motion.end_of_measure() {
            info!("Previous sweep complete, parking before starting again");
            self.motion.park()?;
            self.motion.reset()?;
        }

        let start_time = Utc::now();
        let mut samples: Vec<Sample> = vec![];
        let mut num_ticks = 0u64;

        info!("Starting sweep");

        samples.push(self.take_sample(0, sink)?);

        loop {
            if num_ticks >= self.params.max_ticks {
                warn!("Sweep did not end within {} ticks, aborting", num_ticks);
                return Err(SweepError::TickBudgetExceeded(self.params.max_ticks));
            }

            let report = self.motion.advance_tick()?;
            num_ticks += 1;

            if report.end_of_measure {
                break;
            }

            let index = samples.len() as u64;
            samples.push(self.take_sample(index, sink)?);
        }

        let duration_s =
            util::time::duration_to_seconds(Utc::now() - start_time).unwrap_or(f64::NAN);

        info!(
            "Sweep complete: {} samples in {} ticks ({:.1} s)",
            samples.len(),
            num_ticks,
            duration_s
        );

        // ---- PHOTOMETRY ----

        let theta_res_deg = sample_spacing_deg(&self.axis(Axis::Theta)?);
        let phi_res_deg = sample_spacing_deg(&self.axis(Axis::Phi)?);

        let luminous_flux_lm =
            match photometry::luminous_flux(&samples, theta_res_deg, phi_res_deg) {
                Ok(flux) => {
                    info!("Luminous flux: {:.2} lm", flux);
                    Some(flux)
                }
                Err(e) => {
                    warn!("Could not compute the luminous flux: {}", e);
                    None
                }
            };

        let fwhm = photometry::hv_fwhm(&samples, phi_res_deg);
        info!(
            "FWHM: horizontal {:.2} deg, vertical {:.2} deg",
            fwhm.horizontal_deg, fwhm.vertical_deg
        );

        Ok(SweepReport {
            num_samples: samples.len() as u64,
            num_ticks,
            duration_s,
            luminous_flux_lm,
            h_fwhm_deg: fwhm.horizontal_deg,
            v_fwhm_deg: fwhm.vertical_deg,
        })
    }

    fn axis(&self, axis: Axis) -> Result<AxisState, MotionCtrlError> {
        self.motion
            .axis_state(axis)
            .ok_or(MotionCtrlError::AxisNotInitialised(axis))
    }

    fn take_sample<K: SampleSink>(
        &mut self,
        index: u64,
        sink: &mut K,
    ) -> Result<Sample, SweepError> {
        let theta = self.axis(Axis::Theta)?;
        let phi = self.axis(Axis::Phi)?;

        let raw = self.sensor.read_illuminance()?;
        if !raw.is_finite() {
            return Err(SensorError::NonFiniteReading(raw).into());
        }

        let illuminance_lux = raw - self.params.dark_offset_lux;

        let sample = Sample {
            index,
            theta_steps: theta.position,
            phi_steps: phi.position,
            theta_deg: theta.position_deg(),
            phi_deg: phi.position_deg(),
            illuminance_lux,
            intensity_cd: photometry::luminous_intensity(
                illuminance_lux,
                self.params.sensor_distance_m,
            ),
        };

        trace!("Sample: {:?}", sample);

        sink.record(&sample)?;

        Ok(sample)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Angle between two neighbouring samples on an axis.
///
/// Units: degrees
fn sample_spacing_deg(state: &AxisState) -> f64 {
    state.resolution as f64 * state.degrees_per_step
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::NoDelay;
    use crate::motion_ctrl::MotionParams;
    use crate::sim::{SimInterrupter, SimLightSource, SimParams, SimRig, SimShaft, SimStepper};
    use util::archive::Archiver;

    type SimSweep = Sweep<SimStepper, SimInterrupter, NoDelay, SimLightSource>;

    /// 18 degree steps on both axes, one step per sample, 90 degree polar limit
    fn sim_sweep(sim: &SimParams, params: SweepParams) -> (SimSweep, SimShaft, SimShaft) {
        let rig = SimRig::new(sim, 20, 20, 18.0);

        let mut motion = MotionCtrl::new(
            MotionParams::without_delays(90.0),
            rig.theta_hw,
            rig.phi_hw,
            NoDelay,
        );
        motion.theta_init(18.0, 1).unwrap();
        motion.phi_init(18.0, 1).unwrap();

        (
            Sweep::new(params, motion, rig.light_source),
            rig.theta_shaft,
            rig.phi_shaft,
        )
    }

    /// Sensor with a fixed script of readings
    struct ScriptedSensor(Vec<Result<f64, SensorError>>);

    impl LightSensor for ScriptedSensor {
        fn read_illuminance(&mut self) -> Result<f64, SensorError> {
            if self.0.is_empty() {
                Ok(0.0)
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn test_calibrate_then_sweep() {
        let sim = SimParams::default();
        let (mut sweep, theta_shaft, phi_shaft) = sim_sweep(&sim, SweepParams::default());

        sweep.calibrate().unwrap();
        assert_eq!(theta_shaft.position(), sim.theta_reference_steps);
        assert_eq!(
            phi_shaft.position().rem_euclid(20),
            sim.phi_reference_steps.rem_euclid(20)
        );

        let mut samples: Vec<Sample> = vec![];
        let report = sweep.run(&mut samples).unwrap();

        // One sample at the start and one after every tick except the last
        assert_eq!(report.num_ticks, 82);
        assert_eq!(report.num_samples, 82);
        assert_eq!(samples.len(), 82);

        for (i, s) in samples.iter().enumerate() {
            assert_eq!(s.index, i as u64);
            assert_eq!(s.theta_deg, s.theta_steps as f64 * 18.0);
            assert!(s.phi_steps >= 0 && s.phi_steps < 20);
        }

        // Theta is referenced so the first sample faces the source
        assert!((samples[0].illuminance_lux - sim.peak_lux).abs() < 1e-9);
        assert_eq!(samples.last().unwrap().theta_steps, 5);
        assert!(sweep.motion().end_of_measure());
    }

    #[test]
    fn test_dark_offset_removed() {
        let sim = SimParams {
            dark_lux: 12.5,
            ..SimParams::default()
        };
        let params = SweepParams {
            dark_offset_lux: 12.5,
            ..SweepParams::default()
        };
        let (mut sweep, _, _) = sim_sweep(&sim, params);
        sweep.calibrate().unwrap();

        let mut samples: Vec<Sample> = vec![];
        sweep.run(&mut samples).unwrap();

        assert!((samples[0].illuminance_lux - sim.peak_lux).abs() < 1e-9);
        for s in samples.iter().filter(|s| s.theta_steps == 5) {
            assert!(s.illuminance_lux.abs() < 1e-9);
        }
    }

    #[test]
    fn test_reference_not_found() {
        let theta_shaft = SimShaft::new();
        let phi_shaft = SimShaft::new();
        let mut motion = MotionCtrl::new(
            MotionParams::without_delays(90.0),
            crate::motion_ctrl::AxisHw {
                stepper: SimStepper::new(&theta_shaft),
                reference: SimInterrupter::at(&theta_shaft, 0, 20),
            },
            crate::motion_ctrl::AxisHw {
                stepper: SimStepper::new(&phi_shaft),
                reference: SimInterrupter::never(&phi_shaft),
            },
            NoDelay,
        );
        motion.theta_init(18.0, 1).unwrap();
        motion.phi_init(18.0, 1).unwrap();

        let mut sweep = Sweep::new(SweepParams::default(), motion, ScriptedSensor(vec![]));

        match sweep.calibrate() {
            Err(SweepError::ReferenceNotFound(Axis::Phi)) => (),
            r => panic!("Unexpected calibration result {:?}", r),
        }
        assert_eq!(phi_shaft.steps_taken(), 30);
    }

    #[test]
    fn test_tick_budget() {
        let params = SweepParams {
            max_ticks: 10,
            ..SweepParams::default()
        };
        let (mut sweep, _, _) = sim_sweep(&SimParams::default(), params);

        let mut samples: Vec<Sample> = vec![];
        match sweep.run(&mut samples) {
            Err(SweepError::TickBudgetExceeded(10)) => (),
            r => panic!("Unexpected sweep result {:?}", r),
        }
        assert_eq!(samples.len(), 11);
    }

    #[test]
    fn test_sensor_errors_abort() {
        let sim = SimParams::default();
        let rig = SimRig::new(&sim, 20, 20, 18.0);
        let mut motion = MotionCtrl::new(
            MotionParams::without_delays(90.0),
            rig.theta_hw,
            rig.phi_hw,
            NoDelay,
        );
        motion.theta_init(18.0, 1).unwrap();
        motion.phi_init(18.0, 1).unwrap();

        let sensor = ScriptedSensor(vec![Ok(1.0), Ok(f64::NAN)]);
        let mut sweep = Sweep::new(SweepParams::default(), motion, sensor);

        let mut samples: Vec<Sample> = vec![];
        match sweep.run(&mut samples) {
            Err(SweepError::SensorError(SensorError::NonFiniteReading(_))) => (),
            r => panic!("Unexpected sweep result {:?}", r),
        }
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_second_run_restarts() {
        let (mut sweep, theta_shaft, phi_shaft) =
            sim_sweep(&SimParams::default(), SweepParams::default());

        let mut first: Vec<Sample> = vec![];
        let mut second: Vec<Sample> = vec![];
        sweep.run(&mut first).unwrap();
        sweep.run(&mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(theta_shaft.position(), 5);
        assert_eq!(phi_shaft.position(), 0);
    }

    #[test]
    fn test_lambertian_photometry() {
        let sim = SimParams::default();
        let (mut sweep, _, _) = sim_sweep(&sim, SweepParams::default());
        sweep.calibrate().unwrap();

        let mut samples: Vec<Sample> = vec![];
        let report = sweep.run(&mut samples).unwrap();

        // At one meter the intensity in candela equals the illuminance in lux
        for s in samples.iter() {
            assert_eq!(s.intensity_cd, s.illuminance_lux.max(0.0));
        }

        // A Lambertian source emits pi * E0 * d^2 lumens
        let expected = std::f64::consts::PI * sim.peak_lux;
        let flux = report.luminous_flux_lm.unwrap();
        assert!((flux - expected).abs() / expected < 0.02);

        // Half of the peak is reached at 60 degrees, the nearest 18 degree ring is at 54
        assert_eq!(report.h_fwhm_deg, 108.0);
        assert_eq!(report.v_fwhm_deg, 108.0);
    }

    #[test]
    fn test_sensor_distance() {
        let sim = SimParams::default();
        let far = SweepParams {
            sensor_distance_m: 2.5,
            ..SweepParams::default()
        };

        let (mut near_sweep, _, _) = sim_sweep(&sim, SweepParams::default());
        let (mut far_sweep, _, _) = sim_sweep(&sim, far);
        near_sweep.calibrate().unwrap();
        far_sweep.calibrate().unwrap();

        let mut near_samples: Vec<Sample> = vec![];
        let mut far_samples: Vec<Sample> = vec![];
        let near = near_sweep.run(&mut near_samples).unwrap();
        let far = far_sweep.run(&mut far_samples).unwrap();

        assert!((far_samples[0].intensity_cd - 6.25 * sim.peak_lux).abs() < 1e-9);
        assert_eq!(far_samples[0].illuminance_lux, near_samples[0].illuminance_lux);

        let ratio = far.luminous_flux_lm.unwrap() / near.luminous_flux_lm.unwrap();
        assert!((ratio - 6.25).abs() < 1e-9);
        assert_eq!(far.h_fwhm_deg, near.h_fwhm_deg);
        assert_eq!(far.v_fwhm_deg, near.v_fwhm_deg);
    }

    #[test]
    fn test_invalid_sensor_distance() {
        let params = SweepParams {
            sensor_distance_m: 0.0,
            ..SweepParams::default()
        };
        let (mut sweep, theta_shaft, phi_shaft) = sim_sweep(&SimParams::default(), params);

        let mut samples: Vec<Sample> = vec![];
        match sweep.run(&mut samples) {
            Err(SweepError::InvalidSensorDistance(d)) if d == 0.0 => (),
            r => panic!("Unexpected sweep result {:?}", r),
        }
        assert!(samples.is_empty());
        assert_eq!(theta_shaft.steps_taken(), 0);
        assert_eq!(phi_shaft.steps_taken(), 0);
    }

    #[test]
    fn test_archive_sink() {
        let path = std::env::temp_dir()
            .join(format!("gonio_sweep_test_{}", std::process::id()))
            .join("samples.csv");
        let mut archiver = Archiver::create(&path).unwrap();

        let (mut sweep, _, _) = sim_sweep(&SimParams::default(), SweepParams::default());
        let report = sweep.run(&mut archiver).unwrap();

        assert_eq!(archiver.num_records() as u64, report.num_samples);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("index,theta_steps,phi_steps,theta_deg,phi_deg,illuminance_lux,intensity_cd")
        );
        assert_eq!(lines.count() as u64, report.num_samples);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
