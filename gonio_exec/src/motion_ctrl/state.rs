//! Implementations for the MotionCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, trace, warn};
use serde::Serialize;

// Internal
use super::{
    whole_steps, Axis, AxisState, MotionCtrlError, MotionParams, FIRST_DIRECTION,
    RETURN_DIRECTION,
};
use crate::hal::{ReferenceInput, Stepper};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The hardware attached to one axis.
pub struct AxisHw<S, I> {
    /// Motor driving the axis
    pub stepper: S,

    /// Optical interrupter marking the axis' reference position
    pub reference: I,
}

/// Motion control module state
///
/// Owns the hardware of both axes and a delay strategy. Every operation runs to completion on the
/// calling thread, blocking for any settle delays.
pub struct MotionCtrl<S, I, D> {
    pub(crate) params: MotionParams,

    pub(crate) theta_hw: AxisHw<S, I>,
    pub(crate) phi_hw: AxisHw<S, I>,
    pub(crate) delay: D,

    pub(crate) theta: Option<AxisState>,
    pub(crate) phi: Option<AxisState>,

    end_of_measure: bool,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Signed microsteps the phi motor was moved by.
    pub phi_steps_moved: i32,

    /// Signed microsteps the theta motor was moved by.
    pub theta_steps_moved: i32,

    /// Phi bounced off the end of its revolution during this tick.
    pub phi_reversed: bool,

    /// Theta was advanced during this tick.
    pub theta_serviced: bool,

    /// The measurement has ended.
    pub end_of_measure: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S, I, D> MotionCtrl<S, I, D>
where
    S: Stepper,
    I: ReferenceInput,
    D: DelayMs<u32>,
{
    /// Create a new motion controller.
    ///
    /// Both axes must be initialised with [`MotionCtrl::theta_init`] and [`MotionCtrl::phi_init`]
    /// before the controller can move.
    pub fn new(params: MotionParams, theta_hw: AxisHw<S, I>, phi_hw: AxisHw<S, I>, delay: D) -> Self {
        Self {
            params,
            theta_hw,
            phi_hw,
            delay,
            theta: None,
            phi: None,
            end_of_measure: false,
        }
    }

    /// Initialise the polar axis.
    ///
    /// ## Arguments
    /// - `degrees_per_step` - Angle of one motor microstep
    /// - `resolution` - Number of microsteps advanced per sample tick
    pub fn theta_init(&mut self, degrees_per_step: f64, resolution: u32) -> Result<(), MotionCtrlError> {
        let state = AxisState::new(Axis::Theta, degrees_per_step, resolution)?;

        match whole_steps(self.params.polar_angle_limit_deg, degrees_per_step) {
            Some(l) if l >= 1 => (),
            _ => return Err(MotionCtrlError::InvalidPolarLimit(self.params.polar_angle_limit_deg)),
        }

        debug!(
            "Theta initialised: {} deg/step, {} steps/rev, {} steps/sample",
            degrees_per_step, state.steps_per_rev, state.resolution
        );

        self.theta = Some(state);
        Ok(())
    }

    /// Initialise the azimuthal axis.
    ///
    /// ## Arguments
    /// - `degrees_per_step` - Angle of one motor microstep
    /// - `resolution` - Number of microsteps advanced per sample tick
    pub fn phi_init(&mut self, degrees_per_step: f64, resolution: u32) -> Result<(), MotionCtrlError> {
        let state = AxisState::new(Axis::Phi, degrees_per_step, resolution)?;

        debug!(
            "Phi initialised: {} deg/step, {} steps/rev, {} steps/sample",
            degrees_per_step, state.steps_per_rev, state.resolution
        );

        self.phi = Some(state);
        Ok(())
    }

    /// Move the rig to the next sample position.
    ///
    /// Phi is advanced by one resolution unit unless it would leave its revolution, in which case
    /// it bounces and theta is advanced instead. While theta sits at its start or its limit phi
    /// stays parked and theta is advanced. Advancing theta past its limit ends the measurement.
    ///
    /// Once the measurement has ended further ticks do not move the rig.
    pub fn advance_tick(&mut self) -> Result<TickReport, MotionCtrlError> {
        let (mut theta, mut phi) = self.axes()?;
        let mut report = TickReport::default();

        if self.end_of_measure {
            debug!("Tick requested after the end of the measure, ignoring");
            report.end_of_measure = true;
            return Ok(report);
        }

        let limit = self.theta_limit(&theta);
        let theta_start = theta.position;

        let mut phi_pos = phi.position + phi.tick_delta();

        if phi_pos >= phi.steps_per_rev || phi_pos < 0 {
            // Bounce off the end of the revolution, phi stays where it is
            phi.direction = phi.direction.reversed();
            phi_pos += phi.tick_delta();
            phi.position = phi_pos;
            report.phi_reversed = true;

            debug!("Phi reversed at {} steps, now {:?}", phi.position, phi.direction);

            self.advance_theta(&mut theta, &mut phi, limit, &mut report);
        } else if theta_start == 0 || theta_start == limit {
            // Theta checkpoint: the phi step is discarded so phi stays parked
            self.advance_theta(&mut theta, &mut phi, limit, &mut report);
        } else {
            phi.position = phi_pos;
            report.phi_steps_moved += self.step_phi(phi.tick_delta());
        }

        self.theta = Some(theta);
        self.phi = Some(phi);
        report.end_of_measure = self.end_of_measure;

        trace!(
            "Tick: theta {} phi {} (moved theta {}, phi {})",
            theta.position,
            phi.position,
            report.theta_steps_moved,
            report.phi_steps_moved
        );

        Ok(report)
    }

    /// Drive both axes back to position zero, theta first.
    ///
    /// Directions and the end of measure flag are left as they are, use [`MotionCtrl::reset`] to
    /// prepare for another sweep.
    pub fn park(&mut self) -> Result<(), MotionCtrlError> {
        let (mut theta, mut phi) = self.axes()?;

        info!(
            "Parking from theta {} steps, phi {} steps",
            theta.position, phi.position
        );

        self.step_theta_slow(-theta.position);
        theta.position = 0;

        self.step_phi(-phi.position);
        phi.position = 0;

        self.theta = Some(theta);
        self.phi = Some(phi);

        Ok(())
    }

    /// Declare the current position as zero on both axes, restore the first sweep direction and
    /// clear the end of measure flag. The rig is not moved.
    pub fn reset(&mut self) -> Result<(), MotionCtrlError> {
        let (mut theta, mut phi) = self.axes()?;

        if theta.position != 0 || phi.position != 0 {
            warn!(
                "Resetting away from zero (theta {} steps, phi {} steps)",
                theta.position, phi.position
            );
        }

        for state in [&mut theta, &mut phi].iter_mut() {
            state.position = 0;
            state.direction = FIRST_DIRECTION;
        }

        self.theta = Some(theta);
        self.phi = Some(phi);
        self.end_of_measure = false;

        Ok(())
    }

    /// Steps taken by theta since its reference, or `None` before initialisation.
    pub fn theta_steps(&self) -> Option<i32> {
        self.theta.map(|s| s.position)
    }

    /// Steps taken by phi since its reference, or `None` before initialisation.
    pub fn phi_steps(&self) -> Option<i32> {
        self.phi.map(|s| s.position)
    }

    /// Polar angle of the rig, or `None` before initialisation.
    pub fn theta_deg(&self) -> Option<f64> {
        self.theta.map(|s| s.position_deg())
    }

    /// Azimuthal angle of the rig, or `None` before initialisation.
    pub fn phi_deg(&self) -> Option<f64> {
        self.phi.map(|s| s.position_deg())
    }

    /// True once theta has completed its excursion.
    pub fn end_of_measure(&self) -> bool {
        self.end_of_measure
    }

    /// Snapshot of an axis' state, or `None` before initialisation.
    pub fn axis_state(&self, axis: Axis) -> Option<AxisState> {
        match axis {
            Axis::Theta => self.theta,
            Axis::Phi => self.phi,
        }
    }

    /// Theta position at which the excursion ends.
    pub fn polar_limit_steps(&self) -> Result<i32, MotionCtrlError> {
        let theta = self.theta.ok_or(MotionCtrlError::AxisNotInitialised(Axis::Theta))?;
        Ok(self.theta_limit(&theta))
    }

    /// Get copies of both axes' states, failing if either is uninitialised.
    fn axes(&self) -> Result<(AxisState, AxisState), MotionCtrlError> {
        let theta = self.theta.ok_or(MotionCtrlError::AxisNotInitialised(Axis::Theta))?;
        let phi = self.phi.ok_or(MotionCtrlError::AxisNotInitialised(Axis::Phi))?;
        Ok((theta, phi))
    }

    fn theta_limit(&self, theta: &AxisState) -> i32 {
        // Validated in theta_init
        whole_steps(self.params.polar_angle_limit_deg, theta.degrees_per_step).unwrap_or(0)
    }

    /// Advance theta by one resolution unit, handling the end of its excursion.
    fn advance_theta(
        &mut self,
        theta: &mut AxisState,
        phi: &mut AxisState,
        limit: i32,
        report: &mut TickReport,
    ) {
        report.theta_serviced = true;

        let theta_start = theta.position;
        theta.position += theta.tick_delta();

        if theta.position > limit {
            // Bring phi back to its limit before finishing
            if phi.direction == RETURN_DIRECTION {
                report.phi_steps_moved += self.step_phi(-phi.position);
                phi.position = 0;
            }

            // Step back from the overshoot onto the limit. The overshoot was only counted, so the
            // motor moves the net distance from where theta physically is.
            theta.direction = theta.direction.reversed();
            theta.position += theta.direction.signum() * (theta.position - limit).abs();
            report.theta_steps_moved += self.step_theta_slow(theta.position - theta_start);
            theta.direction = theta.direction.reversed();

            self.end_of_measure = true;

            info!("Theta excursion complete at {} steps, end of measure", theta.position);
        } else if theta.position == limit {
            if phi.direction == RETURN_DIRECTION {
                // Unwind phi back to zero so the last ring starts from the same place
                report.phi_steps_moved += self.step_phi(-phi.position);
                phi.position = 0;
                phi.direction = phi.direction.reversed();
            }

            debug!("Theta reached its limit ({} steps)", limit);

            report.theta_steps_moved += self.step_theta_slow(theta.tick_delta());
        } else {
            report.theta_steps_moved += self.step_theta_slow(theta.tick_delta());
        }
    }

    /// Step phi and wait for it to settle, returning the steps taken.
    fn step_phi(&mut self, steps: i32) -> i32 {
        if steps != 0 {
            self.phi_hw.stepper.step(steps);
            self.delay.delay_ms(self.params.phi_settle_delay_ms);
        }
        steps
    }

    /// Step theta one microstep at a time, settling after each, returning the steps taken.
    fn step_theta_slow(&mut self, steps: i32) -> i32 {
        let dir = steps.signum();
        for _ in 0..steps.abs() {
            self.theta_hw.stepper.step(dir);
            self.delay.delay_ms(self.params.theta_settle_delay_ms);
        }
        steps
    }
}
