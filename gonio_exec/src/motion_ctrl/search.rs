//! Reference position search

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{Axis, Direction, MotionCtrl, MotionCtrlError};
use crate::hal::{ReferenceInput, Stepper};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a reference search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The interrupter triggered after `steps` microsteps.
    Found { steps: u32 },

    /// The search budget of `steps` microsteps ran out without a trigger.
    NotFound { steps: u32 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SearchOutcome {
    /// Whether the interrupter triggered before the budget ran out.
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }

    /// Microsteps consumed by the search.
    pub fn steps(&self) -> u32 {
        match *self {
            SearchOutcome::Found { steps } | SearchOutcome::NotFound { steps } => steps,
        }
    }
}

impl<S, I, D> MotionCtrl<S, I, D>
where
    S: Stepper,
    I: ReferenceInput,
    D: DelayMs<u32>,
{
    /// Search for the reference position of an axis.
    ///
    /// The axis is stepped one microstep at a time in `direction` for up to half a revolution,
    /// polling the interrupter after each microstep. If nothing is found the search pauses and
    /// then scans a full revolution in the opposite direction. Once found the axis position is
    /// zeroed.
    ///
    /// Not finding the reference is reported through [`SearchOutcome::NotFound`] rather than as
    /// an error, the caller decides whether to retry.
    pub fn search_reference(
        &mut self,
        axis: Axis,
        direction: Direction,
    ) -> Result<SearchOutcome, MotionCtrlError> {
        let mut state = self
            .axis_state(axis)
            .ok_or(MotionCtrlError::AxisNotInitialised(axis))?;

        let spr = state.steps_per_rev as u32;
        let step_delay_ms = self.params.search_step_delay_ms;
        let retry_pause_ms = self.params.search_retry_pause_ms;

        let (hw, delay) = match axis {
            Axis::Theta => (&mut self.theta_hw, &mut self.delay),
            Axis::Phi => (&mut self.phi_hw, &mut self.delay),
        };

        debug!("Searching for the {:?} reference going {:?}", axis, direction);

        let mut steps = 0u32;
        let mut found = false;

        // First pass covers half a revolution, the second a full one the other way
        let passes = [(direction, spr / 2), (direction.reversed(), spr)];

        for (pass, &(dir, budget)) in passes.iter().enumerate() {
            if pass > 0 {
                debug!(
                    "{:?} reference not found after {} steps, reversing",
                    axis, steps
                );
                delay.delay_ms(retry_pause_ms);
            }

            for _ in 0..budget {
                hw.stepper.step(dir.signum());
                delay.delay_ms(step_delay_ms);
                steps += 1;

                if hw.reference.is_triggered() {
                    found = true;
                    break;
                }
            }

            if found {
                break;
            }
        }

        if found {
            info!("{:?} reference found after {} steps", axis, steps);

            state.position = 0;
            match axis {
                Axis::Theta => self.theta = Some(state),
                Axis::Phi => self.phi = Some(state),
            }

            Ok(SearchOutcome::Found { steps })
        } else {
            warn!("{:?} reference not found after {} steps", axis, steps);
            Ok(SearchOutcome::NotFound { steps })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::NoDelay;
    use crate::motion_ctrl::{AxisHw, MotionParams};
    use crate::sim::{SimInterrupter, SimShaft, SimStepper};

    /// Controller with 20 step theta and phi axes whose references sit at the given shaft
    /// positions
    fn ctrl_with_refs(
        theta_ref: Option<i64>,
        phi_ref: Option<i64>,
    ) -> (MotionCtrl<SimStepper, SimInterrupter, NoDelay>, SimShaft, SimShaft) {
        let theta_shaft = SimShaft::new();
        let phi_shaft = SimShaft::new();

        let interrupter = |shaft: &SimShaft, pos: Option<i64>| match pos {
            Some(p) => SimInterrupter::at(shaft, p, 20),
            None => SimInterrupter::never(shaft),
        };

        let mut ctrl = MotionCtrl::new(
            MotionParams::without_delays(90.0),
            AxisHw {
                stepper: SimStepper::new(&theta_shaft),
                reference: interrupter(&theta_shaft, theta_ref),
            },
            AxisHw {
                stepper: SimStepper::new(&phi_shaft),
                reference: interrupter(&phi_shaft, phi_ref),
            },
            NoDelay,
        );
        ctrl.theta_init(18.0, 1).unwrap();
        ctrl.phi_init(18.0, 1).unwrap();

        (ctrl, theta_shaft, phi_shaft)
    }

    #[test]
    fn test_not_found_budget() {
        let (mut ctrl, theta_shaft, phi_shaft) = ctrl_with_refs(None, None);

        let outcome = ctrl
            .search_reference(Axis::Phi, Direction::Clockwise)
            .unwrap();

        assert_eq!(outcome, SearchOutcome::NotFound { steps: 10 + 20 });
        assert!(!outcome.is_found());
        assert_eq!(phi_shaft.steps_taken(), 30);
        // Half a turn out, a full turn back
        assert_eq!(phi_shaft.position(), 10 - 20);
        assert_eq!(theta_shaft.steps_taken(), 0);
        assert_eq!(ctrl.phi_steps(), Some(0));
    }

    #[test]
    fn test_found_in_first_pass() {
        let (mut ctrl, theta_shaft, _) = ctrl_with_refs(Some(7), None);

        let outcome = ctrl
            .search_reference(Axis::Theta, Direction::Clockwise)
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Found { steps: 7 });
        assert_eq!(outcome.steps(), 7);
        assert_eq!(theta_shaft.steps_taken(), 7);
        assert_eq!(theta_shaft.moves(), vec![1; 7]);
        assert_eq!(ctrl.theta_steps(), Some(0));
    }

    #[test]
    fn test_found_in_reverse_pass() {
        // Reference at -3, behind the first search direction
        let (mut ctrl, _, phi_shaft) = ctrl_with_refs(None, Some(-3));

        let outcome = ctrl
            .search_reference(Axis::Phi, Direction::Clockwise)
            .unwrap();

        // 10 steps out, then back through 0 to -3
        assert_eq!(outcome, SearchOutcome::Found { steps: 10 + 13 });
        assert_eq!(phi_shaft.position(), -3);
    }

    #[test]
    fn test_start_on_reference() {
        // The interrupter is already triggered before the first step
        let (mut ctrl, theta_shaft, _) = ctrl_with_refs(Some(0), None);

        let outcome = ctrl
            .search_reference(Axis::Theta, Direction::Clockwise)
            .unwrap();

        // Half a turn out, then back onto the starting position
        assert_eq!(outcome, SearchOutcome::Found { steps: 10 + 10 });
        assert!(outcome.is_found());
        assert_eq!(theta_shaft.steps_taken(), 20);
        assert_eq!(theta_shaft.position(), 0);
        assert_eq!(ctrl.theta_steps(), Some(0));
    }

    #[test]
    fn test_reference_zeroes_position() {
        let (mut ctrl, _, phi_shaft) = ctrl_with_refs(None, Some(0));

        for _ in 0..5 {
            ctrl.advance_tick().unwrap();
        }
        assert_eq!(ctrl.phi_steps(), Some(4));

        // The reference is 4 steps back the way phi came
        let outcome = ctrl
            .search_reference(Axis::Phi, Direction::CounterClockwise)
            .unwrap();
        assert_eq!(outcome, SearchOutcome::Found { steps: 4 });
        assert_eq!(ctrl.phi_steps(), Some(0));
        assert_eq!(phi_shaft.position(), 0);
    }

    #[test]
    fn test_search_requires_init() {
        let shaft = SimShaft::new();
        let mut ctrl = MotionCtrl::new(
            MotionParams::without_delays(90.0),
            AxisHw {
                stepper: SimStepper::new(&shaft),
                reference: SimInterrupter::never(&shaft),
            },
            AxisHw {
                stepper: SimStepper::new(&shaft),
                reference: SimInterrupter::never(&shaft),
            },
            NoDelay,
        );

        assert_eq!(
            ctrl.search_reference(Axis::Theta, Direction::Clockwise),
            Err(MotionCtrlError::AxisNotInitialised(Axis::Theta))
        );
        assert_eq!(shaft.steps_taken(), 0);
    }
}
