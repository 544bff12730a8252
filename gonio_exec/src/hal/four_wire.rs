//! [`Stepper`] implementation for a four wire bipolar stepper.
//!
//! The coils are energised with the usual full step sequence:
//!
//! | phase | in1 | in2 | in3 | in4 |
//! |-------|-----|-----|-----|-----|
//! | 0     | 1   | 0   | 1   | 0   |
//! | 1     | 0   | 1   | 1   | 0   |
//! | 2     | 0   | 1   | 0   | 1   |
//! | 3     | 1   | 0   | 0   | 1   |

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::digital::v2::OutputPin;
use std::convert::Infallible;

use super::Stepper;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PHASES: [[bool; 4]; 4] = [
    [true, false, true, false],
    [false, true, true, false],
    [false, true, false, true],
    [true, false, false, true],
];

const MICROS_PER_MINUTE: u64 = 60_000_000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct FourWireStepper<P1, P2, P3, P4, D> {
    pins: (P1, P2, P3, P4),
    delay: D,

    /// Index into `PHASES` of the currently energised phase
    phase: usize,

    /// Time between two phases.
    ///
    /// Units: microseconds
    step_delay_us: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P1, P2, P3, P4, D> FourWireStepper<P1, P2, P3, P4, D>
where
    P1: OutputPin<Error = Infallible>,
    P2: OutputPin<Error = Infallible>,
    P3: OutputPin<Error = Infallible>,
    P4: OutputPin<Error = Infallible>,
    D: DelayUs<u32>,
{
    /// Create a new stepper.
    ///
    /// ## Arguments
    /// - `pins` - The four coil driver inputs
    /// - `delay` - Delay used between phases
    /// - `steps_per_rev` - Number of steps in one revolution of the motor
    /// - `speed_rpm` - Speed to step at
    pub fn new(pins: (P1, P2, P3, P4), delay: D, steps_per_rev: u32, speed_rpm: u32) -> Self {
        let mut stepper = Self {
            pins,
            delay,
            phase: 0,
            step_delay_us: 0,
        };
        stepper.set_speed(steps_per_rev, speed_rpm);
        stepper
    }

    /// Set the stepping speed.
    pub fn set_speed(&mut self, steps_per_rev: u32, speed_rpm: u32) {
        let divisor = (steps_per_rev as u64 * speed_rpm as u64).max(1);
        self.step_delay_us = (MICROS_PER_MINUTE / divisor).min(u32::MAX as u64) as u32;
    }

    /// Time between two phases in microseconds.
    pub fn step_delay_us(&self) -> u32 {
        self.step_delay_us
    }

    fn energise(&mut self) {
        let levels = PHASES[self.phase];
        set_level(&mut self.pins.0, levels[0]);
        set_level(&mut self.pins.1, levels[1]);
        set_level(&mut self.pins.2, levels[2]);
        set_level(&mut self.pins.3, levels[3]);
    }
}

impl<P1, P2, P3, P4, D> Stepper for FourWireStepper<P1, P2, P3, P4, D>
where
    P1: OutputPin<Error = Infallible>,
    P2: OutputPin<Error = Infallible>,
    P3: OutputPin<Error = Infallible>,
    P4: OutputPin<Error = Infallible>,
    D: DelayUs<u32>,
{
    fn step(&mut self, steps: i32) {
        for _ in 0..steps.unsigned_abs() {
            self.delay.delay_us(self.step_delay_us);

            self.phase = if steps > 0 {
                (self.phase + 1) % PHASES.len()
            } else {
                (self.phase + PHASES.len() - 1) % PHASES.len()
            };

            self.energise();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn set_level<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    let res = if high { pin.set_high() } else { pin.set_low() };
    if let Err(e) = res {
        match e {}
    }
}
