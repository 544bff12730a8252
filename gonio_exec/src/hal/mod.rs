//! # Hardware Abstraction Module
//!
//! This module provides the capabilities the motion controller needs from the rig, abstracting
//! over real GPIO driven hardware and the simulated rig.
//!
//! Delays use the `embedded_hal` blocking delay traits so that production code can wait in real
//! time while tests and simulations substitute [`NoDelay`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`Stepper`] implementation for four wire bipolar steppers driven through H-bridges.
pub mod four_wire;

/// [`LightSensor`](crate::sweep::LightSensor) implementation for analogue lux meters read through
/// an MCP342x ADC.
pub mod mcp342x;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::digital::v2::InputPin;
use std::convert::Infallible;
use std::time::Duration;

pub use four_wire::FourWireStepper;
pub use mcp342x::Mcp342x;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A stepper motor which can be advanced by a number of microsteps.
pub trait Stepper {
    /// Advance the motor by `|steps|` microsteps in the direction given by the sign of `steps`.
    ///
    /// Returns once the motion is complete. Zero steps is a no-op.
    fn step(&mut self, steps: i32);
}

/// The input connected to an axis' optical interrupter.
pub trait ReferenceInput {
    /// True while the interrupter reports the reference position.
    fn is_triggered(&mut self) -> bool;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Delay which blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

/// Delay which returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

/// An optical interrupter connected to a digital input pin.
pub struct OptoInput<P> {
    pin: P,
    active_high: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: Stepper + ?Sized> Stepper for &mut T {
    fn step(&mut self, steps: i32) {
        (**self).step(steps)
    }
}

impl<T: ReferenceInput + ?Sized> ReferenceInput for &mut T {
    fn is_triggered(&mut self) -> bool {
        (**self).is_triggered()
    }
}

impl DelayMs<u32> for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms as u64));
        }
    }
}

impl DelayUs<u32> for StdDelay {
    fn delay_us(&mut self, us: u32) {
        if us > 0 {
            std::thread::sleep(Duration::from_micros(us as u64));
        }
    }
}

impl DelayMs<u32> for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}

impl DelayUs<u32> for NoDelay {
    fn delay_us(&mut self, _us: u32) {}
}

impl<P> OptoInput<P>
where
    P: InputPin<Error = Infallible>,
{
    /// Wrap an input pin.
    ///
    /// ## Arguments
    /// - `pin` - The pin the interrupter output is connected to
    /// - `active_high` - Whether a high level on the pin means the reference is seen
    pub fn new(pin: P, active_high: bool) -> Self {
        Self { pin, active_high }
    }
}

impl<P> ReferenceInput for OptoInput<P>
where
    P: InputPin<Error = Infallible>,
{
    fn is_triggered(&mut self) -> bool {
        let level = match self.pin.is_high() {
            Ok(l) => l,
            Err(e) => match e {},
        };

        level == self.active_high
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct FixedPin(bool);

    impl InputPin for FixedPin {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[test]
    fn test_opto_input_polarity() {
        assert!(OptoInput::new(FixedPin(true), true).is_triggered());
        assert!(!OptoInput::new(FixedPin(false), true).is_triggered());
        assert!(OptoInput::new(FixedPin(false), false).is_triggered());
        assert!(!OptoInput::new(FixedPin(true), false).is_triggered());
    }
}
