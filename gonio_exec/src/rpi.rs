//! # Raspberry Pi Rig
//!
//! Builds the rig's hardware on the Raspberry Pi GPIO header and I2C bus using `rppal`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::hal::Delay;
use rppal::i2c::I2c;

use crate::hal::{FourWireStepper, Mcp342x, OptoInput};
use crate::motion_ctrl::AxisHw;
use crate::params::{PinParams, SensorParams};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

pub type RpiStepper = FourWireStepper<OutputPin, OutputPin, OutputPin, OutputPin, Delay>;

pub type RpiReference = OptoInput<InputPin>;

pub type RpiSensor = Mcp342x<I2c, Delay>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct RpiRig {
    pub theta_hw: AxisHw<RpiStepper, RpiReference>,
    pub phi_hw: AxisHw<RpiStepper, RpiReference>,
    pub sensor: RpiSensor,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum RpiError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RpiRig {
    /// Claim the rig's pins and bus.
    ///
    /// ## Arguments
    /// - `pins` - GPIO assignments
    /// - `sensor` - Light sensor configuration
    /// - `steps_per_rev` - Microsteps per revolution of the theta and phi motors
    /// - `speed_rpm` - Motor speed
    pub fn new(
        pins: &PinParams,
        sensor: &SensorParams,
        steps_per_rev: (u32, u32),
        speed_rpm: u32,
    ) -> Result<Self, RpiError> {
        let gpio = Gpio::new()?;

        let stepper = |coils: &[u8; 4], spr: u32| -> Result<RpiStepper, RpiError> {
            let out = |pin: u8| -> Result<OutputPin, RpiError> {
                Ok(gpio.get(pin)?.into_output_low())
            };

            Ok(FourWireStepper::new(
                (out(coils[0])?, out(coils[1])?, out(coils[2])?, out(coils[3])?),
                Delay::new(),
                spr,
                speed_rpm,
            ))
        };

        let reference = |pin: u8| -> Result<RpiReference, RpiError> {
            Ok(OptoInput::new(
                gpio.get(pin)?.into_input(),
                pins.reference_active_high,
            ))
        };

        Ok(Self {
            theta_hw: AxisHw {
                stepper: stepper(&pins.theta_coils, steps_per_rev.0)?,
                reference: reference(pins.theta_reference)?,
            },
            phi_hw: AxisHw {
                stepper: stepper(&pins.phi_coils, steps_per_rev.1)?,
                reference: reference(pins.phi_reference)?,
            },
            sensor: Mcp342x::new(
                I2c::new()?,
                Delay::new(),
                sensor.i2c_address,
                sensor.lux_per_volt,
            ),
        })
    }
}
