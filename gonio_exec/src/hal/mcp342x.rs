//! [`LightSensor`] implementation for an analogue lux meter read through an MCP342x ADC.
//!
//! The ADC runs one-shot 16 bit conversions on channel 1 with unity gain, giving 62.5 uV per LSB.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write};
use std::fmt::Debug;

use crate::sweep::{LightSensor, SensorError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default bus address of the ADC
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Start a one-shot, channel 1, 16 bit, 1x gain conversion
const CONFIG_START_ONE_SHOT: u8 = 0b1000_1000;

/// Set in the returned config byte while the conversion is in progress
const CONFIG_NOT_READY: u8 = 0b1000_0000;

/// Units: volts per LSB
const VOLTS_PER_LSB: f64 = 62.5e-6;

const READY_POLL_INTERVAL_MS: u32 = 10;

/// A 16 bit conversion takes around 67 ms
const MAX_READY_POLLS: u32 = 20;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct Mcp342x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,

    /// Units: lux per volt
    lux_per_volt: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, D, E> Mcp342x<I2C, D>
where
    I2C: Write<Error = E> + Read<Error = E>,
    E: Debug,
    D: DelayMs<u32>,
{
    /// Create a new sensor.
    ///
    /// ## Arguments
    /// - `i2c` - Bus the ADC is attached to
    /// - `delay` - Delay used while waiting for conversions
    /// - `address` - Bus address of the ADC
    /// - `lux_per_volt` - Output scale of the lux meter
    pub fn new(i2c: I2C, delay: D, address: u8, lux_per_volt: f64) -> Self {
        Self {
            i2c,
            delay,
            address,
            lux_per_volt,
        }
    }

    /// Run a single conversion and return the measured voltage.
    pub fn read_volts(&mut self) -> Result<f64, SensorError> {
        self.i2c
            .write(self.address, &[CONFIG_START_ONE_SHOT])
            .map_err(|e| SensorError::ReadFailed(format!("{:?}", e)))?;

        let mut buf = [0u8; 3];

        for _ in 0..MAX_READY_POLLS {
            self.delay.delay_ms(READY_POLL_INTERVAL_MS);

            self.i2c
                .read(self.address, &mut buf)
                .map_err(|e| SensorError::ReadFailed(format!("{:?}", e)))?;

            if buf[2] & CONFIG_NOT_READY == 0 {
                let raw = i16::from_be_bytes([buf[0], buf[1]]);
                return Ok(raw as f64 * VOLTS_PER_LSB);
            }
        }

        Err(SensorError::ReadFailed(String::from(
            "ADC conversion did not complete",
        )))
    }
}

impl<I2C, D, E> LightSensor for Mcp342x<I2C, D>
where
    I2C: Write<Error = E> + Read<Error = E>,
    E: Debug,
    D: DelayMs<u32>,
{
    fn read_illuminance(&mut self) -> Result<f64, SensorError> {
        Ok(self.read_volts()? * self.lux_per_volt)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::NoDelay;

    /// Bus replaying a list of read frames and recording writes
    #[derive(Default)]
    struct MockBus {
        writes: Vec<(u8, Vec<u8>)>,
        reads: Vec<[u8; 3]>,
    }

    impl Write for MockBus {
        type Error = ();

        fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), ()> {
            self.writes.push((address, bytes.to_vec()));
            Ok(())
        }
    }

    impl Read for MockBus {
        type Error = ();

        fn read(&mut self, _address: u8, buffer: &mut [u8]) -> Result<(), ()> {
            if self.reads.is_empty() {
                return Err(());
            }
            buffer.copy_from_slice(&self.reads.remove(0));
            Ok(())
        }
    }

    #[test]
    fn test_conversion() {
        let bus = MockBus {
            reads: vec![[0x00, 0x00, 0x88], [0x3E, 0x80, 0x08]],
            ..MockBus::default()
        };
        let mut adc = Mcp342x::new(bus, NoDelay, DEFAULT_ADDRESS, 100.0);

        // 0x3E80 = 16000 LSB = 1 V
        let lux = adc.read_illuminance().unwrap();
        assert!((lux - 100.0).abs() < 1e-9);
        assert_eq!(adc.i2c.writes, vec![(0x68, vec![CONFIG_START_ONE_SHOT])]);
    }

    #[test]
    fn test_negative_reading() {
        let bus = MockBus {
            reads: vec![[0xFF, 0xF0, 0x08]],
            ..MockBus::default()
        };
        let mut adc = Mcp342x::new(bus, NoDelay, DEFAULT_ADDRESS, 1.0);

        assert!((adc.read_volts().unwrap() + 16.0 * VOLTS_PER_LSB).abs() < 1e-12);
    }

    #[test]
    fn test_errors() {
        let bus = MockBus {
            reads: vec![[0x00, 0x00, 0x88]; MAX_READY_POLLS as usize],
            ..MockBus::default()
        };
        let mut adc = Mcp342x::new(bus, NoDelay, DEFAULT_ADDRESS, 1.0);
        assert!(matches!(
            adc.read_illuminance(),
            Err(SensorError::ReadFailed(_))
        ));

        // Bus failure
        assert!(matches!(
            adc.read_illuminance(),
            Err(SensorError::ReadFailed(_))
        ));
    }
}
