//! Sensirion SHT3x temperature / humidity sensor over I2C
//!
//! The sensor runs in periodic mode at one measurement per second, so a read
//! is a single fetch command and never waits for a conversion. Between
//! measurements the sensor reports `NotReady`, so every reading handed to the
//! control core is a fresh measurement.

use std::time::{Duration, Instant};

use rppal::i2c::I2c;
use tracing::{debug, info};

use super::HardwareError;

const CMD_PERIODIC_1MPS_HIGH: [u8; 2] = [0x21, 0x30];
const CMD_FETCH_DATA: [u8; 2] = [0xE0, 0x00];
const MEASUREMENT_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct Sht3x {
    bus: I2c,
    last_attempt: Option<Instant>,
}

impl Sht3x {
    pub fn open(bus: u8, address: u16) -> Result<Self, HardwareError> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        i2c.write(&CMD_PERIODIC_1MPS_HIGH)?;
        info!("SHT3x on bus {} at {:#04x} started in periodic mode", bus, address);
        Ok(Self {
            bus: i2c,
            last_attempt: None,
        })
    }

    /// Returns `(temperature °C, relative humidity %)`.
    pub fn read(&mut self) -> Result<(f32, f32), HardwareError> {
        let now = Instant::now();
        if !measurement_due(self.last_attempt, now) {
            return Err(HardwareError::NotReady("climate sensor"));
        }
        self.last_attempt = Some(now);

        let mut raw = [0u8; 6];
        self.bus.write_read(&CMD_FETCH_DATA, &mut raw)?;
        let reading = decode_measurement(&raw)?;
        debug!("SHT3x reading {:.2}°C / {:.2}%", reading.0, reading.1);
        Ok(reading)
    }
}

fn measurement_due(last_attempt: Option<Instant>, now: Instant) -> bool {
    match last_attempt {
        Some(last) => now.duration_since(last) >= MEASUREMENT_PERIOD,
        None => true,
    }
}

pub(crate) fn decode_measurement(raw: &[u8; 6]) -> Result<(f32, f32), HardwareError> {
    let (temperature, humidity) = (&raw[0..3], &raw[3..6]);
    for word in [temperature, humidity] {
        if crc8(&word[..2]) != word[2] {
            return Err(HardwareError::InvalidReading(format!(
                "SHT3x CRC mismatch on {:02x?}",
                word
            )));
        }
    }

    let raw_t = u16::from_be_bytes([temperature[0], temperature[1]]) as f32;
    let raw_h = u16::from_be_bytes([humidity[0], humidity[1]]) as f32;
    Ok((
        -45.0 + 175.0 * raw_t / 65535.0,
        100.0 * raw_h / 65535.0,
    ))
}

/// CRC-8, polynomial 0x31, init 0xFF.
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
