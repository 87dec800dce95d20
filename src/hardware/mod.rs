//! Hardware boundary of the daemon
//!
//! The control core only sees two traits: [`SensorReader`] for instantaneous
//! samples and [`ActuatorDriver`] for boolean writes. Relay, LED and servo
//! are all driven through the same `set_actuator(bool)` call; mapping a
//! boolean onto a pin level or a servo angle is the driver's business.
//!
//! ```text
//! hardware/
//! ├── config.rs   - pin assignment from the config file
//! ├── gpio.rs     - digital inputs and outputs (relay, LED)
//! ├── servo.rs    - software PWM servo
//! ├── sht3x.rs    - I2C temperature / humidity sensor
//! └── board.rs    - assembles the fitted devices for a profile
//! ```

pub mod board;
pub mod config;
pub mod gpio;
pub mod servo;
pub mod sht3x;

use std::fmt;

use tracing::warn;

use crate::controller::SensorSample;

pub use board::{open_board, Board, BoardSensors};
pub use gpio::{DigitalInput, DigitalOutput};
pub use servo::Servo;
pub use sht3x::Sht3x;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("{0} is not fitted")]
    NotFitted(&'static str),

    #[error("{0} has no fresh reading yet")]
    NotReady(&'static str),

    #[error("Invalid reading: {0}")]
    InvalidReading(String),
}

/// Non-blocking access to the local sensor lines.
pub trait SensorReader: fmt::Debug + Send {
    fn read_motion(&mut self) -> Result<bool, HardwareError> {
        Err(HardwareError::NotFitted("motion sensor"))
    }

    fn read_door(&mut self) -> Result<bool, HardwareError> {
        Err(HardwareError::NotFitted("door sensor"))
    }

    fn read_temperature_humidity(&mut self) -> Result<(f32, f32), HardwareError> {
        Err(HardwareError::NotFitted("climate sensor"))
    }

    /// Takes one sample of every line. A failed read is logged and leaves the
    /// line empty for this cycle.
    fn sample(&mut self) -> SensorSample {
        SensorSample {
            motion: settle("motion", self.read_motion()),
            door: settle("door", self.read_door()),
            climate: settle("climate", self.read_temperature_humidity()),
        }
    }
}

pub trait ActuatorDriver: fmt::Debug + Send {
    fn set_actuator(&mut self, on: bool) -> Result<(), HardwareError>;
}

/// Drives several actuators from one boolean, e.g. the servo and LED of the
/// light switch. An empty bank accepts every write.
#[derive(Debug, Default)]
pub struct ActuatorBank {
    drivers: Vec<Box<dyn ActuatorDriver>>,
}

impl ActuatorBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, driver: impl ActuatorDriver + 'static) -> Self {
        self.drivers.push(Box::new(driver));
        self
    }

    pub fn push(&mut self, driver: Box<dyn ActuatorDriver>) {
        self.drivers.push(driver);
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl ActuatorDriver for ActuatorBank {
    /// Every driver is written even if an earlier one fails; the first error is returned.
    fn set_actuator(&mut self, on: bool) -> Result<(), HardwareError> {
        let mut first_error = None;
        for driver in &mut self.drivers {
            if let Err(e) = driver.set_actuator(on) {
                warn!("Actuator write failed for {:?}: {}", driver, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn settle<T>(line: &str, reading: Result<T, HardwareError>) -> Option<T> {
    match reading {
        Ok(value) => Some(value),
        Err(HardwareError::NotFitted(_)) | Err(HardwareError::NotReady(_)) => None,
        Err(e) => {
            warn!("Skipping {} reading this cycle: {}", line, e);
            None
        }
    }
}
