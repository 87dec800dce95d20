use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::debug;

use super::{ActuatorDriver, HardwareError};

#[derive(Debug)]
pub struct DigitalInput {
    pin: InputPin,
}

impl DigitalInput {
    pub fn floating(gpio: &Gpio, pin: u8) -> Result<Self, HardwareError> {
        Ok(Self {
            pin: gpio.get(pin)?.into_input(),
        })
    }

    pub fn pull_up(gpio: &Gpio, pin: u8) -> Result<Self, HardwareError> {
        Ok(Self {
            pin: gpio.get(pin)?.into_input_pullup(),
        })
    }

    pub fn is_high(&self) -> bool {
        self.pin.is_high()
    }
}

/// Relay or LED on a single digital line.
#[derive(Debug)]
pub struct DigitalOutput {
    name: &'static str,
    pin: OutputPin,
    active_low: bool,
}

impl DigitalOutput {
    /// The line is driven to its inactive level as soon as it is claimed.
    pub fn open(
        gpio: &Gpio,
        name: &'static str,
        pin: u8,
        active_low: bool,
    ) -> Result<Self, HardwareError> {
        let pin = gpio.get(pin)?;
        let pin = if active_low {
            pin.into_output_high()
        } else {
            pin.into_output_low()
        };
        Ok(Self {
            name,
            pin,
            active_low,
        })
    }
}

impl ActuatorDriver for DigitalOutput {
    fn set_actuator(&mut self, on: bool) -> Result<(), HardwareError> {
        if on != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        debug!("{} on pin {} -> {}", self.name, self.pin.pin(), on);
        Ok(())
    }
}
