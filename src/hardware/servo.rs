//! Hobby servo on a software PWM line
//!
//! 50 Hz frame, pulse width interpolated linearly between the configured
//! minimum and maximum over 0–180°.

use std::time::Duration;

use rppal::gpio::{Gpio, OutputPin};
use tracing::debug;

use super::config::ServoConfig;
use super::{ActuatorDriver, HardwareError};

const FRAME: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub struct Servo {
    pin: OutputPin,
    config: ServoConfig,
}

impl Servo {
    pub fn open(gpio: &Gpio, config: ServoConfig) -> Result<Self, HardwareError> {
        let pin = gpio.get(config.pin)?.into_output_low();
        Ok(Self { pin, config })
    }

    pub fn move_to(&mut self, angle: f64) -> Result<(), HardwareError> {
        let pulse = pulse_width(&self.config, angle);
        debug!("Servo on pin {} -> {:.0}° ({:?})", self.config.pin, angle, pulse);
        self.pin.set_pwm(FRAME, pulse)?;
        Ok(())
    }
}

impl ActuatorDriver for Servo {
    fn set_actuator(&mut self, on: bool) -> Result<(), HardwareError> {
        let angle = if on {
            self.config.on_angle
        } else {
            self.config.off_angle
        };
        self.move_to(angle)
    }
}

pub(crate) fn pulse_width(config: &ServoConfig, angle: f64) -> Duration {
    let angle = angle.clamp(0.0, 180.0);
    let span = config.max_pulse_us.saturating_sub(config.min_pulse_us) as f64;
    let micros = config.min_pulse_us as f64 + span * angle / 180.0;
    Duration::from_micros(micros.round() as u64)
}
