use rppal::gpio::Gpio;
use tracing::info;

use super::config::HardwareConfig;
use super::gpio::{DigitalInput, DigitalOutput};
use super::servo::Servo;
use super::sht3x::Sht3x;
use super::{ActuatorBank, ActuatorDriver, HardwareError, SensorReader};
use crate::config::ProfileConfig;
use crate::controller::StatusLine;

/// Sensor lines fitted on this board.
#[derive(Debug, Default)]
pub struct BoardSensors {
    motion: Option<DigitalInput>,
    door: Option<DigitalInput>,
    climate: Option<Sht3x>,
}

impl SensorReader for BoardSensors {
    fn read_motion(&mut self) -> Result<bool, HardwareError> {
        self.motion
            .as_ref()
            .map(DigitalInput::is_high)
            .ok_or(HardwareError::NotFitted("motion sensor"))
    }

    fn read_door(&mut self) -> Result<bool, HardwareError> {
        self.door
            .as_ref()
            .map(DigitalInput::is_high)
            .ok_or(HardwareError::NotFitted("door sensor"))
    }

    fn read_temperature_humidity(&mut self) -> Result<(f32, f32), HardwareError> {
        match self.climate.as_mut() {
            Some(sensor) => sensor.read(),
            None => Err(HardwareError::NotFitted("climate sensor")),
        }
    }
}

/// Opened devices, actuators ordered like the outputs of the profile's policy.
#[derive(Debug)]
pub struct Board {
    pub sensors: BoardSensors,
    pub actuators: Vec<Box<dyn ActuatorDriver>>,
}

pub fn open_board(
    hardware: &HardwareConfig,
    profile: &ProfileConfig,
) -> Result<Board, HardwareError> {
    let gpio = Gpio::new()?;

    let mut sensors = BoardSensors::default();
    if let Some(pin) = hardware.motion_pin {
        sensors.motion = Some(DigitalInput::floating(&gpio, pin)?);
        info!("Motion sensor on pin {}", pin);
    }
    if let Some(pin) = hardware.door_pin {
        sensors.door = Some(DigitalInput::pull_up(&gpio, pin)?);
        info!("Door sensor on pin {}", pin);
    }
    if let Some(climate) = &hardware.climate {
        sensors.climate = Some(Sht3x::open(climate.bus, climate.address)?);
    }

    let actuators: Vec<Box<dyn ActuatorDriver>> = match profile {
        ProfileConfig::Motion(_) | ProfileConfig::Threshold(_) => {
            vec![Box::new(main_actuator(&gpio, hardware)?)]
        }
        ProfileConfig::Status(status) => {
            let mut banks: Vec<Box<dyn ActuatorDriver>> = Vec::new();
            for line in status.lines() {
                let led_pin = match line.line {
                    StatusLine::Occupancy => hardware.occupancy_led_pin,
                    StatusLine::Door => hardware.door_led_pin,
                };
                let mut bank = ActuatorBank::new();
                if let Some(pin) = led_pin {
                    bank.push(Box::new(DigitalOutput::open(&gpio, "indicator", pin, false)?));
                }
                if bank.is_empty() {
                    info!("No indicator LED for {:?} line, reporting over MQTT only", line.line);
                }
                banks.push(Box::new(bank));
            }
            banks
        }
    };

    Ok(Board { sensors, actuators })
}

fn main_actuator(gpio: &Gpio, hardware: &HardwareConfig) -> Result<ActuatorBank, HardwareError> {
    let mut bank = ActuatorBank::new();
    if let Some(relay) = &hardware.relay {
        bank.push(Box::new(DigitalOutput::open(
            gpio,
            "relay",
            relay.pin,
            relay.active_low,
        )?));
        info!("Relay on pin {} (active low: {})", relay.pin, relay.active_low);
    }
    if let Some(servo) = &hardware.servo {
        info!(
            "Servo on pin {} ({}° on / {}° off)",
            servo.pin, servo.on_angle, servo.off_angle
        );
        bank.push(Box::new(Servo::open(gpio, servo.clone())?));
    }
    if let Some(pin) = hardware.led_pin {
        bank.push(Box::new(DigitalOutput::open(gpio, "led", pin, false)?));
        info!("LED on pin {}", pin);
    }
    Ok(bank)
}
