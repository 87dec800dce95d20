//! Level-triggered climate control (fan profile)
//!
//! On when temperature and humidity both exceed their thresholds, off as soon
//! as either drops back. There is no hysteresis band, so a reading sitting on
//! the boundary can chatter from one measurement to the next.
//!
//! Only fresh measurements are evaluated: a sample without climate data (the
//! sensor between conversions) leaves the output alone. A remote override
//! therefore holds until the next measurement, not just until the next cycle.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::policy::ControlPolicy;
use super::state::{ActuatorState, Output, RemoteCommand, SensorSample, Vocabulary};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: f32,
    pub humidity: f32,
}

impl Thresholds {
    pub fn exceeded_by(&self, temperature: f32, humidity: f32) -> bool {
        temperature > self.temperature && humidity > self.humidity
    }
}

#[derive(Debug)]
pub struct ThresholdController {
    thresholds: Thresholds,
    command_topic: Option<String>,
    output: Output,
}

impl ThresholdController {
    /// Without a command topic the controller is purely automatic.
    pub fn new(
        thresholds: Thresholds,
        command_topic: Option<String>,
        state_topic: impl Into<String>,
        vocabulary: Vocabulary,
    ) -> Self {
        Self {
            thresholds,
            command_topic,
            output: Output::new("fan", state_topic, vocabulary),
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.output.state()
    }

    pub fn is_on(&self) -> bool {
        self.output.is_on()
    }

    pub fn on_reading(&mut self, temperature: f32, humidity: f32) {
        let target = self.thresholds.exceeded_by(temperature, humidity);
        if self.output.set(target) {
            info!(
                "Climate {:.1}°C / {:.1}% crossed {:.1}°C / {:.1}%, switching {}",
                temperature,
                humidity,
                self.thresholds.temperature,
                self.thresholds.humidity,
                if target { "on" } else { "off" }
            );
        }
    }

    pub fn on_remote_command(&mut self, cmd: &RemoteCommand) {
        let Some(topic) = self.command_topic.as_deref() else {
            return;
        };
        if !cmd.is_for(topic) {
            return;
        }
        match cmd.switch_target() {
            Some(target) => {
                if self.output.set(target) {
                    info!("Remote override until next reading: {}", cmd);
                }
            }
            None => debug!("Ignoring unrecognised payload: {}", cmd),
        }
    }
}

impl ControlPolicy for ThresholdController {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn command_topics(&self) -> Vec<String> {
        self.command_topic.iter().cloned().collect()
    }

    fn on_sample(&mut self, sample: &SensorSample, _now: Instant) {
        if let Some((temperature, humidity)) = sample.climate {
            self.on_reading(temperature, humidity);
        }
    }

    fn on_remote_command(&mut self, cmd: &RemoteCommand, _now: Instant) {
        ThresholdController::on_remote_command(self, cmd);
    }

    fn outputs(&self) -> &[Output] {
        std::slice::from_ref(&self.output)
    }

    fn outputs_mut(&mut self) -> &mut [Output] {
        std::slice::from_mut(&mut self.output)
    }
}
