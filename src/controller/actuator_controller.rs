//! Edge + timeout control of a single actuator
//!
//! ```text
//!            Rose / remote "on"
//!   ┌─────┐ ───────────────────► ┌────┐ ──┐ Rose: extend window
//!   │ Off │                      │ On │ ◄─┘
//!   └─────┘ ◄─────────────────── └────┘
//!            timeout / remote "off"
//! ```
//!
//! A falling motion line never switches off directly: PIR sensors pulse, so
//! absence of motion is inferred from the timeout only.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::edge_detector::{Edge, EdgeDetector};
use super::policy::ControlPolicy;
use super::state::{ActuatorState, Output, RemoteCommand, SensorSample, Vocabulary};
use super::timeout_timer::TimeoutTimer;

/// What a remote "on" does to the timeout window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOnPolicy {
    /// Starts a fresh window, exactly like a local trigger.
    #[default]
    Retrigger,
    /// Stays on until an explicit remote "off"; local triggers do not arm a window.
    Latch,
}

#[derive(Clone, Debug)]
pub struct MotionSettings {
    pub timeout: Duration,
    pub remote_on: RemoteOnPolicy,
    /// Keep re-arming the window on every poll while the motion line stays high.
    pub hold_while_active: bool,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            remote_on: RemoteOnPolicy::Retrigger,
            hold_while_active: false,
        }
    }
}

#[derive(Debug)]
pub struct ActuatorController {
    settings: MotionSettings,
    command_topic: String,
    output: Output,
    timer: TimeoutTimer,
    motion: EdgeDetector,
    latched: bool,
}

impl ActuatorController {
    pub fn new(
        settings: MotionSettings,
        command_topic: impl Into<String>,
        state_topic: impl Into<String>,
        vocabulary: Vocabulary,
    ) -> Self {
        Self {
            settings,
            command_topic: command_topic.into(),
            output: Output::new("actuator", state_topic, vocabulary),
            timer: TimeoutTimer::new(),
            motion: EdgeDetector::new(),
            latched: false,
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.output.state()
    }

    pub fn is_on(&self) -> bool {
        self.output.is_on()
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn timer(&self) -> &TimeoutTimer {
        &self.timer
    }

    pub fn on_local_edge(&mut self, edge: Edge, now: Instant) {
        if edge != Edge::Rose {
            return;
        }
        if self.latched {
            debug!("Motion while latched on, window not armed");
            return;
        }

        if self.output.set(true) {
            info!(
                "Motion detected, switching on for {}s",
                self.settings.timeout.as_secs()
            );
        } else {
            debug!("Motion while on, extending window");
        }
        self.timer.arm(now, self.settings.timeout);
        self.sync_deadline();
    }

    /// Re-arms the window while the motion line stays high, if configured.
    pub fn on_motion_held(&mut self, now: Instant) {
        if !self.settings.hold_while_active || self.latched || !self.output.is_on() {
            return;
        }
        self.timer.arm(now, self.settings.timeout);
        self.sync_deadline();
    }

    pub fn on_timeout(&mut self, now: Instant) {
        if !self.output.is_on() || !self.timer.is_expired(now) {
            return;
        }
        info!("Motion timeout, switching off");
        self.output.set(false);
        self.timer.disarm();
        self.sync_deadline();
    }

    pub fn on_remote_command(&mut self, cmd: &RemoteCommand, now: Instant) {
        if !cmd.is_for(&self.command_topic) {
            debug!("Ignoring command for foreign topic: {}", cmd);
            return;
        }
        let Some(target) = cmd.switch_target() else {
            debug!("Ignoring unrecognised payload: {}", cmd);
            return;
        };

        let changed = self.output.set(target);
        if target {
            match self.settings.remote_on {
                RemoteOnPolicy::Retrigger => {
                    self.latched = false;
                    self.timer.arm(now, self.settings.timeout);
                }
                RemoteOnPolicy::Latch => {
                    self.latched = true;
                    self.timer.disarm();
                }
            }
        } else {
            self.latched = false;
            self.timer.disarm();
        }
        self.sync_deadline();

        if changed {
            info!("Remote command switched actuator {}", if target { "on" } else { "off" });
        } else {
            debug!("Remote command matches current state: {}", cmd);
        }
    }

    fn sync_deadline(&mut self) {
        self.output.set_deadline(self.timer.deadline());
    }
}

impl ControlPolicy for ActuatorController {
    fn name(&self) -> &'static str {
        "motion"
    }

    fn command_topics(&self) -> Vec<String> {
        vec![self.command_topic.clone()]
    }

    fn on_sample(&mut self, sample: &SensorSample, now: Instant) {
        let Some(level) = sample.motion else {
            return;
        };
        let edge = self.motion.observe(level);
        self.on_local_edge(edge, now);
        if level {
            self.on_motion_held(now);
        }
    }

    fn on_timeout(&mut self, now: Instant) {
        ActuatorController::on_timeout(self, now);
    }

    fn on_remote_command(&mut self, cmd: &RemoteCommand, now: Instant) {
        ActuatorController::on_remote_command(self, cmd, now);
    }

    fn outputs(&self) -> &[Output] {
        std::slice::from_ref(&self.output)
    }

    fn outputs_mut(&mut self) -> &mut [Output] {
        std::slice::from_mut(&mut self.output)
    }
}
