//! Shared data types of the control core
//!
//! An [`Output`] is one actuator line together with the remote mirror of its
//! state. Controllers only ever flip `is_on`; the control loop drains the
//! pending write and publication afterwards, so suppression of redundant
//! traffic lives in one place.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Current state of one actuator and what the remote side last heard about it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActuatorState {
    pub is_on: bool,

    /// Instant at which the actuator reverts to off when nothing re-triggers it.
    /// `None` while no timeout policy is active.
    pub last_trigger_deadline: Option<Instant>,

    /// Last value handed to the remote channel.
    pub last_published: Option<bool>,
}

/// Payload strings used on an outbound state topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub on: String,
    pub off: String,
}

impl Vocabulary {
    pub fn new(on: impl Into<String>, off: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            off: off.into(),
        }
    }

    pub fn payload(&self, is_on: bool) -> &str {
        if is_on {
            &self.on
        } else {
            &self.off
        }
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new("on", "off")
    }
}

/// Inbound message from the remote supervisor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCommand {
    pub target_topic: String,
    pub payload: String,
}

impl RemoteCommand {
    pub fn new(target_topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            target_topic: target_topic.into(),
            payload: payload.into(),
        }
    }

    /// Maps the payload onto a switch target.
    ///
    /// Accepts `on`/`off` in any ASCII casing with surrounding whitespace
    /// trimmed. Everything else yields `None` and is ignored by the caller.
    pub fn switch_target(&self) -> Option<bool> {
        let payload = self.payload.trim();
        if payload.eq_ignore_ascii_case("on") {
            Some(true)
        } else if payload.eq_ignore_ascii_case("off") {
            Some(false)
        } else {
            None
        }
    }

    pub fn is_for(&self, topic: &str) -> bool {
        self.target_topic == topic
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} <- {:?}", self.target_topic, self.payload)
    }
}

/// Readings taken in one poll cycle. `None` means the line is not fitted or
/// the read failed this cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorSample {
    pub motion: Option<bool>,
    pub door: Option<bool>,
    pub climate: Option<(f32, f32)>,
}

/// State publication waiting to be handed to the remote channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: String,
    pub is_on: bool,
}

/// One actuator line and its remote mirror.
#[derive(Clone, Debug)]
pub struct Output {
    name: &'static str,
    state_topic: String,
    vocabulary: Vocabulary,
    state: ActuatorState,
    write_pending: bool,
}

impl Output {
    /// Starts off, with the off write and the first publication pending so the
    /// hardware and the remote mirror are asserted on the first cycle.
    pub fn new(name: &'static str, state_topic: impl Into<String>, vocabulary: Vocabulary) -> Self {
        Self {
            name,
            state_topic: state_topic.into(),
            vocabulary,
            state: ActuatorState::default(),
            write_pending: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state_topic(&self) -> &str {
        &self.state_topic
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state.is_on
    }

    /// Returns true when the value changed.
    pub fn set(&mut self, on: bool) -> bool {
        if self.state.is_on == on {
            return false;
        }
        debug!("{} output {} -> {}", self.name, self.state.is_on, on);
        self.state.is_on = on;
        self.write_pending = true;
        true
    }

    pub(crate) fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.state.last_trigger_deadline = deadline;
    }

    pub fn take_write(&mut self) -> Option<bool> {
        if self.write_pending {
            self.write_pending = false;
            Some(self.state.is_on)
        } else {
            None
        }
    }

    /// Puts a write back after the driver refused it.
    pub fn restore_write(&mut self) {
        self.write_pending = true;
    }

    pub fn pending_publication(&self) -> Option<Publication> {
        if self.state.last_published == Some(self.state.is_on) {
            return None;
        }
        Some(Publication {
            topic: self.state_topic.clone(),
            payload: self.vocabulary.payload(self.state.is_on).to_string(),
            is_on: self.state.is_on,
        })
    }

    pub fn mark_published(&mut self, is_on: bool) {
        self.state.last_published = Some(is_on);
    }

    /// Forgets what the remote side last heard, forcing one republication.
    pub fn invalidate_publication(&mut self) {
        self.state.last_published = None;
    }
}
