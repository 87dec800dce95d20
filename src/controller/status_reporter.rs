//! Occupancy and door status mirror
//!
//! Each fitted line drives an indicator LED that follows its level and a
//! state topic that is republished only when the level changes.

use std::time::Instant;

use tracing::{debug, info};

use super::edge_detector::{Edge, EdgeDetector};
use super::policy::ControlPolicy;
use super::state::{Output, RemoteCommand, SensorSample, Vocabulary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLine {
    Occupancy,
    Door,
}

impl StatusLine {
    fn name(self) -> &'static str {
        match self {
            StatusLine::Occupancy => "occupancy",
            StatusLine::Door => "door",
        }
    }

    fn level(self, sample: &SensorSample) -> Option<bool> {
        match self {
            StatusLine::Occupancy => sample.motion,
            StatusLine::Door => sample.door,
        }
    }

    pub fn default_vocabulary(self) -> Vocabulary {
        match self {
            StatusLine::Occupancy => Vocabulary::new("yes", "no"),
            StatusLine::Door => Vocabulary::new("OPEN", "CLOSED"),
        }
    }
}

#[derive(Debug)]
pub struct StatusReporter {
    lines: Vec<(StatusLine, EdgeDetector)>,
    outputs: Vec<Output>,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Lines are reported in the order they are added.
    pub fn with_line(
        mut self,
        line: StatusLine,
        state_topic: impl Into<String>,
        vocabulary: Vocabulary,
    ) -> Self {
        self.lines.push((line, EdgeDetector::new()));
        self.outputs
            .push(Output::new(line.name(), state_topic, vocabulary));
        self
    }

    pub fn is_active(&self, line: StatusLine) -> Option<bool> {
        self.lines
            .iter()
            .zip(&self.outputs)
            .find(|((l, _), _)| *l == line)
            .map(|(_, output)| output.is_on())
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPolicy for StatusReporter {
    fn name(&self) -> &'static str {
        "status"
    }

    fn command_topics(&self) -> Vec<String> {
        Vec::new()
    }

    fn on_sample(&mut self, sample: &SensorSample, _now: Instant) {
        for ((line, detector), output) in self.lines.iter_mut().zip(self.outputs.iter_mut()) {
            let Some(level) = line.level(sample) else {
                continue;
            };
            match detector.observe(level) {
                Edge::Rose => info!("{} line went active", line.name()),
                Edge::Fell => info!("{} line went inactive", line.name()),
                Edge::Unchanged => {}
            }
            output.set(level);
        }
    }

    fn on_remote_command(&mut self, cmd: &RemoteCommand, _now: Instant) {
        debug!("Status reporter takes no commands, ignoring {}", cmd);
    }

    fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    fn outputs_mut(&mut self) -> &mut [Output] {
        &mut self.outputs
    }
}
