use std::fmt;
use std::time::Instant;

use super::state::{Output, RemoteCommand, SensorSample};

/// Decision logic plugged into the control loop.
///
/// A deployment runs exactly one policy. The loop calls the hooks in a fixed
/// order each cycle (`on_sample`, `on_timeout`, then `on_remote_command` for
/// every queued command) and afterwards drains the pending effects of
/// [`outputs_mut`](ControlPolicy::outputs_mut). Hooks never fail: unknown
/// topics and payloads are ignored.
pub trait ControlPolicy: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// Topics the remote channel has to subscribe to for this policy.
    fn command_topics(&self) -> Vec<String>;

    fn on_sample(&mut self, sample: &SensorSample, now: Instant);

    fn on_timeout(&mut self, _now: Instant) {}

    fn on_remote_command(&mut self, cmd: &RemoteCommand, now: Instant);

    /// Outputs in the same order as the actuator drivers handed to the loop.
    fn outputs(&self) -> &[Output];

    fn outputs_mut(&mut self) -> &mut [Output];
}
