use std::time::{Duration, Instant};

use chrono::Local;
use statum::{machine, state};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::policy::ControlPolicy;
use super::state::{RemoteCommand, SensorSample};
use crate::hardware::{ActuatorDriver, SensorReader};
use crate::mqtt::{ChannelEvent, MQTTMessage};

#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub interval: Duration,
    pub stats_interval: chrono::Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            stats_interval: chrono::Duration::seconds(30),
        }
    }
}

/// Counters since the last stats log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub commands: u64,
    pub publications: u64,
    pub write_failures: u64,
    pub publish_failures: u64,
    pub resyncs: u64,
}

/// Everything gathered during one cycle before any decision is taken.
#[derive(Clone, Debug)]
pub struct CycleInputs {
    pub now: Instant,
    pub sample: SensorSample,
    pub commands: Vec<RemoteCommand>,
    /// The channel asked for every output to be republished.
    pub resync: bool,
}

#[state]
#[derive(Debug, Clone)]
pub enum CycleState {
    Waiting,
    Arbitrating(CycleInputs),
    Emitting,
}

/// One pass per tick: collect inputs, arbitrate, emit effects.
///
/// Arbitration order inside a cycle is fixed: channel resync, local
/// sample, timeout, then remote commands. A remote command therefore has the
/// last word within its cycle but a later local trigger can still override it.
#[machine]
#[derive(Debug)]
pub struct ControlLoop<S: CycleState> {
    policy: Box<dyn ControlPolicy>,
    sensors: Box<dyn SensorReader>,
    // Indexed like policy.outputs()
    actuators: Vec<Box<dyn ActuatorDriver>>,
    inbound: mpsc::Receiver<ChannelEvent>,
    resync: watch::Receiver<u64>,
    outbound: mpsc::Sender<MQTTMessage>,
    settings: LoopSettings,
    stats: LoopStats,
}

impl<S: CycleState> ControlLoop<S> {
    pub fn policy(&self) -> &dyn ControlPolicy {
        self.policy.as_ref()
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }
}

impl ControlLoop<Waiting> {
    pub fn create(
        policy: Box<dyn ControlPolicy>,
        sensors: Box<dyn SensorReader>,
        actuators: Vec<Box<dyn ActuatorDriver>>,
        inbound: mpsc::Receiver<ChannelEvent>,
        resync: watch::Receiver<u64>,
        outbound: mpsc::Sender<MQTTMessage>,
        settings: LoopSettings,
    ) -> Self {
        let outputs = policy.outputs().len();
        if actuators.len() != outputs {
            warn!(
                "{} policy has {} outputs but {} actuators were supplied",
                policy.name(),
                outputs,
                actuators.len()
            );
        }
        info!(
            "Creating control loop for {} policy, {}ms interval",
            policy.name(),
            settings.interval.as_millis()
        );
        Self::new(
            policy,
            sensors,
            actuators,
            inbound,
            resync,
            outbound,
            settings,
            LoopStats::default(),
        )
    }

    /// Samples the sensors and drains the channel inbox without blocking.
    pub fn collect(mut self, now: Instant) -> ControlLoop<Arbitrating> {
        let sample = self.sensors.sample();

        let resync = match self.resync.has_changed() {
            Ok(true) => {
                let generation = *self.resync.borrow_and_update();
                debug!("Resync #{} requested by remote channel", generation);
                true
            }
            Ok(false) | Err(_) => false,
        };

        let mut commands = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(ChannelEvent::Message(msg)) => {
                    debug!("Queued remote message {}", msg);
                    commands.push(msg.into_command());
                }
                Ok(ChannelEvent::Disconnected(reason)) => {
                    warn!("Remote channel lost: {}", reason);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Remote channel task is gone");
                    break;
                }
            }
        }
        self.stats.commands += commands.len() as u64;

        self.transition_with(CycleInputs {
            now,
            sample,
            commands,
            resync,
        })
    }

    pub fn run_cycle(self, now: Instant) -> ControlLoop<Waiting> {
        self.collect(now).arbitrate().emit()
    }
}

impl ControlLoop<Arbitrating> {
    pub fn arbitrate(mut self) -> ControlLoop<Emitting> {
        let Some(inputs) = self.get_state_data().cloned() else {
            warn!("No cycle inputs found in state data, this should not happen");
            return self.transition();
        };

        if inputs.resync {
            info!("Remote channel resync, republishing current state");
            self.stats.resyncs += 1;
            for output in self.policy.outputs_mut() {
                output.invalidate_publication();
            }
        }

        self.policy.on_sample(&inputs.sample, inputs.now);
        self.policy.on_timeout(inputs.now);
        for cmd in &inputs.commands {
            self.policy.on_remote_command(cmd, inputs.now);
        }

        self.transition()
    }
}

impl ControlLoop<Emitting> {
    /// Drives pending writes and hands pending publications to the channel.
    ///
    /// A refused write keeps the output pending and withholds its publication,
    /// so the remote side never hears about a state the hardware did not reach.
    pub fn emit(mut self) -> ControlLoop<Waiting> {
        for idx in 0..self.policy.outputs().len() {
            if let Some(on) = self.policy.outputs_mut()[idx].take_write() {
                let name = self.policy.outputs()[idx].name();
                match self.actuators.get_mut(idx) {
                    Some(driver) => {
                        if let Err(e) = driver.set_actuator(on) {
                            warn!("Writing {} {} failed, retrying next cycle: {}", name, on, e);
                            self.policy.outputs_mut()[idx].restore_write();
                            self.stats.write_failures += 1;
                            continue;
                        }
                    }
                    None => debug!("No actuator fitted for {} output", name),
                }
            }

            let Some(publication) = self.policy.outputs()[idx].pending_publication() else {
                continue;
            };
            let message =
                MQTTMessage::from_topic(publication.topic.clone(), publication.payload.clone());
            match self.outbound.try_send(message) {
                Ok(()) => {
                    debug!("Queued {} for {}", publication.payload, publication.topic);
                    self.policy.outputs_mut()[idx].mark_published(publication.is_on);
                    self.stats.publications += 1;
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        "Outbound queue full, {} for {} retried next cycle",
                        publication.payload, publication.topic
                    );
                    self.stats.publish_failures += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Remote channel task is gone, publication withheld");
                    self.stats.publish_failures += 1;
                }
            }
        }

        self.stats.cycles += 1;
        self.transition()
    }
}

/// Ticks the control loop until `shutdown` is cancelled.
pub async fn run_control_loop(
    mut control: ControlLoop<Waiting>,
    shutdown: CancellationToken,
) -> ControlLoop<Waiting> {
    let settings = control.settings().clone();
    let mut interval_timer = tokio::time::interval(settings.interval);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_stats_time = Local::now();
    let mut reported = LoopStats::default();

    info!("Entering control loop");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Control loop stopping");
                return control;
            }
            _ = interval_timer.tick() => {}
        }

        control = control.run_cycle(Instant::now());

        let now = Local::now();
        if now - last_stats_time > settings.stats_interval {
            let stats = control.stats().clone();
            info!(
                "Control loop stats: {} cycles, {} commands, {} publications, {} write failures, {} publish failures, {} resyncs in {} seconds",
                stats.cycles - reported.cycles,
                stats.commands - reported.commands,
                stats.publications - reported.publications,
                stats.write_failures - reported.write_failures,
                stats.publish_failures - reported.publish_failures,
                stats.resyncs - reported.resyncs,
                (now - last_stats_time).num_seconds()
            );
            reported = stats;
            last_stats_time = now;
        }
    }
}
