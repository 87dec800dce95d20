//! Mock hardware and channel rig for integration tests.
//!
//! Sensor levels and actuator failures are shared through `Arc<Mutex<_>>`
//! so a test can change them between cycles while the control loop owns
//! the boxed drivers. Motion and door are levels that persist; a climate
//! reading is a single measurement consumed by the next sample, like the
//! SHT3x which reports not-ready between conversions.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use actuatord::controller::{ControlLoop, ControlPolicy, LoopSettings, Waiting};
use actuatord::hardware::{ActuatorDriver, HardwareError, SensorReader};
use actuatord::mqtt::{ChannelEvent, MQTTMessage};
use tokio::sync::{mpsc, watch};

// ── Sensor lines ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Lines {
    pub motion: Option<bool>,
    pub door: Option<bool>,
    pub climate: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Default)]
pub struct MockSensors {
    pub lines: Arc<Mutex<Lines>>,
}

impl SensorReader for MockSensors {
    fn read_motion(&mut self) -> Result<bool, HardwareError> {
        self.lines
            .lock()
            .unwrap()
            .motion
            .ok_or(HardwareError::NotFitted("motion sensor"))
    }

    fn read_door(&mut self) -> Result<bool, HardwareError> {
        self.lines
            .lock()
            .unwrap()
            .door
            .ok_or(HardwareError::NotFitted("door sensor"))
    }

    fn read_temperature_humidity(&mut self) -> Result<(f32, f32), HardwareError> {
        self.lines
            .lock()
            .unwrap()
            .climate
            .take()
            .ok_or(HardwareError::NotReady("climate sensor"))
    }
}

// ── Actuator ──────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ActuatorLog {
    pub writes: Vec<bool>,
    pub failing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockActuator {
    pub log: Arc<Mutex<ActuatorLog>>,
}

impl ActuatorDriver for MockActuator {
    fn set_actuator(&mut self, on: bool) -> Result<(), HardwareError> {
        let mut log = self.log.lock().unwrap();
        if log.failing {
            return Err(HardwareError::InvalidReading("driver refused".to_string()));
        }
        log.writes.push(on);
        Ok(())
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub struct Rig {
    control: Option<ControlLoop<Waiting>>,
    pub sensors: MockSensors,
    pub actuators: Vec<MockActuator>,
    pub to_loop: mpsc::Sender<ChannelEvent>,
    pub resync: watch::Sender<u64>,
    pub from_loop: mpsc::Receiver<MQTTMessage>,
    pub start: Instant,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(policy: Box<dyn ControlPolicy>) -> Self {
        Self::with_capacity(policy, 16)
    }

    pub fn with_capacity(policy: Box<dyn ControlPolicy>, outbound_capacity: usize) -> Self {
        let sensors = MockSensors::default();
        let actuators: Vec<MockActuator> = (0..policy.outputs().len())
            .map(|_| MockActuator::default())
            .collect();
        let (to_loop, inbound) = mpsc::channel(16);
        let (resync, resync_rx) = watch::channel(0u64);
        let (outbound, from_loop) = mpsc::channel(outbound_capacity);

        let drivers: Vec<Box<dyn ActuatorDriver>> = actuators
            .iter()
            .cloned()
            .map(|a| Box::new(a) as Box<dyn ActuatorDriver>)
            .collect();
        let control = ControlLoop::create(
            policy,
            Box::new(sensors.clone()),
            drivers,
            inbound,
            resync_rx,
            outbound,
            LoopSettings::default(),
        );

        Self {
            control: Some(control),
            sensors,
            actuators,
            to_loop,
            resync,
            from_loop,
            start: Instant::now(),
        }
    }

    /// Runs one cycle at `start + secs`.
    pub fn cycle_at(&mut self, secs: u64) {
        let now = self.start + std::time::Duration::from_secs(secs);
        let control = self.control.take().unwrap();
        self.control = Some(control.run_cycle(now));
    }

    pub fn control(&self) -> &ControlLoop<Waiting> {
        self.control.as_ref().unwrap()
    }

    pub fn set_motion(&self, level: bool) {
        self.sensors.lines.lock().unwrap().motion = Some(level);
    }

    pub fn set_door(&self, level: bool) {
        self.sensors.lines.lock().unwrap().door = Some(level);
    }

    pub fn set_climate(&self, temperature: f32, humidity: f32) {
        self.sensors.lines.lock().unwrap().climate = Some((temperature, humidity));
    }

    pub fn command(&self, topic: &str, payload: &str) {
        self.to_loop
            .try_send(ChannelEvent::Message(MQTTMessage::from_topic(
                topic.to_string(),
                payload.to_string(),
            )))
            .unwrap();
    }

    /// What the channel task does on ConnAck or a refused publication.
    pub fn request_resync(&self) {
        self.resync.send_modify(|generation| *generation += 1);
    }

    /// Drains everything the loop handed to the channel as `(topic, payload)`.
    pub fn published(&mut self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        while let Ok(msg) = self.from_loop.try_recv() {
            out.push((msg.topic().to_string(), msg.content().to_string()));
        }
        out
    }

    pub fn payloads(&mut self) -> Vec<String> {
        self.published().into_iter().map(|(_, p)| p).collect()
    }

    pub fn writes(&self, idx: usize) -> Vec<bool> {
        self.actuators[idx].log.lock().unwrap().writes.clone()
    }

    pub fn set_failing(&self, idx: usize, failing: bool) {
        self.actuators[idx].log.lock().unwrap().failing = failing;
    }

    pub fn is_on(&self, idx: usize) -> bool {
        self.control().policy().outputs()[idx].is_on()
    }
}
