//! Control subsystem deciding when actuators switch
//!
//! Building blocks are small synchronous state holders:
//!
//! 1. [`edge_detector`] - level to rising/falling edge conversion
//! 2. [`timeout_timer`] - single deadline, re-armable
//! 3. [`state`] - actuator state, outputs and remote command types
//!
//! The policies combine them behind [`ControlPolicy`]:
//!
//! - [`actuator_controller`] - motion switches on, inactivity switches off
//! - [`threshold_controller`] - climate readings above both limits switch on
//! - [`status_reporter`] - sensor lines mirrored to indicators and topics
//!
//! [`control_loop`] ticks a policy against the hardware and the remote
//! channel.
//!
//! # Architecture
//!
//! ```text
//! Sensors ──┐
//!           ├─► ControlLoop ─► Policy ─► Outputs ─┬─► Actuators
//! Channel ──┘   (collect)     (arbitrate)         └─► Channel
//!                                          (emit)
//! ```
//!
//! Nothing in here blocks or awaits except [`control_loop::run_control_loop`],
//! so every policy can be driven with synthetic `Instant`s in tests.

pub mod actuator_controller;
pub mod control_loop;
pub mod edge_detector;
pub mod policy;
pub mod state;
pub mod status_reporter;
pub mod threshold_controller;
pub mod timeout_timer;

pub use actuator_controller::{ActuatorController, MotionSettings, RemoteOnPolicy};
pub use control_loop::{
    run_control_loop, Arbitrating, ControlLoop, CycleInputs, CycleState, Emitting, LoopSettings,
    LoopStats, Waiting,
};
pub use edge_detector::{Edge, EdgeDetector};
pub use policy::ControlPolicy;
pub use state::{ActuatorState, Output, Publication, RemoteCommand, SensorSample, Vocabulary};
pub use status_reporter::{StatusLine, StatusReporter};
pub use threshold_controller::{ThresholdController, Thresholds};
pub use timeout_timer::TimeoutTimer;
