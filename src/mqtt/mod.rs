//! # MQTT Remote Channel
//!
//! Connects the control loop to the remote supervisor. The handler runs as
//! its own task and exchanges plain messages with the loop over two bounded
//! queues, so the loop never waits on the network:
//!
//! ```text
//!                  ChannelEvent (Message / Disconnected)
//!  broker ──► MqttHandler ─────────────────────────────────► ControlLoop
//!         ◄──             ◄─────────────────────────────────
//!                  MQTTMessage (state publications)
//!                         ─── resync counter (watch) ──────►
//! ```
//!
//! ```text
//! mqtt/
//! ├── config.rs           - broker settings and rumqttc options
//! ├── message_manager.rs  - message and event types, queue ends
//! └── mqtt_handler.rs     - connection task
//! ```
//!
//! Command topics are (re)subscribed on every ConnAck. The ConnAck, and any
//! publication rumqttc refuses after the loop already handed it over, bump
//! the resync counter; the loop then republishes current state. Being a
//! `watch` value, a bump is never lost to a full inbox and repeated bumps
//! coalesce into one republication.

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

pub use config::{MqttConfig, QosLevel};
pub use message_manager::{ChannelEvent, MQTTMessage};
pub use mqtt_handler::{ChannelError, ConnectionState, MQTTStatus, MqttHandler};
