use chrono::NaiveDateTime;
use std::fmt;
use tokio::sync::{mpsc, watch};

use crate::controller::RemoteCommand;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MQTTMessage {
    topic: String,
    content: String,
    timestamp: NaiveDateTime,
}

impl fmt::Display for MQTTMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let preview: String = self.content.chars().take(32).collect();
        write!(f, "{} - {}: {}", self.timestamp, self.topic, preview)
    }
}

impl MQTTMessage {
    pub fn from_topic(topic: String, content: String) -> Self {
        MQTTMessage {
            topic,
            content,
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_command(self) -> RemoteCommand {
        RemoteCommand::new(self.topic, self.content)
    }
}

/// What the channel task reports to the control loop.
///
/// Connects are not queued here: they go through the resync counter so a
/// full inbox cannot swallow them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    Disconnected(String),
    Message(MQTTMessage),
}

/// Queue ends owned by the channel task.
///
/// `resync` is a generation counter. Every bump tells the control loop that
/// the broker may not hold the current state anymore (new session, or a
/// publication lost after it left the loop) and everything is republished.
pub struct MsgManager {
    pub received_msg: mpsc::Sender<ChannelEvent>,
    pub distribution_msg: mpsc::Receiver<MQTTMessage>,
    pub resync: watch::Sender<u64>,
}

impl MsgManager {
    pub fn request_resync(&self) -> u64 {
        self.resync.send_modify(|generation| *generation = generation.wrapping_add(1));
        *self.resync.borrow()
    }
}
