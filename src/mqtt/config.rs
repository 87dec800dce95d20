use std::time::Duration;

use rumqttc::{MqttOptions, QoS};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QosLevel {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

impl From<QosLevel> for QoS {
    fn from(level: QosLevel) -> Self {
        match level {
            QosLevel::AtMostOnce => QoS::AtMostOnce,
            QosLevel::AtLeastOnce => QoS::AtLeastOnce,
            QosLevel::ExactlyOnce => QoS::ExactlyOnce,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default)]
    pub qos: QosLevel,
    #[serde(default)]
    pub retain: bool,
    /// Capacity of the queues between the channel task and the control loop.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl MqttConfig {
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options
            .set_keep_alive(Duration::from_secs(self.keep_alive_secs))
            .set_clean_session(true);
        if let Some(user) = &self.username {
            options.set_credentials(user.clone(), self.password.clone().unwrap_or_default());
        }
        options
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "actuatord".to_string()
}

fn default_keep_alive_secs() -> u64 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_channel_capacity() -> usize {
    64
}
