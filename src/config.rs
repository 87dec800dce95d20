//! Daemon configuration
//!
//! Loaded once from a TOML file before the control loop starts and never
//! changed afterwards. Anything ambiguous (missing thresholds, empty topics,
//! a profile without the devices it needs) is rejected here so the loop only
//! ever runs with complete control parameters.
//!
//! ```toml
//! loop_interval_ms = 100
//!
//! [mqtt]
//! host = "io.adafruit.com"
//! client_id = "outlet-01"
//!
//! [profile]
//! kind = "motion"
//! command_topic = "foxyhamster/feeds/outlet-set"
//! state_topic = "foxyhamster/feeds/outlet-state"
//! timeout_secs = 300
//!
//! [hardware]
//! motion_pin = 17
//! relay = { pin = 27 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::controller::{
    ActuatorController, ControlPolicy, MotionSettings, RemoteOnPolicy, StatusLine,
    StatusReporter, ThresholdController, Thresholds, Vocabulary,
};
use crate::hardware::config::HardwareConfig;
use crate::mqtt::MqttConfig;

const CONFIG_DIR: &str = ".config/actuatord";
const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "ACTUATORD_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    pub mqtt: MqttConfig,
    pub profile: ProfileConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileConfig {
    Motion(MotionProfile),
    Threshold(ThresholdProfile),
    Status(StatusProfile),
}

/// Edge + timeout switch. Without a motion pin it is a plain remote switch.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct MotionProfile {
    pub command_topic: String,
    pub state_topic: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub remote_on: RemoteOnPolicy,
    #[serde(default)]
    pub hold_while_active: bool,
    #[serde(default)]
    pub payloads: Vocabulary,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ThresholdProfile {
    pub temperature_threshold: f32,
    pub humidity_threshold: f32,
    pub state_topic: String,
    pub command_topic: Option<String>,
    #[serde(default)]
    pub payloads: Vocabulary,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct StatusProfile {
    pub occupancy_topic: Option<String>,
    pub door_topic: Option<String>,
    pub occupancy_payloads: Option<Vocabulary>,
    pub door_payloads: Option<Vocabulary>,
}

/// One reported line of the status profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLineConfig {
    pub line: StatusLine,
    pub topic: String,
    pub payloads: Vocabulary,
}

impl StatusProfile {
    /// Enabled lines, occupancy first. Actuator banks are built in the same order.
    pub fn lines(&self) -> Vec<StatusLineConfig> {
        let entries = [
            (StatusLine::Occupancy, &self.occupancy_topic, &self.occupancy_payloads),
            (StatusLine::Door, &self.door_topic, &self.door_payloads),
        ];
        entries
            .into_iter()
            .filter_map(|(line, topic, payloads)| {
                topic.as_ref().map(|topic| StatusLineConfig {
                    line,
                    topic: topic.clone(),
                    payloads: payloads
                        .clone()
                        .unwrap_or_else(|| line.default_vocabulary()),
                })
            })
            .collect()
    }
}

impl ProfileConfig {
    pub fn build_policy(&self) -> Box<dyn ControlPolicy> {
        match self {
            ProfileConfig::Motion(motion) => Box::new(ActuatorController::new(
                MotionSettings {
                    timeout: Duration::from_secs(motion.timeout_secs),
                    remote_on: motion.remote_on,
                    hold_while_active: motion.hold_while_active,
                },
                motion.command_topic.clone(),
                motion.state_topic.clone(),
                motion.payloads.clone(),
            )),
            ProfileConfig::Threshold(threshold) => Box::new(ThresholdController::new(
                Thresholds {
                    temperature: threshold.temperature_threshold,
                    humidity: threshold.humidity_threshold,
                },
                threshold.command_topic.clone(),
                threshold.state_topic.clone(),
                threshold.payloads.clone(),
            )),
            ProfileConfig::Status(status) => {
                let reporter = status
                    .lines()
                    .into_iter()
                    .fold(StatusReporter::new(), |reporter, line| {
                        reporter.with_line(line.line, line.topic, line.payloads)
                    });
                Box::new(reporter)
            }
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads, applies environment overrides and validates.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `MQTT_BROKER`, `MQTT_PORT`, `MQTT_USERNAME` and `MQTT_PASSWORD` take
    /// precedence over the file.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("MQTT_BROKER") {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup("MQTT_PORT") {
            self.mqtt.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("MQTT_PORT is not a port: {port}")))?;
        }
        if let Some(user) = lookup("MQTT_USERNAME") {
            self.mqtt.username = Some(user);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_interval_ms == 0 {
            return Err(invalid("loop_interval_ms must be positive"));
        }
        if self.mqtt.host.trim().is_empty() {
            return Err(invalid("mqtt.host is empty"));
        }
        if self.mqtt.client_id.trim().is_empty() {
            return Err(invalid("mqtt.client_id is empty"));
        }
        if self.mqtt.channel_capacity == 0 {
            return Err(invalid("mqtt.channel_capacity must be positive"));
        }
        if self.mqtt.password.is_some() && self.mqtt.username.is_none() {
            warn!("mqtt.password is set without a username and will be ignored");
        }

        let hardware = &self.hardware;
        match &self.profile {
            ProfileConfig::Motion(motion) => {
                require_topic("profile.command_topic", &motion.command_topic)?;
                require_topic("profile.state_topic", &motion.state_topic)?;
                require_payloads(&motion.payloads)?;
                if motion.timeout_secs == 0 {
                    return Err(invalid("profile.timeout_secs must be positive"));
                }
                if !hardware.has_actuator() {
                    return Err(invalid("motion profile needs a relay, servo or led_pin"));
                }
                if hardware.motion_pin.is_none() {
                    info!("No motion_pin configured, running as a remote switch");
                }
            }
            ProfileConfig::Threshold(threshold) => {
                if !threshold.temperature_threshold.is_finite()
                    || !threshold.humidity_threshold.is_finite()
                {
                    return Err(invalid("thresholds must be finite numbers"));
                }
                require_topic("profile.state_topic", &threshold.state_topic)?;
                if let Some(topic) = &threshold.command_topic {
                    require_topic("profile.command_topic", topic)?;
                }
                require_payloads(&threshold.payloads)?;
                if hardware.climate.is_none() {
                    return Err(invalid("threshold profile needs hardware.climate"));
                }
                if !hardware.has_actuator() {
                    return Err(invalid("threshold profile needs a relay, servo or led_pin"));
                }
            }
            ProfileConfig::Status(status) => {
                let lines = status.lines();
                if lines.is_empty() {
                    return Err(invalid("status profile needs occupancy_topic or door_topic"));
                }
                for line in &lines {
                    require_topic("status topic", &line.topic)?;
                    require_payloads(&line.payloads)?;
                    let fitted = match line.line {
                        StatusLine::Occupancy => hardware.motion_pin.is_some(),
                        StatusLine::Door => hardware.door_pin.is_some(),
                    };
                    if !fitted {
                        return Err(invalid(format!(
                            "status line {:?} has a topic but no input pin",
                            line.line
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }
}

/// CLI argument, then `ACTUATORD_CONFIG`, then `~/.config/actuatord/config.toml`.
pub fn resolve_config_path(arg: Option<String>) -> PathBuf {
    if let Some(path) = arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn require_topic(name: &str, topic: &str) -> Result<(), ConfigError> {
    if topic.trim().is_empty() {
        return Err(invalid(format!("{name} is empty")));
    }
    if topic.contains(['+', '#']) {
        return Err(invalid(format!("{name} must not contain wildcards: {topic}")));
    }
    Ok(())
}

fn require_payloads(payloads: &Vocabulary) -> Result<(), ConfigError> {
    if payloads.on.is_empty() || payloads.off.is_empty() || payloads.on == payloads.off {
        return Err(invalid(format!(
            "state payloads must be distinct and non-empty: {:?}",
            payloads
        )));
    }
    Ok(())
}

fn default_loop_interval_ms() -> u64 {
    100
}

fn default_timeout_secs() -> u64 {
    300
}
