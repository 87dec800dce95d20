use serde::{Deserialize, Serialize};

/// BCM pin assignment. Every device is optional; the profile decides which
/// ones are required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HardwareConfig {
    /// PIR motion sensor, active high.
    pub motion_pin: Option<u8>,
    /// Magnetic door contact to ground with pull-up; high means open.
    pub door_pin: Option<u8>,
    pub relay: Option<RelayConfig>,
    pub servo: Option<ServoConfig>,
    /// LED following the main actuator.
    pub led_pin: Option<u8>,
    /// Status profile indicator LEDs.
    pub occupancy_led_pin: Option<u8>,
    pub door_led_pin: Option<u8>,
    pub climate: Option<ClimateConfig>,
}

impl HardwareConfig {
    pub fn has_actuator(&self) -> bool {
        self.relay.is_some() || self.servo.is_some() || self.led_pin.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub pin: u8,
    #[serde(default)]
    pub active_low: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    pub pin: u8,
    #[serde(default = "default_on_angle")]
    pub on_angle: f64,
    #[serde(default = "default_off_angle")]
    pub off_angle: f64,
    #[serde(default = "default_min_pulse_us")]
    pub min_pulse_us: u64,
    #[serde(default = "default_max_pulse_us")]
    pub max_pulse_us: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateConfig {
    #[serde(default = "default_i2c_bus")]
    pub bus: u8,
    #[serde(default = "default_sht3x_address")]
    pub address: u16,
}

fn default_on_angle() -> f64 {
    5.0
}

fn default_off_angle() -> f64 {
    90.0
}

fn default_min_pulse_us() -> u64 {
    750
}

fn default_max_pulse_us() -> u64 {
    2250
}

fn default_i2c_bus() -> u8 {
    1
}

fn default_sht3x_address() -> u16 {
    0x44
}
