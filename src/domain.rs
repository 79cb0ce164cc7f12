use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// a stored sensor reading
/// the timestamp is assigned by the store on receipt, never by the sender
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub station_id: Option<String>,
    pub station_name: Option<String>,

    /// celsius
    pub temperature: Option<f64>,
    /// relative humidity (0-100%)
    pub humidity: Option<f64>,
    pub ph: Option<f64>,
    pub co2_ppm: Option<f64>,
    /// lux
    pub light_intensity: Option<f64>,
    pub water_level: Option<f64>,

    // gps block
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub satellites: Option<u32>,
    pub altitude: Option<f64>,
    pub gps_valid: bool,
}

/// a partial reading: what a device posts, what a client sends as overrides,
/// and the shape of the configured fallback profile
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SensorInput {
    pub station_id: Option<String>,
    pub station_name: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub ph: Option<f64>,
    pub co2_ppm: Option<f64>,
    pub light_intensity: Option<f64>,
    pub water_level: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub satellites: Option<u32>,
    pub altitude: Option<f64>,
    pub gps_valid: Option<bool>,
}

impl SensorInput {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// who spoke a chat turn
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// one role-tagged message, both in client history and on the wire upstream
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}
