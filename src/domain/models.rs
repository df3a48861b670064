use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in uploaded reports (local time).
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What the operator wants to hear about. At least one field must be set
/// for a session to start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanTarget {
    pub address: Option<String>,
    pub manufacturer: Option<String>,
}

impl ScanTarget {
    /// Build a target from raw preference values. Empty strings are unset.
    pub fn from_preferences(address: &str, manufacturer: &str) -> Self {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Self {
            address: non_empty(address),
            manufacturer: non_empty(manufacturer),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.address.is_some() || self.manufacturer.is_some()
    }
}

/// One advertisement as delivered by the radio capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Device address, canonical uppercase ("AA:BB:CC:DD:EE:FF")
    pub address: String,
    pub rssi: i16,
    /// Raw advertisement record, possibly zero-padded
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// A filtered and decoded observation of a target device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub address: String,
    pub rssi: i16,
    /// `0x` + uppercase hex of the structurally valid advertisement prefix
    pub payload_hex: String,
    pub observed_at: DateTime<Local>,
}

impl Sighting {
    pub fn to_payload(&self) -> ReportPayload {
        ReportPayload {
            data: self.payload_hex.clone(),
            mac: self.address.clone(),
            rssi: self.rssi.to_string(),
            time: self.observed_at.format(REPORT_TIME_FORMAT).to_string(),
        }
    }
}

/// Body handed to the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub data: String,
    pub mac: String,
    pub rssi: String,
    pub time: String,
}

/// Radio duty cycle requested for each scan window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    LowPower,
    Balanced,
    #[default]
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Scanning,
    Restarting,
    Stopped,
}

/// Replay files carry advertisement bytes as hex strings.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let s = s.trim_start_matches("0x").replace(' ', "");
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
