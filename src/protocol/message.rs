use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{CommandType, DeviceAddress, Error};
use super::{EMPIRBUS_MANUFACTURER_ID, ISO_REQUEST_PAYLOAD, PGN_ISO_REQUEST};

/// A decoded NMEA 2000 record as emitted by the analyzer, e.g.
/// `{"pgn":65280,"fields":{"Manufacturer Code":"Empir Bus","Data":"01 f4 01 e8 03 55"}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerMessage {
    /// Parameter group number
    pub pgn: u32,
    /// Source address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<u8>,
    /// Destination address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<u8>,
    /// Decoded fields keyed by their analyzer names
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl AnalyzerMessage {
    /// Creates a proprietary record carrying a manufacturer code and hex data
    pub fn proprietary(pgn: u32, manufacturer_code: impl Into<Value>, data: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("Manufacturer Code".to_string(), manufacturer_code.into());
        fields.insert("Data".to_string(), Value::String(data.into()));
        AnalyzerMessage {
            pgn,
            src: None,
            dst: None,
            fields,
        }
    }

    /// The `Manufacturer Code` field, either a name or the numeric code
    pub fn manufacturer_code(&self) -> Option<&Value> {
        self.fields.get("Manufacturer Code")
    }

    /// The hex rendered proprietary payload
    pub fn data(&self) -> Option<&str> {
        self.fields.get("Data").and_then(Value::as_str)
    }

    /// Whether the record was sent by the expected manufacturer.
    ///
    /// Names compare ignoring case and whitespace ("Empir Bus" matches
    /// "Empirbus"); numeric codes compare against the registered id.
    pub fn is_from(&self, manufacturer: &str) -> bool {
        match self.manufacturer_code() {
            Some(Value::String(name)) => normalize(name) == normalize(manufacturer),
            Some(Value::Number(code)) => code.as_u64() == Some(u64::from(EMPIRBUS_MANUFACTURER_ID)),
            _ => false,
        }
    }

    /// Manufacturer code rendered for status and log output
    pub fn manufacturer_label(&self) -> String {
        match self.manufacturer_code() {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => "(none)".to_string(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A payload queued for transmission on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Creation time, rendered into the Actisense line
    pub timestamp: DateTime<Utc>,
    /// Parameter group number
    pub pgn: u32,
    /// Destination address, 255 for all nodes
    pub destination: u8,
    /// Raw payload bytes
    pub payload: Bytes,
}

impl OutboundFrame {
    /// Creates a frame stamped with the current time
    pub fn new(pgn: u32, destination: u8, payload: Bytes) -> Self {
        OutboundFrame {
            timestamp: Utc::now(),
            pgn,
            destination,
            payload,
        }
    }

    /// ISO request asking every NXT to transmit all configured instances
    pub fn iso_request(destination: u8) -> Self {
        Self::new(
            PGN_ISO_REQUEST,
            destination,
            Bytes::from_static(&ISO_REQUEST_PAYLOAD),
        )
    }

    /// Actisense serial rendering of this frame
    pub fn to_actisense(&self) -> String {
        super::codec::to_actisense(&self.timestamp, self.pgn, &self.payload, self.destination)
    }
}

/// A request to change one device, as routed from a PUT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Target device
    pub address: DeviceAddress,
    /// Property being changed
    pub command: CommandType,
    /// Requested value, a switch state or a brightness ratio
    pub value: Value,
}

impl CommandRequest {
    /// Creates a new command request
    pub fn new(address: DeviceAddress, command: CommandType, value: impl Into<Value>) -> Self {
        CommandRequest {
            address,
            command,
            value: value.into(),
        }
    }
}

/// Completion state of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandState {
    /// Handled synchronously, successfully or not
    Completed,
}

/// Outcome of a command reported back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Completion state
    pub state: CommandState,
    /// 200 on success, 4xx/5xx on rejection
    pub status_code: u16,
    /// Reason for a rejection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResult {
    /// Successful command
    pub fn completed() -> Self {
        CommandResult {
            state: CommandState::Completed,
            status_code: 200,
            message: None,
        }
    }

    /// Rejected command
    pub fn rejected(error: &Error) -> Self {
        CommandResult {
            state: CommandState::Completed,
            status_code: error.status_code(),
            message: Some(error.to_string()),
        }
    }

    /// Whether the command was accepted
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Path/value update in Signal K delta format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    /// Updates, one per processed frame
    pub updates: Vec<Update>,
}

/// A single timestamped update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    /// Time the update was produced
    #[serde(serialize_with = "crate::core::serde::serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Leaf values
    pub values: Vec<PathValue>,
    /// Metadata, only present the first time a device is seen
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meta: Vec<PathMeta>,
}

/// A value at a key path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathValue {
    /// Full key path
    pub path: String,
    /// Leaf value
    pub value: Value,
}

impl PathValue {
    /// Creates a new path/value pair
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        PathValue {
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Metadata for a key path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathMeta {
    /// Full key path
    pub path: String,
    /// Metadata describing the leaf
    pub value: Metadata,
}

/// Units, names and device address of a leaf
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// `bool` or `ratio`
    pub units: String,
    /// Longer description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// System name, e.g. `Dimmer 0.1`
    pub display_name: String,
    /// Technical address in the EmpirBus API
    pub associated_device: AssociatedDevice,
}

/// Technical address of a device in the EmpirBus API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociatedDevice {
    /// API component instance
    pub instance: u8,
    /// Device inside the instance, e.g. `dimmer 1`
    pub device: String,
}

impl From<&DeviceAddress> for AssociatedDevice {
    fn from(address: &DeviceAddress) -> Self {
        AssociatedDevice {
            instance: address.instance,
            device: address.device_name(),
        }
    }
}
