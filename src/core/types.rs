use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Kind of device addressed inside an EmpirBus API component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// One of the two 16 bit dimmer words
    Dimmer,
    /// One of the eight switch bits
    Switch,
}

impl DeviceKind {
    /// Highest 1-based device index for this kind
    pub fn max_index(&self) -> u8 {
        match self {
            DeviceKind::Dimmer => super::DIMMER_COUNT as u8,
            DeviceKind::Switch => super::SWITCH_COUNT as u8,
        }
    }

    /// Value published at the `type` leaf
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Dimmer => "dimmer",
            DeviceKind::Switch => "switch",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a single dimmer or switch on the bus.
///
/// `index` is 1-based, matching the Word 1..2 and Bit 1..8 connector
/// numbering of the EmpirBus API component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    /// Logical instance 0..49
    pub instance: u8,
    /// Dimmer or switch
    pub kind: DeviceKind,
    /// 1-based device number
    pub index: u8,
}

impl DeviceAddress {
    /// Creates a validated device address
    pub fn new(instance: u8, kind: DeviceKind, index: u8) -> Result<Self> {
        if instance > super::MAX_INSTANCE {
            return Err(Error::unknown_device(format!(
                "instance {} is outside 0..={}",
                instance,
                super::MAX_INSTANCE
            )));
        }
        if index == 0 || index > kind.max_index() {
            return Err(Error::unknown_device(format!("{} {}", kind, index)));
        }
        Ok(DeviceAddress { instance, kind, index })
    }

    /// Address of dimmer `index` (1..2)
    pub fn dimmer(instance: u8, index: u8) -> Result<Self> {
        Self::new(instance, DeviceKind::Dimmer, index)
    }

    /// Address of switch `index` (1..8)
    pub fn switch(instance: u8, index: u8) -> Result<Self> {
        Self::new(instance, DeviceKind::Switch, index)
    }

    /// 0-based slot into the per-instance arrays
    pub fn slot(&self) -> usize {
        usize::from(self.index - 1)
    }

    /// Device name inside its instance, e.g. `dimmer 1`
    pub fn device_name(&self) -> String {
        format!("{} {}", self.kind, self.index)
    }

    /// Signal K identifier, e.g. `empirBusNxt-instance0-dimmer1`
    pub fn identifier(&self, bus_identifier: &str) -> String {
        format!(
            "{}-instance{}-{}{}",
            bus_identifier, self.instance, self.kind, self.index
        )
    }

    /// Parses an identifier produced by [`DeviceAddress::identifier`]
    pub fn parse_identifier(bus_identifier: &str, identifier: &str) -> Result<Self> {
        let unknown = || Error::unknown_device(identifier.to_string());

        let rest = identifier
            .strip_prefix(bus_identifier)
            .and_then(|r| r.strip_prefix("-instance"))
            .ok_or_else(unknown)?;
        let (instance, device) = rest.split_once('-').ok_or_else(unknown)?;
        let instance: u8 = instance.parse().map_err(|_| unknown())?;

        let (kind, index) = if let Some(index) = device.strip_prefix("dimmer") {
            (DeviceKind::Dimmer, index)
        } else if let Some(index) = device.strip_prefix("switch") {
            (DeviceKind::Switch, index)
        } else {
            return Err(unknown());
        };
        let index: u8 = index.parse().map_err(|_| unknown())?;

        DeviceAddress::new(instance, kind, index)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.instance, self.index)
    }
}

/// What a command changes on the addressed device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandType {
    /// On/off state
    State,
    /// Dimmer brightness ratio 0..1
    DimmerLevel,
}

impl CommandType {
    /// Path leaf the command is registered at
    pub fn path_leaf(&self) -> &'static str {
        match self {
            CommandType::State => "state",
            CommandType::DimmerLevel => "dimmingLevel",
        }
    }

    /// Inverse of [`CommandType::path_leaf`]
    pub fn from_path_leaf(leaf: &str) -> Option<Self> {
        match leaf {
            "state" => Some(CommandType::State),
            "dimmingLevel" => Some(CommandType::DimmerLevel),
            _ => None,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandType::State => f.write_str("state"),
            CommandType::DimmerLevel => f.write_str("dimmerLevel"),
        }
    }
}

/// Configuration for the EmpirBus NXT bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Key path all devices are published below
    pub root_path: String,
    /// Name of the digital switching system, first part of every identifier
    pub bus_identifier: String,
    /// Context command handlers are registered in
    pub context: String,
    /// Manufacturer name expected in PGN 65280 records
    pub manufacturer_code: String,
    /// Destination address of outbound frames
    pub destination: u8,
    /// Delay between bus availability and the ISO request
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub resync_delay: Duration,
    /// Capacity of the bounded event, frame and delta channels
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root_path: super::DEFAULT_ROOT_PATH.to_string(),
            bus_identifier: super::DEFAULT_BUS_IDENTIFIER.to_string(),
            context: "vessels.self".to_string(),
            manufacturer_code: super::DEFAULT_MANUFACTURER_CODE.to_string(),
            destination: crate::protocol::BROADCAST_ADDRESS,
            resync_delay: Duration::from_secs(2),
            channel_capacity: 100,
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file, missing keys use defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| {
            Error::config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration produces well formed paths
    pub fn validate(&self) -> Result<()> {
        if self.root_path.is_empty() {
            return Err(Error::config("Root path must not be empty"));
        }
        if self.bus_identifier.is_empty() || self.bus_identifier.contains('.') {
            return Err(Error::config(format!(
                "Invalid bus identifier '{}'",
                self.bus_identifier
            )));
        }
        if self.channel_capacity == 0 {
            return Err(Error::config("Channel capacity must be positive"));
        }
        Ok(())
    }

    /// Key path prefix of a device, e.g.
    /// `electrical.switches.empirBusNxt-instance0-switch3`
    pub fn device_path(&self, address: &DeviceAddress) -> String {
        format!("{}.{}", self.root_path, address.identifier(&self.bus_identifier))
    }

    /// Resolves a full leaf path back to the device and command it controls
    pub fn resolve_path(&self, path: &str) -> Result<(DeviceAddress, CommandType)> {
        let unknown = || Error::unknown_device(path.to_string());

        let rest = path
            .strip_prefix(self.root_path.as_str())
            .and_then(|r| r.strip_prefix('.'))
            .ok_or_else(unknown)?;
        let (identifier, leaf) = rest.rsplit_once('.').ok_or_else(unknown)?;
        let command = CommandType::from_path_leaf(leaf).ok_or_else(unknown)?;
        let address = DeviceAddress::parse_identifier(&self.bus_identifier, identifier)?;

        Ok((address, command))
    }
}
