use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{CommandType, Config, DeviceAddress, DeviceKind, DIMMER_COUNT, SWITCH_COUNT};
use crate::protocol::{
    AssociatedDevice, Delta, InstanceState, Metadata, PathMeta, PathValue, Update,
};

/// Device paths already announced and instances whose command handlers
/// are registered. Only ever grows.
#[derive(Debug, Default)]
pub struct KnownDeviceRegistry {
    announced: HashSet<String>,
    registered: HashSet<u8>,
}

impl KnownDeviceRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a device path, returns `true` the first time it is seen
    pub fn announce(&mut self, device_path: &str) -> bool {
        if self.announced.contains(device_path) {
            return false;
        }
        self.announced.insert(device_path.to_string())
    }

    /// Records an instance's handler registration, returns `true` once
    pub fn register_instance(&mut self, instance: u8) -> bool {
        self.registered.insert(instance)
    }

    /// Whether metadata for `device_path` has been emitted
    pub fn is_announced(&self, device_path: &str) -> bool {
        self.announced.contains(device_path)
    }

    /// Whether command handlers exist for `instance`
    pub fn is_registered(&self, instance: u8) -> bool {
        self.registered.contains(&instance)
    }

    /// Number of announced device paths
    pub fn announced_count(&self) -> usize {
        self.announced.len()
    }
}

/// A command handler the host should install for a leaf path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBinding {
    /// Context the handler is registered in
    pub context: String,
    /// Full leaf path, e.g. `electrical.switches.empirBusNxt-instance0-dimmer1.state`
    pub path: String,
    /// Device the path controls
    pub address: DeviceAddress,
    /// What a PUT on the path changes
    pub command: CommandType,
}

/// Output of projecting one instance's state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    /// Logical instance
    pub instance: u8,
    /// Leaf values, always complete
    pub values: Vec<PathValue>,
    /// Metadata for devices seen for the first time
    pub meta: Vec<PathMeta>,
    /// Handlers to register, non-empty only on an instance's first projection
    pub registrations: Vec<ActionBinding>,
}

impl Projection {
    /// Wraps values and metadata in a delta stamped with `timestamp`
    pub fn to_delta(&self, timestamp: DateTime<Utc>) -> Delta {
        Delta {
            updates: vec![Update {
                timestamp,
                values: self.values.clone(),
                meta: self.meta.clone(),
            }],
        }
    }
}

/// Turns instance state into Signal K path/value records
#[derive(Debug)]
pub struct DeltaProjector {
    config: Config,
    registry: KnownDeviceRegistry,
}

impl DeltaProjector {
    /// Creates a projector publishing below `config.root_path`
    pub fn new(config: Config) -> Self {
        DeltaProjector {
            config,
            registry: KnownDeviceRegistry::new(),
        }
    }

    /// Read access to the registry
    pub fn registry(&self) -> &KnownDeviceRegistry {
        &self.registry
    }

    /// Projects `state` of logical `instance`.
    ///
    /// Dimmers 1..2 publish `state`, `dimmingLevel` and `type`; switches
    /// 3..8 publish `state` and `type`. Switches 1..2 are the dimmers'
    /// indicators and have no paths of their own.
    pub fn project(&mut self, instance: u8, state: &InstanceState) -> Projection {
        let register = self.registry.register_instance(instance);
        let mut projection = Projection {
            instance,
            values: Vec::new(),
            meta: Vec::new(),
            registrations: Vec::new(),
        };

        for index in 1..=DIMMER_COUNT as u8 {
            let address = DeviceAddress {
                instance,
                kind: DeviceKind::Dimmer,
                index,
            };
            let slot = address.slot();
            let device_path = self.config.device_path(&address);
            let state_path = format!("{}.state", device_path);
            // Level 0 is published too so the path always exists
            let level_path = format!("{}.dimmingLevel", device_path);

            projection.values.push(PathValue::new(state_path.as_str(), state.is_dimmer_on(slot)));
            projection.values.push(PathValue::new(level_path.as_str(), state.dimming_ratio(slot)));
            projection.values.push(PathValue::new(format!("{}.type", device_path), "dimmer"));

            if self.registry.announce(&device_path) {
                projection.meta.push(PathMeta {
                    path: state_path.clone(),
                    value: Metadata {
                        units: "bool".to_string(),
                        description: None,
                        display_name: format!("Dimmer {}", address),
                        associated_device: AssociatedDevice::from(&address),
                    },
                });
                projection.meta.push(PathMeta {
                    path: level_path.clone(),
                    value: Metadata {
                        units: "ratio".to_string(),
                        description: Some(
                            "Dimmer brightness ratio, 0<=ratio<=1, 1 is 100%".to_string(),
                        ),
                        display_name: format!("Dimmer {} brightness", address),
                        associated_device: AssociatedDevice::from(&address),
                    },
                });
            }

            if register {
                projection.registrations.push(self.binding(state_path, address, CommandType::State));
                projection.registrations.push(self.binding(level_path, address, CommandType::DimmerLevel));
            }
        }

        for index in (DIMMER_COUNT as u8 + 1)..=SWITCH_COUNT as u8 {
            let address = DeviceAddress {
                instance,
                kind: DeviceKind::Switch,
                index,
            };
            let device_path = self.config.device_path(&address);
            let state_path = format!("{}.state", device_path);

            projection.values.push(PathValue::new(state_path.as_str(), state.switches[address.slot()]));
            projection.values.push(PathValue::new(format!("{}.type", device_path), "switch"));

            if self.registry.announce(&device_path) {
                projection.meta.push(PathMeta {
                    path: state_path.clone(),
                    value: Metadata {
                        units: "bool".to_string(),
                        description: None,
                        display_name: format!("Switch {}", address),
                        associated_device: AssociatedDevice::from(&address),
                    },
                });
            }

            if register {
                projection.registrations.push(self.binding(state_path, address, CommandType::State));
            }
        }

        projection
    }

    fn binding(&self, path: String, address: DeviceAddress, command: CommandType) -> ActionBinding {
        ActionBinding {
            context: self.config.context.clone(),
            path,
            address,
            command,
        }
    }
}
