use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{DIMMER_COUNT, MAX_DIMMER_LEVEL, SWITCH_COUNT};
use super::frame::DeviceFrame;

/// Last known state of one API component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    /// Dimmer levels 0..=1000
    pub dimmer_levels: [u16; DIMMER_COUNT],
    /// Switch states; slots 0 and 1 are the dimmers' on/off indicators
    pub switches: [bool; SWITCH_COUNT],
    /// Last nonzero level per dimmer
    pub restore_levels: [u16; DIMMER_COUNT],
}

impl Default for InstanceState {
    fn default() -> Self {
        InstanceState {
            dimmer_levels: [0; DIMMER_COUNT],
            switches: [false; SWITCH_COUNT],
            restore_levels: [MAX_DIMMER_LEVEL; DIMMER_COUNT],
        }
    }
}

impl InstanceState {
    /// A dimmer is on iff its paired switch bit is set
    pub fn is_dimmer_on(&self, slot: usize) -> bool {
        self.switches[slot]
    }

    /// Dimmer level as a 0..1 ratio
    pub fn dimming_ratio(&self, slot: usize) -> f64 {
        f64::from(self.dimmer_levels[slot]) / f64::from(MAX_DIMMER_LEVEL)
    }

    /// Wire frame carrying this state for `instance`
    pub fn to_frame(&self, instance: u8) -> DeviceFrame {
        DeviceFrame {
            instance,
            dimmer_levels: self.dimmer_levels,
            switches: self.switches,
        }
    }
}

/// Per-instance device state, created lazily
#[derive(Debug, Default)]
pub struct DeviceStateModel {
    instances: HashMap<u8, InstanceState>,
}

impl DeviceStateModel {
    /// Creates an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `instance`, if a status has been received for it
    pub fn get(&self, instance: u8) -> Option<&InstanceState> {
        self.instances.get(&instance)
    }

    /// State of `instance`, initialized to all off with full restore levels
    pub fn get_or_init(&mut self, instance: u8) -> &mut InstanceState {
        self.instances.entry(instance).or_default()
    }

    /// Overwrites dimmer levels and switch states from `frame`. Restore
    /// levels are kept.
    pub fn update(&mut self, instance: u8, frame: &DeviceFrame) -> &mut InstanceState {
        let state = self.get_or_init(instance);
        state.dimmer_levels = frame.dimmer_levels;
        state.switches = frame.switches;
        state
    }

    /// Number of instances seen
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether no instance has been seen yet
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Known instances in ascending order
    pub fn instances(&self) -> Vec<u8> {
        let mut instances: Vec<_> = self.instances.keys().copied().collect();
        instances.sort_unstable();
        instances
    }
}
