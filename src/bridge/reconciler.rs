use serde_json::Value;
use tracing::{debug, warn};

use crate::core::{
    CommandType, DeviceAddress, DeviceKind, Error, Result, DIMMER_COUNT, MAX_DIMMER_LEVEL,
};
use crate::protocol::{
    CommandRequest, DeviceFrame, DeviceStateModel, InstanceState, OutboundFrame, PGN_API,
};

/// Applies received status frames and outbound commands to the device
/// state model.
///
/// Inbound frames always win: they overwrite levels and switches wholesale.
/// Commands are prepared on a copy of the cached state and committed once
/// their frame is sent. The device confirms with a fresh status frame later.
#[derive(Debug)]
pub struct StateReconciler {
    model: DeviceStateModel,
    destination: u8,
}

impl StateReconciler {
    /// Creates a reconciler addressing outbound frames to `destination`
    pub fn new(destination: u8) -> Self {
        StateReconciler {
            model: DeviceStateModel::new(),
            destination,
        }
    }

    /// Read access to the cached state
    pub fn model(&self) -> &DeviceStateModel {
        &self.model
    }

    /// Applies a frame as received from the bus. The wire instance is
    /// mapped to the logical instance here and nowhere else.
    ///
    /// Returns the logical instance and the resulting state.
    pub fn apply_frame(&mut self, frame: DeviceFrame) -> Result<(u8, InstanceState)> {
        let mut frame = frame.into_logical()?;
        let instance = frame.instance;

        for (slot, level) in frame.dimmer_levels.iter_mut().enumerate() {
            if *level > MAX_DIMMER_LEVEL {
                warn!(instance, dimmer = slot + 1, level = *level, "Dimmer level out of range, clamping");
                *level = MAX_DIMMER_LEVEL;
            }
        }

        let state = self.model.update(instance, &frame);

        // A level of 0 keeps the last brightness for switching back on
        for slot in 0..DIMMER_COUNT {
            let level = state.dimmer_levels[slot];
            if level > 0 {
                state.restore_levels[slot] = level;
                debug!(instance, dimmer = slot + 1, level, "Dimmer level saved");
            }
        }

        Ok((instance, *state))
    }

    /// Validates and applies a command, returning the frame carrying the
    /// instance's complete new state. Nothing is mutated on error.
    pub fn apply_command(&mut self, request: &CommandRequest) -> Result<OutboundFrame> {
        let pending = self.prepare_command(request)?;
        let frame = pending.frame.clone();
        self.commit(pending);
        Ok(frame)
    }

    /// Validates a command against a copy of the cached state. The cache is
    /// left untouched until the result is passed to [`commit`](Self::commit).
    pub fn prepare_command(&self, request: &CommandRequest) -> Result<PendingCommand> {
        let address = DeviceAddress::new(
            request.address.instance,
            request.address.kind,
            request.address.index,
        )?;
        let mut state = *self
            .model
            .get(address.instance)
            .ok_or(Error::UnknownInstance(address.instance))?;
        let slot = address.slot();

        match request.command {
            CommandType::State => {
                let on = parse_switch_value(&request.value)?;
                state.switches[slot] = on;
                // A dimmer can not be on at level 0
                if on && slot < DIMMER_COUNT && state.dimmer_levels[slot] == 0 {
                    state.dimmer_levels[slot] = MAX_DIMMER_LEVEL;
                }
            }
            CommandType::DimmerLevel => {
                if address.kind != DeviceKind::Dimmer {
                    return Err(Error::unsupported_command(format!(
                        "{} has no dimming level",
                        address.device_name()
                    )));
                }
                let level = parse_dimmer_ratio(&request.value)?;
                state.dimmer_levels[slot] = level;
                if level == 0 {
                    state.switches[slot] = false;
                }
            }
        }

        Ok(PendingCommand {
            instance: address.instance,
            state,
            frame: OutboundFrame::new(
                PGN_API,
                self.destination,
                state.to_frame(address.instance).encode(),
            ),
        })
    }

    /// Stores the state of a command whose frame was transmitted
    pub fn commit(&mut self, pending: PendingCommand) {
        debug!(instance = pending.instance, state = ?pending.state, "Command applied");
        *self.model.get_or_init(pending.instance) = pending.state;
    }
}

/// A validated command waiting for its frame to be sent
#[derive(Debug, Clone)]
pub struct PendingCommand {
    /// Logical instance
    pub instance: u8,
    /// State after the command
    pub state: InstanceState,
    /// Frame carrying `state`
    pub frame: OutboundFrame,
}

/// Accepts `true`, `false`, `"on"`, `"off"`, `1` and `0`
pub fn parse_switch_value(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(on) => Ok(*on),
        Value::String(s) if s == "on" => Ok(true),
        Value::String(s) if s == "off" => Ok(false),
        Value::Number(n) if n.as_f64() == Some(1.0) => Ok(true),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(false),
        other => Err(Error::InvalidSwitchValue(display_value(other))),
    }
}

/// Converts a 0..=1 brightness ratio to a dimmer level 0..=1000
pub fn parse_dimmer_ratio(value: &Value) -> Result<u16> {
    value
        .as_f64()
        .filter(|ratio| (0.0..=1.0).contains(ratio))
        .map(|ratio| (ratio * f64::from(MAX_DIMMER_LEVEL)).round() as u16)
        .ok_or_else(|| Error::InvalidDimmerLevel(display_value(value)))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
