//! Bridge between the EmpirBus NXT bus and the Signal K key tree
//!
//! Inbound: analyzer record → [`DeviceFrame`] → [`StateReconciler`] →
//! [`DeltaProjector`] → [`Projection`] for the host store.
//!
//! Outbound: command → [`StateReconciler`] → [`OutboundFrame`] →
//! [`FrameSink`]. Key values are not touched by commands; the NXT answers
//! with a new status frame which updates them.

pub mod projector;
pub mod reconciler;
pub mod service;

pub use self::projector::{ActionBinding, DeltaProjector, KnownDeviceRegistry, Projection};
pub use self::reconciler::{
    parse_dimmer_ratio, parse_switch_value, PendingCommand, StateReconciler,
};
pub use self::service::{BridgeEvent, BridgeHandle, BridgeService};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bus::FrameSink;
use crate::core::{Config, Error, Result};
use crate::protocol::{
    AnalyzerMessage, CommandRequest, CommandResult, DeviceFrame, InstanceState, OutboundFrame,
    PGN_API,
};

/// Single owner of the device state. All mutation goes through `&mut self`.
pub struct Bridge<S> {
    config: Config,
    reconciler: StateReconciler,
    projector: DeltaProjector,
    sink: S,
    status: String,
    last_error: Option<String>,
}

impl<S: FrameSink> Bridge<S> {
    /// Creates a bridge emitting outbound frames to `sink`
    pub fn new(config: Config, sink: S) -> Result<Self> {
        config.validate()?;
        Ok(Bridge {
            reconciler: StateReconciler::new(config.destination),
            projector: DeltaProjector::new(config.clone()),
            config,
            sink,
            status: "Waiting for NMEA2000 connect".to_string(),
            last_error: None,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Latest human readable status
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Message of the latest rejected frame or command
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Cached state of a logical instance
    pub fn state(&self, instance: u8) -> Option<&InstanceState> {
        self.reconciler.model().get(instance)
    }

    /// Handles a record from the analyzer.
    ///
    /// Returns `Ok(None)` for records that are not EmpirBus status, which
    /// includes PGN 65280 records of other manufacturers.
    pub fn handle_analyzer_message(&mut self, message: &AnalyzerMessage) -> Result<Option<Projection>> {
        if message.pgn != PGN_API {
            return Ok(None);
        }

        if !message.is_from(&self.config.manufacturer_code) {
            let ignored = Error::UnrecognizedManufacturer(message.manufacturer_label());
            debug!(pgn = message.pgn, "{}", ignored);
            self.status = ignored.to_string();
            return Ok(None);
        }

        let frame = message
            .data()
            .ok_or_else(|| Error::malformed_frame("record has no Data field"))
            .and_then(DeviceFrame::from_hex);

        match frame {
            Ok(frame) => self.handle_frame(frame).map(Some),
            Err(e) => {
                warn!(pgn = message.pgn, error = %e, "Dropping frame");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Applies a decoded status frame as received from the bus
    pub fn handle_frame(&mut self, frame: DeviceFrame) -> Result<Projection> {
        let (instance, state) = match self.reconciler.apply_frame(frame) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(instance = frame.instance, error = %e, "Dropping frame");
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        debug!(instance, state = ?state, "Received");
        self.status = format!("EmpirBus instance {} status received", instance);

        Ok(self.projector.project(instance, &state))
    }

    /// Applies a command and transmits the instance's new state
    pub fn handle_command(&mut self, request: &CommandRequest) -> CommandResult {
        let address = request.address;
        info!(
            instance = address.instance,
            device = %address.device_name(),
            command = %request.command,
            value = %request.value,
            "Setting device"
        );

        let sent = self.reconciler.prepare_command(request).and_then(|pending| {
            self.sink.emit(pending.frame.clone())?;
            Ok(pending)
        });

        match sent {
            Ok(pending) => {
                self.reconciler.commit(pending);
                self.status = format!(
                    "Device {} {} set to {} (Instance {})",
                    address, request.command, request.value, address.instance
                );
                CommandResult::completed()
            }
            Err(e) => {
                warn!(instance = address.instance, error = %e, "Command rejected");
                self.last_error = Some(format!("{} (Instance {})", e, address.instance));
                CommandResult::rejected(&e)
            }
        }
    }

    /// Routes a PUT on a registered leaf path
    pub fn handle_put(&mut self, path: &str, value: Value) -> CommandResult {
        match self.config.resolve_path(path) {
            Ok((address, command)) => {
                self.handle_command(&CommandRequest::new(address, command, value))
            }
            Err(e) => {
                warn!(path, error = %e, "PUT on unknown path");
                self.last_error = Some(e.to_string());
                CommandResult::rejected(&e)
            }
        }
    }

    /// Sends the ISO request making every NXT report all its instances
    pub fn request_resync(&mut self) -> Result<()> {
        self.sink.emit(OutboundFrame::iso_request(self.config.destination))?;
        info!("ISO request PGN 059904 sent for sync");
        self.status = "ISO request PGN 059904 sent for sync".to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CommandType, DeviceAddress};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<OutboundFrame>>>,
    }

    impl RecordingSink {
        fn frames(&self) -> Vec<OutboundFrame> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl FrameSink for RecordingSink {
        fn emit(&self, frame: OutboundFrame) -> Result<()> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    fn bridge() -> (Bridge<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::default();
        (Bridge::new(Config::default(), sink.clone()).unwrap(), sink)
    }

    fn status_record(data: &str) -> AnalyzerMessage {
        AnalyzerMessage::proprietary(PGN_API, "Empir Bus", data)
    }

    #[test]
    fn test_inbound_record() {
        let (mut bridge, _) = bridge();
        assert_eq!(bridge.status(), "Waiting for NMEA2000 connect");

        let projection = bridge
            .handle_analyzer_message(&status_record("01 f4 01 e8 03 55"))
            .unwrap()
            .unwrap();

        assert_eq!(projection.instance, 0);
        assert_eq!(projection.values[1].path, "electrical.switches.empirBusNxt-instance0-dimmer1.dimmingLevel");
        assert_eq!(projection.values[1].value, json!(0.5));
        assert_eq!(projection.registrations.len(), 10);
        assert_eq!(bridge.status(), "EmpirBus instance 0 status received");
        assert_eq!(bridge.state(0).unwrap().dimmer_levels, [500, 1000]);
    }

    #[test]
    fn test_other_manufacturer_ignored() {
        let (mut bridge, _) = bridge();
        let record = AnalyzerMessage::proprietary(PGN_API, "Maretron", "01f401e80355");

        assert!(bridge.handle_analyzer_message(&record).unwrap().is_none());
        assert_eq!(bridge.status(), "PGN 65280 Manufacturer Code Maretron ignored");
        assert!(bridge.state(0).is_none());
        assert!(bridge.last_error().is_none());
    }

    #[test]
    fn test_other_pgn_skipped() {
        let (mut bridge, _) = bridge();
        let record = AnalyzerMessage::proprietary(127501, "Empir Bus", "01f401e80355");
        assert!(bridge.handle_analyzer_message(&record).unwrap().is_none());
        assert_eq!(bridge.status(), "Waiting for NMEA2000 connect");
    }

    #[test]
    fn test_malformed_record() {
        let (mut bridge, _) = bridge();

        let err = bridge.handle_analyzer_message(&status_record("01 f4 01")).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame(_)));
        assert!(bridge.last_error().is_some());

        let mut record = status_record("");
        record.fields.remove("Data");
        assert!(bridge.handle_analyzer_message(&record).is_err());
        assert!(bridge.state(0).is_none());

        // Later frames are still processed
        assert!(bridge.handle_analyzer_message(&status_record("02f401e80355")).is_ok());
        assert!(bridge.state(1).is_some());
    }

    #[test]
    fn test_command_before_status() {
        let (mut bridge, sink) = bridge();
        let result = bridge.handle_command(&CommandRequest::new(
            DeviceAddress::switch(0, 3).unwrap(),
            CommandType::State,
            true,
        ));

        assert_eq!(result.status_code, 404);
        assert!(sink.frames().is_empty());
    }

    #[test]
    fn test_command_emits_frame() {
        let (mut bridge, sink) = bridge();
        bridge.handle_analyzer_message(&status_record("01 00 00 e8 03 00")).unwrap();

        let result = bridge.handle_command(&CommandRequest::new(
            DeviceAddress::dimmer(0, 1).unwrap(),
            CommandType::State,
            "on",
        ));
        assert!(result.is_success());

        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pgn, PGN_API);
        assert_eq!(&frames[0].payload[..], &[0x30, 0x99, 0x00, 0xe8, 0x03, 0xe8, 0x03, 0x01]);
        assert_eq!(bridge.status(), "Device 0.1 state set to \"on\" (Instance 0)");

        // Key values wait for the NXT's answer
        assert_eq!(bridge.state(0).unwrap().dimmer_levels, [1000, 1000]);
    }

    #[test]
    fn test_rejected_command_emits_nothing() {
        let (mut bridge, sink) = bridge();
        bridge.handle_analyzer_message(&status_record("01 f4 01 e8 03 55")).unwrap();

        let result = bridge.handle_command(&CommandRequest::new(
            DeviceAddress::dimmer(0, 1).unwrap(),
            CommandType::DimmerLevel,
            1.5,
        ));

        assert_eq!(result.status_code, 400);
        assert_eq!(result.message.as_deref(), Some("Invalid dimmer level 1.5"));
        assert!(sink.frames().is_empty());
        assert_eq!(bridge.last_error(), Some("Invalid dimmer level 1.5 (Instance 0)"));
        assert_eq!(bridge.state(0).unwrap().dimmer_levels, [500, 1000]);
    }

    #[test]
    fn test_unsent_command_leaves_state() {
        let (bus, frames) = crate::bus::BusHandle::channel(1);
        drop(frames);
        let mut bridge = Bridge::new(Config::default(), bus).unwrap();
        bridge.handle_analyzer_message(&status_record("01 f4 01 e8 03 00")).unwrap();
        let before = bridge.state(0).unwrap().switches;

        let result = bridge.handle_command(&CommandRequest::new(
            DeviceAddress::switch(0, 5).unwrap(),
            CommandType::State,
            true,
        ));

        assert_eq!(result.status_code, 500);
        assert_eq!(bridge.state(0).unwrap().switches, before);
        assert!(bridge.last_error().is_some());
    }

    #[test]
    fn test_put_by_path() {
        let (mut bridge, sink) = bridge();
        bridge.handle_analyzer_message(&status_record("01 f4 01 e8 03 55")).unwrap();

        let result = bridge.handle_put(
            "electrical.switches.empirBusNxt-instance0-dimmer2.dimmingLevel",
            json!(0.25),
        );
        assert!(result.is_success());
        assert_eq!(bridge.state(0).unwrap().dimmer_levels[1], 250);
        assert_eq!(sink.frames().len(), 1);

        let result = bridge.handle_put("electrical.switches.empirBusNxt-instance0-switch9.state", json!(true));
        assert_eq!(result.status_code, 404);
        assert_eq!(sink.frames().len(), 1);
    }

    #[test]
    fn test_request_resync() {
        let (mut bridge, sink) = bridge();
        bridge.request_resync().unwrap();

        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pgn, 59904);
        assert_eq!(bridge.status(), "ISO request PGN 059904 sent for sync");
    }

    #[test]
    fn test_invalid_config() {
        let config = Config {
            root_path: String::new(),
            ..Config::default()
        };
        assert!(Bridge::new(config, RecordingSink::default()).is_err());
    }
}
