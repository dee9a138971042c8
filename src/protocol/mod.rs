//! Protocol implementation module
//!
//! This module defines the EmpirBus Application Specific PGN 65280 payload
//! (Data Model 2), its Actisense text rendering, the messages exchanged with
//! the host, and the per-instance device state.

pub mod codec;
pub mod frame;
pub mod message;
pub mod state;

pub use self::codec::{to_actisense, ActisenseCodec};
pub use self::frame::{decode_status, encode_status, DeviceFrame};
pub use self::message::{
    AnalyzerMessage, AssociatedDevice, CommandRequest, CommandResult, CommandState, Delta,
    Metadata, OutboundFrame, PathMeta, PathValue, Update,
};
pub use self::state::{DeviceStateModel, InstanceState};

/// NMEA 2000 proprietary PGN 65280, single frame, global destination
pub const PGN_API: u32 = 65280;

/// NMEA 2000 ISO request PGN 059904
pub const PGN_ISO_REQUEST: u32 = 59904;

/// Global destination address
pub const BROADCAST_ADDRESS: u8 = 255;

/// Manufacturer and industry code header: EmpirBus (304), Marine (4)
pub const MANUFACTURER_TAG: [u8; 2] = [0x30, 0x99];

/// NMEA 2000 registered manufacturer code of EmpirBus
pub const EMPIRBUS_MANUFACTURER_ID: u16 = 304;

/// ISO request for PGN 65280, the NXT answers with every configured instance
pub const ISO_REQUEST_PAYLOAD: [u8; 8] = [0x00, 0xff, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff];
