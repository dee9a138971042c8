//! Core types and traits for the EmpirBus NXT bridge
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{
    CommandType,
    Config,
    DeviceAddress,
    DeviceKind,
};

/// Highest EmpirBus API component instance
pub const MAX_INSTANCE: u8 = 49;

/// Dimmers per instance in Data Model 2
pub const DIMMER_COUNT: usize = 2;

/// Switches per instance in Data Model 2
pub const SWITCH_COUNT: usize = 8;

/// Dimmer level representing 100% brightness
pub const MAX_DIMMER_LEVEL: u16 = 1000;

/// Default key path devices are published below
pub const DEFAULT_ROOT_PATH: &str = "electrical.switches";

/// Default name of the digital switching system
pub const DEFAULT_BUS_IDENTIFIER: &str = "empirBusNxt";

/// Manufacturer name as reported by the NMEA 2000 analyzer
pub const DEFAULT_MANUFACTURER_CODE: &str = "Empir Bus";
