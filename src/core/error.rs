use std::io;
use thiserror::Error;

/// Custom error types for the EmpirBus NXT bridge
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid switch value {0}")]
    InvalidSwitchValue(String),

    #[error("Invalid dimmer level {0}")]
    InvalidDimmerLevel(String),

    #[error("No status received yet for instance {0}")]
    UnknownInstance(u8),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("PGN 65280 Manufacturer Code {0} ignored")]
    UnrecognizedManufacturer(String),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new malformed frame error
    pub fn malformed_frame(msg: impl Into<String>) -> Self {
        Error::MalformedFrame(msg.into())
    }

    /// Creates a new unknown device error
    pub fn unknown_device(msg: impl Into<String>) -> Self {
        Error::UnknownDevice(msg.into())
    }

    /// Creates a new unsupported command error
    pub fn unsupported_command(msg: impl Into<String>) -> Self {
        Error::UnsupportedCommand(msg.into())
    }

    /// Creates a new bus error
    pub fn bus(msg: impl Into<String>) -> Self {
        Error::Bus(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// HTTP-style status code reported back to the command issuer
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MalformedFrame(_)
            | Error::InvalidSwitchValue(_)
            | Error::InvalidDimmerLevel(_) => 400,
            Error::UnknownInstance(_) | Error::UnknownDevice(_) => 404,
            Error::UnsupportedCommand(_) => 501,
            _ => 500,
        }
    }
}
