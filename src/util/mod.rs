//! Utility module
//!
//! This module provides common utilities and helper functions used
//! throughout the library.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::{Error, Result};

/// Decodes a hex payload, ignoring any whitespace between the digits
pub fn parse_hex_payload(data: &str) -> Result<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact)
        .map_err(|e| Error::malformed_frame(format!("invalid hex payload '{}': {}", data, e)))
}

/// ISO-8601 rendering with millisecond precision and `Z` suffix
pub fn iso_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Installs a fmt subscriber; `RUST_LOG` overrides `default_level`
pub fn init_logging(default_level: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::config(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_hex_payload() {
        assert_eq!(
            parse_hex_payload("01 F4 01\ne8 03 55").unwrap(),
            vec![0x01, 0xf4, 0x01, 0xe8, 0x03, 0x55]
        );
        assert!(parse_hex_payload("").unwrap().is_empty());
        assert!(matches!(parse_hex_payload("0"), Err(Error::MalformedFrame(_))));
        assert!(parse_hex_payload("0g").is_err());
    }

    #[test]
    fn test_iso_timestamp() {
        let time = Utc.with_ymd_and_hms(2018, 4, 2, 16, 15, 44).unwrap()
            + chrono::Duration::milliseconds(125);
        assert_eq!(iso_timestamp(&time), "2018-04-02T16:15:44.125Z");
    }
}
