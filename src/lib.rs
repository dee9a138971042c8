//! EmpirBus NXT bridge
//!
//! Decodes EmpirBus Application Specific PGN 65280 (Data Model 2) status
//! frames into per-instance dimmer and switch state, publishes that state as
//! Signal K path/value deltas, and turns PUT commands back into PGN 65280
//! frames rendered in the Actisense serial format.
//!
//! Devices are published at
//! `electrical.switches.empirBusNxt-instance<N>-dimmer<1..2>` and
//! `electrical.switches.empirBusNxt-instance<N>-switch<3..8>`.
pub mod core;

pub mod bridge;
pub mod bus;
pub mod protocol;
pub mod util;

// Re-export commonly used items
pub use crate::core::{Config, Error, Result};
pub use crate::bridge::{Bridge, BridgeHandle, BridgeService, Projection};
pub use crate::bus::{BusHandle, FrameSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
