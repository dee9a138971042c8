//! Bus access module
//!
//! The host owns the NMEA 2000 connection. This module defines how outbound
//! frames are handed to it and the async glue that moves analyzer records
//! and Actisense lines over byte streams.

pub mod connection;

pub use self::connection::{forward_analyzer_lines, write_frames};

use tokio::sync::mpsc;

use crate::core::{Error, Result};
use crate::protocol::OutboundFrame;

/// Destination of outbound frames. Emission is best effort and must not block.
pub trait FrameSink {
    /// Queues a frame for transmission
    fn emit(&self, frame: OutboundFrame) -> Result<()>;
}

/// Handle for queueing frames to the bus writer
#[derive(Debug, Clone)]
pub struct BusHandle {
    frame_tx: mpsc::Sender<OutboundFrame>,
}

impl BusHandle {
    /// Wraps an existing sender
    pub fn new(frame_tx: mpsc::Sender<OutboundFrame>) -> Self {
        BusHandle { frame_tx }
    }

    /// Creates a handle and the receiver the bus writer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (BusHandle::new(tx), rx)
    }
}

impl FrameSink for BusHandle {
    fn emit(&self, frame: OutboundFrame) -> Result<()> {
        self.frame_tx
            .try_send(frame)
            .map_err(|e| Error::bus(format!("Failed to queue frame: {}", e)))
    }
}
