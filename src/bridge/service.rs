use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{Bridge, Projection};
use crate::bus::BusHandle;
use crate::core::{Config, Error, Result};
use crate::protocol::{AnalyzerMessage, CommandRequest, CommandResult};

/// Events processed by the bridge task, one at a time
pub enum BridgeEvent {
    /// Record received from the analyzer
    Analyzer(AnalyzerMessage),
    /// Command for a device
    Command {
        /// Requested change
        request: CommandRequest,
        /// Receives the outcome
        reply: oneshot::Sender<CommandResult>,
    },
    /// PUT on a leaf path
    Put {
        /// Full leaf path
        path: String,
        /// Requested value
        value: Value,
        /// Receives the outcome
        reply: oneshot::Sender<CommandResult>,
    },
    /// The host's NMEA 2000 output became available
    BusAvailable,
    /// Send the ISO request now
    Resync,
    /// Query the current status line
    Status(oneshot::Sender<String>),
}

/// Handle for feeding events into a running [`BridgeService`]
#[derive(Clone)]
pub struct BridgeHandle {
    event_tx: mpsc::Sender<BridgeEvent>,
}

impl BridgeHandle {
    /// Wraps an existing event sender
    pub fn new(event_tx: mpsc::Sender<BridgeEvent>) -> Self {
        BridgeHandle { event_tx }
    }

    /// Submits an analyzer record
    pub async fn submit(&self, message: AnalyzerMessage) -> Result<()> {
        self.send(BridgeEvent::Analyzer(message)).await
    }

    /// Applies a command and waits for its outcome
    pub async fn command(&self, request: CommandRequest) -> Result<CommandResult> {
        let (reply, result) = oneshot::channel();
        self.send(BridgeEvent::Command { request, reply }).await?;
        result
            .await
            .map_err(|e| Error::bus(format!("Bridge dropped command: {}", e)))
    }

    /// Routes a PUT on a leaf path and waits for its outcome
    pub async fn put(&self, path: impl Into<String>, value: Value) -> Result<CommandResult> {
        let (reply, result) = oneshot::channel();
        self.send(BridgeEvent::Put {
            path: path.into(),
            value,
            reply,
        })
        .await?;
        result
            .await
            .map_err(|e| Error::bus(format!("Bridge dropped PUT: {}", e)))
    }

    /// Signals that frames can now be sent; schedules the ISO request
    pub async fn bus_available(&self) -> Result<()> {
        self.send(BridgeEvent::BusAvailable).await
    }

    /// Current status line
    pub async fn status(&self) -> Result<String> {
        let (reply, status) = oneshot::channel();
        self.send(BridgeEvent::Status(reply)).await?;
        status
            .await
            .map_err(|e| Error::bus(format!("Bridge dropped status query: {}", e)))
    }

    async fn send(&self, event: BridgeEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| Error::bus("Bridge service has stopped"))
    }
}

/// Task owning the [`Bridge`]. Frames and commands for the same instance
/// never interleave because every event is handled to completion in turn.
pub struct BridgeService {
    bridge: Bridge<BusHandle>,
    events: mpsc::Receiver<BridgeEvent>,
    resync_tx: mpsc::WeakSender<BridgeEvent>,
    updates: mpsc::Sender<Projection>,
}

impl BridgeService {
    /// Creates the service and the handle feeding it. Projections are
    /// delivered to `updates`.
    pub fn new(
        config: Config,
        bus: BusHandle,
        updates: mpsc::Sender<Projection>,
    ) -> Result<(Self, BridgeHandle)> {
        let (event_tx, events) = mpsc::channel(config.channel_capacity);
        let service = BridgeService {
            bridge: Bridge::new(config, bus)?,
            events,
            resync_tx: event_tx.downgrade(),
            updates,
        };
        Ok((service, BridgeHandle::new(event_tx)))
    }

    /// Processes events until every handle is dropped or the update
    /// receiver goes away
    pub async fn run(mut self) -> Result<()> {
        info!("EmpirBus NXT bridge started");

        while let Some(event) = self.events.recv().await {
            self.handle_event(event).await?;
        }

        info!("EmpirBus NXT bridge stopped");
        Ok(())
    }

    async fn handle_event(&mut self, event: BridgeEvent) -> Result<()> {
        match event {
            BridgeEvent::Analyzer(message) => {
                // Rejected frames are logged by the bridge and never stop the loop
                if let Ok(Some(projection)) = self.bridge.handle_analyzer_message(&message) {
                    self.updates
                        .send(projection)
                        .await
                        .map_err(|_| Error::bus("Update receiver dropped"))?;
                }
            }
            BridgeEvent::Command { request, reply } => {
                let result = self.bridge.handle_command(&request);
                if reply.send(result).is_err() {
                    debug!("Command issuer went away before the result");
                }
            }
            BridgeEvent::Put { path, value, reply } => {
                let result = self.bridge.handle_put(&path, value);
                if reply.send(result).is_err() {
                    debug!(path = %path, "PUT issuer went away before the result");
                }
            }
            BridgeEvent::BusAvailable => self.schedule_resync(),
            BridgeEvent::Resync => {
                if let Err(e) = self.bridge.request_resync() {
                    warn!(error = %e, "ISO request failed");
                }
            }
            BridgeEvent::Status(reply) => {
                let _ = reply.send(self.bridge.status().to_string());
            }
        }

        Ok(())
    }

    fn schedule_resync(&mut self) {
        let Some(event_tx) = self.resync_tx.upgrade() else {
            return;
        };
        let delay = self.bridge.config().resync_delay;

        debug!(delay = ?delay, "Scheduling ISO request");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = event_tx.send(BridgeEvent::Resync).await;
        });
    }
}
