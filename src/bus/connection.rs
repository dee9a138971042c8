use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use crate::bridge::BridgeHandle;
use crate::core::{Error, Result};
use crate::protocol::{ActisenseCodec, AnalyzerMessage, OutboundFrame};

/// Longest analyzer line accepted
pub const MAX_LINE_LENGTH: usize = 8192;

/// Drains queued frames into `writer`, one Actisense line per frame, until
/// every [`BusHandle`](super::BusHandle) is dropped
pub async fn write_frames<W>(mut frames: mpsc::Receiver<OutboundFrame>, writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, ActisenseCodec::new());

    while let Some(frame) = frames.recv().await {
        debug!(pgn = frame.pgn, dst = frame.destination, "Sending frame");
        framed.send(frame).await?;
    }

    Ok(())
}

/// Reads analyzer JSON records line by line and submits them to the
/// bridge. Unparseable lines are skipped. Returns the number of records
/// forwarded once `reader` reaches EOF.
pub async fn forward_analyzer_lines<R>(reader: R, bridge: BridgeHandle) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    let mut forwarded = 0;

    while let Some(line) = lines.next().await {
        let line = line.map_err(|e| Error::bus(format!("Failed to read analyzer line: {}", e)))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<AnalyzerMessage>(line) {
            Ok(message) => {
                bridge.submit(message).await?;
                forwarded += 1;
            }
            Err(e) => warn!(error = %e, "Skipping unparseable analyzer line"),
        }
    }

    Ok(forwarded)
}
