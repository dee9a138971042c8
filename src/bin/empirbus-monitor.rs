//! Reads analyzer JSON records on stdin and prints Signal K deltas on
//! stdout, one JSON document per line.
//!
//! Usage: `empirbus-monitor [config.json] [gateway-output]`
//!
//! Outbound frames (the power-on ISO request) are appended to
//! `gateway-output` as Actisense lines when given, and discarded otherwise.

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, info};

use empirbus_nxt::bus::{forward_analyzer_lines, write_frames};
use empirbus_nxt::{util, BridgeService, BusHandle, Config, Error, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = util::init_logging("info") {
        eprintln!("{}", e);
    }

    if let Err(e) = run().await {
        error!(error = %e, "empirbus-monitor failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    let gateway = args.next();

    let (bus, frames) = BusHandle::channel(config.channel_capacity);
    let (update_tx, mut updates) = mpsc::channel(config.channel_capacity);
    let (service, handle) = BridgeService::new(config, bus, update_tx)?;

    let service_task = tokio::spawn(service.run());
    let writer_task = tokio::spawn(async move {
        match gateway {
            Some(path) => {
                let file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?;
                write_frames(frames, file).await
            }
            None => write_frames(frames, tokio::io::sink()).await,
        }
    });
    let printer_task = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(projection) = updates.recv().await {
            for binding in &projection.registrations {
                info!(context = %binding.context, path = %binding.path, "Registering handler");
            }
            let mut line = serde_json::to_string(&projection.to_delta(Utc::now()))
                .map_err(|e| Error::bus(format!("Failed to render delta: {}", e)))?;
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, Error>(())
    });

    handle.bus_available().await?;
    let forwarded = forward_analyzer_lines(tokio::io::stdin(), handle).await?;
    info!(forwarded, "Analyzer input closed");

    service_task
        .await
        .map_err(|e| Error::bus(format!("Bridge task failed: {}", e)))??;
    printer_task
        .await
        .map_err(|e| Error::bus(format!("Printer task failed: {}", e)))??;
    writer_task
        .await
        .map_err(|e| Error::bus(format!("Writer task failed: {}", e)))??;

    Ok(())
}
