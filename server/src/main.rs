use clap::Parser;
use log::{error, info, warn};
use server::config::{Args, ServerConfig};
use server::event_log::FileEventLog;
use server::network::Server;
use server::shutdown;
use std::sync::Arc;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, opens the event log and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::from(Args::parse());

    let (event_log, event_writer) = FileEventLog::open(&config.event_log).await?;
    info!("Writing gameplay events to {}", event_log.path().display());

    let server = match Server::bind(config, Arc::new(event_log)).await {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let (trigger, stop) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                trigger.trigger();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run(stop).await?;

    // The server held the last handle to the event log; wait for it to flush.
    if tokio::time::timeout(Duration::from_secs(2), event_writer)
        .await
        .is_err()
    {
        warn!("Event log did not flush in time");
    }

    Ok(())
}
