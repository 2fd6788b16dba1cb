use crate::error::ServerError;
use clap::Parser;
use shared::{
    BROADCAST_INTERVAL_MS, DEFAULT_WORLD_HEIGHT, DEFAULT_WORLD_WIDTH, TICK_INTERVAL_MS,
};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments of the server binary.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// World width in units
    #[clap(long, default_value = "100")]
    pub width: f32,
    /// World height in units
    #[clap(long, default_value = "100")]
    pub height: f32,
    /// Seed for spawn positions and classes (random if omitted)
    #[clap(long)]
    pub seed: Option<u64>,
    /// File that gameplay events are appended to
    #[clap(long, default_value = "game_events.log")]
    pub event_log: PathBuf,
    /// Maximum number of simultaneous connections
    #[clap(long, default_value = "64")]
    pub max_connections: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub width: f32,
    pub height: f32,
    pub tick_interval: Duration,
    pub broadcast_interval: Duration,
    pub seed: Option<u64>,
    pub event_log: PathBuf,
    pub max_connections: usize,
    /// Frames buffered per connection before broadcasts to it are skipped.
    pub outbound_queue: usize,
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            width: DEFAULT_WORLD_WIDTH,
            height: DEFAULT_WORLD_HEIGHT,
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            broadcast_interval: Duration::from_millis(BROADCAST_INTERVAL_MS),
            seed: None,
            event_log: PathBuf::from("game_events.log"),
            max_connections: 64,
            outbound_queue: 32,
            write_timeout: Duration::from_secs(1),
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            width: args.width,
            height: args.height,
            seed: args.seed,
            event_log: args.event_log,
            max_connections: args.max_connections,
            ..Self::default()
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        for (name, side) in [("width", self.width), ("height", self.height)] {
            if !side.is_finite() || side <= 0.0 {
                return Err(ServerError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, side
                )));
            }
        }
        if self.max_connections == 0 {
            return Err(ServerError::InvalidConfig(
                "max connections must be at least 1".to_string(),
            ));
        }
        if self.outbound_queue == 0 {
            return Err(ServerError::InvalidConfig(
                "outbound queue must hold at least one frame".to_string(),
            ));
        }
        if self.tick_interval.is_zero() || self.broadcast_interval.is_zero() {
            return Err(ServerError::InvalidConfig(
                "tick and broadcast intervals must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
