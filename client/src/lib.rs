//! # Arena Client Library
//!
//! Headless client for the arena server. It speaks the same newline-delimited
//! JSON protocol as any other client and has no rendering of its own; it is
//! used for smoke tests, load generation and the scripted bot binary.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! [`GameClient`](network::GameClient) wraps one TCP connection:
//! - `send` writes a [`WireCommand`](shared::WireCommand) as one frame
//! - `next_message` reads the next snapshot or error reply
//! - `close` half-closes the stream so the server disconnects the character
//!
//! ### Bot Module (`bot`)
//! A tiny policy that turns the latest snapshot into the next command: spawn
//! when missing, attack whoever is close, otherwise walk toward the nearest
//! character or wander.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::GameClient;
//! use shared::WireCommand;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = GameClient::connect("127.0.0.1:8080").await?;
//!     client.send(&WireCommand::spawn("hero")).await?;
//!     client.send(&WireCommand::move_by("hero", 1.0, 0.0)).await?;
//!
//!     let snapshot = client.next_snapshot().await?;
//!     println!("{} characters in the arena", snapshot.len());
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod network;

pub use network::{ClientError, GameClient};
