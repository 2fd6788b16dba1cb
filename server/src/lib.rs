//! # Arena Server Library
//!
//! This library provides the authoritative server for a small real-time arena
//! game. Clients connect over TCP, announce a character, and send intents
//! (spawn, move, attack, disconnect). The server owns the only true copy of
//! the world, applies those intents after validating them, and periodically
//! pushes the resulting state to every connected client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every rule of the game is evaluated here: movement speed and slows, attack
//! ranges, damage and resistances, death and respawn. Clients only ever see
//! the outcome in the next snapshot.
//!
//! ### Command Validation
//! Wire commands are untrusted. They are decoded into a closed set of typed
//! commands before the world is touched, and every handler checks all of its
//! preconditions first, so a rejected command never leaves a half-applied
//! change behind. Rejections are sent back to the offending connection as
//! `{"error": "..."}`.
//!
//! ### State Broadcasting
//! A fixed-interval timer serializes one snapshot and offers the same bytes
//! to every connection. A slow client only loses its own snapshots; it never
//! delays other clients or the simulation.
//!
//! ## Module Organization
//!
//! ### Entity Module (`entity`)
//! The per-character state machine: class profiles, movement steps, damage
//! with resistances, hit flash, slows and attack timing.
//!
//! ### World Module (`world`)
//! The character registry with its bounds and seeded RNG. Spawns characters
//! at random positions, advances timers by a fixed logical tick and replaces
//! dead characters on request.
//!
//! ### Command Module (`command`)
//! Decoding of wire commands and the pipeline that routes them to the spawn,
//! move, attack and disconnect handlers.
//!
//! ### Snapshot Module (`snapshot`)
//! Copies the world into the serializable view sent to clients.
//!
//! ### Connection Module (`connection`)
//! Registry of live connections, their outbound queues and the character each
//! one speaks for.
//!
//! ### Network Module (`network`)
//! The accept loop, per-connection reader and writer tasks, and the
//! simulation and broadcast tickers.
//!
//! ### Supporting Modules
//! `config` (command line and runtime settings), `error` (error types),
//! `event_log` (gameplay event sink) and `shutdown` (graceful stop signal).
//!
//! ## Concurrency Model
//!
//! The world and the connection registry each sit behind one async mutex.
//! Locks are taken to mutate or copy and released before any socket write or
//! timer wait. Commands from one connection are applied in the order they
//! arrived; commands from different connections interleave freely.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::event_log::MemoryEventLog;
//! use server::network::Server;
//! use server::shutdown;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         port: 0,
//!         seed: Some(7),
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::bind(config, Arc::new(MemoryEventLog::new())).await?;
//!     println!("listening on {}", server.local_addr()?);
//!
//!     let (trigger, stop) = shutdown::channel();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         trigger.trigger();
//!     });
//!
//!     server.run(stop).await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod event_log;
pub mod network;
pub mod shutdown;
pub mod snapshot;
pub mod world;
