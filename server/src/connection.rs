//! Registry of live TCP connections.
//!
//! Each connection owns a bounded outbound queue drained by its writer task.
//! The registry only hands out clones of those senders, so the broadcaster
//! can release the lock before pushing any bytes.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

pub type ConnectionId = u64;

/// Serialized frame shared by every connection it is sent to.
pub type Frame = Arc<str>;

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    /// Character this connection speaks for, learned from its first valid command.
    pub character_id: Option<String>,
    pub sender: mpsc::Sender<Frame>,
    pub connected_at: Instant,
}

impl Connection {
    pub fn new(id: ConnectionId, addr: SocketAddr, sender: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            character_id: None,
            sender,
            connected_at: Instant::now(),
        }
    }
}

pub struct ConnectionManager {
    connections: HashMap<ConnectionId, Connection>,
    next_id: ConnectionId,
    max_connections: usize,
}

impl ConnectionManager {
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
            max_connections,
        }
    }

    /// Registers a connection, or returns None when the server is full.
    pub fn add_connection(
        &mut self,
        addr: SocketAddr,
        sender: mpsc::Sender<Frame>,
    ) -> Option<ConnectionId> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        info!("Connection {} opened from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr, sender));
        Some(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let connection = self.connections.remove(&id)?;
        info!(
            "Connection {} from {} closed after {:.1}s",
            id,
            connection.addr,
            connection.connected_at.elapsed().as_secs_f32()
        );
        Some(connection)
    }

    /// Associates a connection with the character it controls. The first
    /// association wins; later calls leave it untouched.
    pub fn set_character(&mut self, id: ConnectionId, character_id: &str) -> bool {
        match self.connections.get_mut(&id) {
            Some(connection) if connection.character_id.is_none() => {
                connection.character_id = Some(character_id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn character_of(&self, id: ConnectionId) -> Option<&str> {
        self.connections.get(&id)?.character_id.as_deref()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Clones every outbound sender for a lock-free fan-out.
    pub fn senders(&self) -> Vec<(ConnectionId, mpsc::Sender<Frame>)> {
        self.connections
            .iter()
            .map(|(id, connection)| (*id, connection.sender.clone()))
            .collect()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
