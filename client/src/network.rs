use log::{debug, warn};
use shared::{ServerMessage, Snapshot, WireCommand};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server closed the connection")]
    Closed,
}

/// Line-oriented TCP connection to the arena server.
pub struct GameClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    line: String,
}

impl GameClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!("Connected to {}", stream.peer_addr()?);

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            line: String::new(),
        })
    }

    pub async fn send(&mut self, command: &WireCommand) -> Result<(), ClientError> {
        let frame = command.to_frame()?;
        self.send_raw(&frame).await
    }

    /// Writes `frame` as is; the caller provides the trailing newline.
    pub async fn send_raw(&mut self, frame: &str) -> Result<(), ClientError> {
        self.writer.write_all(frame.as_bytes()).await?;
        Ok(())
    }

    pub async fn next_message(&mut self) -> Result<ServerMessage, ClientError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Err(ClientError::Closed);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(serde_json::from_str(line)?);
        }
    }

    /// Waits for the next snapshot, logging any error replies on the way.
    pub async fn next_snapshot(&mut self) -> Result<Snapshot, ClientError> {
        loop {
            match self.next_message().await? {
                ServerMessage::Snapshot(snapshot) => return Ok(snapshot),
                ServerMessage::Error(e) => warn!("Server rejected a command: {}", e.error),
            }
        }
    }

    /// Waits for the next error reply, skipping snapshots.
    pub async fn next_error(&mut self) -> Result<String, ClientError> {
        loop {
            if let ServerMessage::Error(e) = self.next_message().await? {
                return Ok(e.error);
            }
        }
    }

    /// Half-closes the connection; the server sees end of stream.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_client_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"{\"error\":\"nope\"}\n\n{\"characters\":[]}\n")
                .await
                .unwrap();

            let mut received = String::new();
            socket.read_to_string(&mut received).await.unwrap();
            received
        });

        let mut client = GameClient::connect(addr).await.unwrap();
        assert_ok!(client.send(&WireCommand::spawn("a")).await);

        assert_eq!(client.next_error().await.unwrap(), "nope");
        assert!(client.next_snapshot().await.unwrap().is_empty());
        assert_ok!(client.close().await);

        let received = server.await.unwrap();
        let sent: WireCommand = serde_json::from_str(received.trim()).unwrap();
        assert_eq!(sent, WireCommand::spawn("a"));
    }

    #[tokio::test]
    async fn test_closed_connection_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut client = GameClient::connect(addr).await.unwrap();
        server.await.unwrap();

        assert!(matches!(
            client.next_message().await,
            Err(ClientError::Closed)
        ));
    }
}
