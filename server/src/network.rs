//! TCP front end of the server: accepts connections, feeds their command
//! streams into the pipeline and fans world snapshots back out.
//!
//! Every connection gets two tasks. The reader decodes newline-delimited JSON
//! and applies commands under the world lock; the writer drains a bounded
//! queue of pre-serialized frames onto the socket. Two tickers run next to the
//! accept loop: the simulation tick advances the world clock and the broadcast
//! tick pushes a snapshot to every queue, then replaces dead characters.

use crate::command::{Command, CommandAction, CommandPipeline};
use crate::config::ServerConfig;
use crate::connection::{ConnectionId, ConnectionManager, Frame};
use crate::error::{ServerError, TransportError};
use crate::event_log::EventLog;
use crate::shutdown::Shutdown;
use crate::snapshot::build_snapshot;
use crate::world::World;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use shared::{ErrorMessage, MAX_FRAME_BYTES};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, timeout, MissedTickBehavior};

/// State shared by every task of a running server.
pub struct ServerContext {
    world: Arc<Mutex<World>>,
    connections: Arc<Mutex<ConnectionManager>>,
    pipeline: CommandPipeline,
}

impl ServerContext {
    pub fn new(world: World, event_log: Arc<dyn EventLog>, max_connections: usize) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
            connections: Arc::new(Mutex::new(ConnectionManager::new(max_connections))),
            pipeline: CommandPipeline::new(event_log),
        }
    }

    pub fn world(&self) -> &Arc<Mutex<World>> {
        &self.world
    }

    pub fn connections(&self) -> &Arc<Mutex<ConnectionManager>> {
        &self.connections
    }

    /// Advances the world by one fixed tick.
    pub async fn tick_once(&self) {
        self.world.lock().await.update();
    }

    /// Builds a snapshot, replaces dead characters and offers the snapshot to
    /// every connection. Returns how many queues accepted it.
    pub async fn broadcast_once(&self) -> usize {
        let snapshot = {
            let mut world = self.world.lock().await;
            let snapshot = build_snapshot(&world);
            for id in world.respawn_dead() {
                self.pipeline
                    .event_log()
                    .log_event(&format!("Character {} is dead", id));
            }
            snapshot
        };

        let frame = match encode_frame(&snapshot) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize snapshot: {}", e);
                return 0;
            }
        };

        let senders = self.connections.lock().await.senders();
        let mut delivered = 0;
        for (id, sender) in senders {
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Connection {} is not keeping up, snapshot skipped", id)
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Connection {} has no writer, snapshot skipped", id)
                }
            }
        }
        delivered
    }

    /// Applies one decoded frame on behalf of connection `id`. Problems with
    /// the command itself are queued back to the sender as an error frame.
    async fn apply_frame(
        &self,
        id: ConnectionId,
        value: serde_json::Value,
        replies: &mpsc::Sender<Frame>,
    ) {
        let command = match Command::from_value(value) {
            Ok(command) => command,
            Err(e) => {
                debug!("Connection {} sent an invalid command: {}", id, e);
                reply_error(id, replies, &e.to_string());
                return;
            }
        };

        if self
            .connections
            .lock()
            .await
            .set_character(id, &command.character_id)
        {
            debug!("Connection {} speaks for {}", id, command.character_id);
        }

        let result = {
            let mut world = self.world.lock().await;
            self.pipeline.execute(&mut world, &command)
        };

        if let Err(e) = result {
            debug!(
                "{} from {} rejected: {}",
                command.kind().as_str(),
                command.character_id,
                e
            );
            reply_error(id, replies, &e.to_string());
        }
    }

    /// Removes the connection and disconnects the character it spoke for.
    async fn teardown(&self, id: ConnectionId) {
        let connection = self.connections.lock().await.remove_connection(id);
        let Some(character_id) = connection.and_then(|c| c.character_id) else {
            return;
        };

        let command = Command::new(character_id, CommandAction::Disconnect);
        let mut world = self.world.lock().await;
        if let Err(e) = self.pipeline.execute(&mut world, &command) {
            warn!("Failed to disconnect {}: {}", command.character_id, e);
        }
    }
}

fn encode_frame<T: Serialize>(message: &T) -> serde_json::Result<Frame> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(Frame::from(line))
}

fn reply_error(id: ConnectionId, replies: &mpsc::Sender<Frame>, error: &str) {
    let frame = match encode_frame(&ErrorMessage {
        error: error.to_string(),
    }) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to serialize error reply: {}", e);
            return;
        }
    };
    if let Err(e) = replies.try_send(frame) {
        debug!("Dropped error reply to connection {}: {}", id, e);
    }
}

/// Reads one newline-terminated frame into `buf`. Returns the number of bytes
/// read, 0 at end of stream.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_FRAME_BYTES as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if buf.len() > MAX_FRAME_BYTES && buf.last() != Some(&b'\n') {
        return Err(TransportError::FrameTooLong {
            limit: MAX_FRAME_BYTES,
        });
    }
    Ok(read)
}

/// Runs the command loop of one connection until end of stream, a transport
/// error or shutdown.
pub async fn read_commands<R>(
    context: &ServerContext,
    id: ConnectionId,
    mut reader: R,
    replies: mpsc::Sender<Frame>,
    mut shutdown: Shutdown,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        let read = tokio::select! {
            _ = shutdown.recv() => return Ok(()),
            read = read_frame(&mut reader, &mut buf) => read?,
        };
        if read == 0 {
            return Ok(());
        }

        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let value: serde_json::Value = serde_json::from_slice(&buf)?;
        context.apply_frame(id, value, &replies).await;
    }
}

/// Drains a connection's outbound queue onto the socket. A failed write only
/// loses that frame. A write that times out may have left half a line on the
/// wire, so the writer stops and the connection is torn down behind it.
pub async fn run_writer<W>(
    id: ConnectionId,
    mut writer: W,
    mut queue: mpsc::Receiver<Frame>,
    write_timeout: Duration,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = queue.recv().await {
        match timeout(write_timeout, writer.write_all(frame.as_bytes())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Write to connection {} failed: {}", id, e);
            }
            Err(_) => {
                warn!(
                    "Write to connection {} timed out after {:?}",
                    id, write_timeout
                );
                return;
            }
        }
    }
    debug!("Writer for connection {} finished", id);
}

/// Full lifecycle of one accepted connection after registration. The
/// connection ends when the reader does, or when the writer gives up on a
/// stalled socket.
pub async fn handle_connection<R>(
    context: Arc<ServerContext>,
    id: ConnectionId,
    reader: R,
    replies: mpsc::Sender<Frame>,
    mut writer: JoinHandle<()>,
    shutdown: Shutdown,
) where
    R: AsyncBufRead + Unpin,
{
    let mut writer_done = false;
    let result = tokio::select! {
        result = read_commands(&context, id, reader, replies, shutdown) => result,
        joined = &mut writer => {
            writer_done = true;
            if let Err(e) = joined {
                error!("Writer task for connection {} panicked: {}", id, e);
            }
            Err(TransportError::WriteStalled)
        }
    };
    match result {
        Ok(()) => debug!("Connection {} finished reading", id),
        Err(e) => warn!("Connection {} dropped: {}", id, e),
    }

    context.teardown(id).await;

    // The registry held the last queue sender, so the writer drains and stops.
    if !writer_done {
        if let Err(e) = writer.await {
            error!("Writer task for connection {} panicked: {}", id, e);
        }
    }
}

pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener and builds an empty world from `config`.
    pub async fn bind(config: ServerConfig, event_log: Arc<dyn EventLog>) -> Result<Self, ServerError> {
        config.validate()?;

        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                addr: address.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let world = World::new(config.width, config.height, rng);
        info!(
            "World is {}x{} (scale {:.2})",
            config.width,
            config.height,
            world.scale()
        );

        let context = Arc::new(ServerContext::new(
            world,
            event_log,
            config.max_connections,
        ));

        Ok(Self {
            listener,
            context,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> Arc<ServerContext> {
        Arc::clone(&self.context)
    }

    /// Serves until `shutdown` fires, then waits for every connection and
    /// both tickers to finish.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), ServerError> {
        let Server {
            listener,
            context,
            config,
        } = self;

        let simulation = tokio::spawn(run_simulation(
            Arc::clone(&context),
            config.tick_interval,
            shutdown.clone(),
        ));
        let broadcast = tokio::spawn(run_broadcast(
            Arc::clone(&context),
            config.broadcast_interval,
            shutdown.clone(),
        ));

        let mut tasks = JoinSet::new();
        let mut stop = shutdown.clone();
        loop {
            tokio::select! {
                _ = stop.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        accept_connection(&context, &config, stream, addr, &mut tasks, shutdown.clone()).await;
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Connection task panicked: {}", e);
                    }
                }
            }
        }

        drop(listener);
        info!("Stopped accepting connections, closing {} open ones", tasks.len());

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Connection task panicked: {}", e);
            }
        }
        for (name, task) in [("Simulation", simulation), ("Broadcast", broadcast)] {
            if let Err(e) = task.await {
                error!("{} task panicked: {}", name, e);
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

async fn accept_connection(
    context: &Arc<ServerContext>,
    config: &ServerConfig,
    stream: TcpStream,
    addr: SocketAddr,
    tasks: &mut JoinSet<()>,
    shutdown: Shutdown,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
    }

    let (sender, queue) = mpsc::channel(config.outbound_queue);
    let registered = context
        .connections
        .lock()
        .await
        .add_connection(addr, sender.clone());

    let Some(id) = registered else {
        warn!("Rejecting {}: server full", addr);
        let write_timeout = config.write_timeout;
        tasks.spawn(reject_connection(stream, write_timeout));
        return;
    };

    let (read_half, write_half) = stream.into_split();
    let writer = tokio::spawn(run_writer(id, write_half, queue, config.write_timeout));
    tasks.spawn(handle_connection(
        Arc::clone(context),
        id,
        BufReader::new(read_half),
        sender,
        writer,
        shutdown,
    ));
}

async fn reject_connection(mut stream: TcpStream, write_timeout: Duration) {
    let frame = match encode_frame(&ErrorMessage {
        error: "server full".to_string(),
    }) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to serialize rejection: {}", e);
            return;
        }
    };
    let _ = timeout(write_timeout, stream.write_all(frame.as_bytes())).await;
}

async fn run_simulation(context: Arc<ServerContext>, period: Duration, mut shutdown: Shutdown) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => context.tick_once().await,
        }
    }
    debug!("Simulation tick stopped");
}

async fn run_broadcast(context: Arc<ServerContext>, period: Duration, mut shutdown: Shutdown) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                context.broadcast_once().await;
            }
        }
    }
    debug!("Broadcast tick stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Character;
    use crate::event_log::MemoryEventLog;
    use crate::shutdown;
    use shared::{CharacterClass, CharacterState, DamageType, ServerMessage, Snapshot};
    use tokio_test::io::Builder;

    fn context_with_log() -> (Arc<ServerContext>, Arc<MemoryEventLog>) {
        let log = Arc::new(MemoryEventLog::new());
        let world = World::with_seed(100.0, 100.0, 5);
        (Arc::new(ServerContext::new(world, log.clone(), 4)), log)
    }

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    async fn register(context: &ServerContext) -> (ConnectionId, mpsc::Sender<Frame>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        let id = context
            .connections
            .lock()
            .await
            .add_connection(test_addr(), tx.clone())
            .unwrap();
        (id, tx, rx)
    }

    fn decode(frame: &Frame) -> ServerMessage {
        serde_json::from_str(frame.trim_end()).unwrap()
    }

    #[tokio::test]
    async fn test_reader_applies_commands_in_order() {
        let (context, log) = context_with_log();
        let (id, tx, mut rx) = register(&context).await;
        let (_trigger, shutdown) = shutdown::channel();

        let reader = BufReader::new(
            Builder::new()
                .read(b"{\"type\":\"SPAWN\",\"character_id\":\"a\"}\n")
                .read(b"\n")
                .read(b"{\"type\":\"JUMP\",\"character_id\":\"a\"}\n")
                .read(b"{\"type\":\"DISCONNECT\",\"character_id\":\"a\"}")
                .build(),
        );

        read_commands(&context, id, reader, tx, shutdown)
            .await
            .unwrap();

        assert!(context.world.lock().await.is_empty());
        assert_eq!(
            context.connections.lock().await.character_of(id),
            Some("a")
        );
        assert_eq!(log.events(), vec!["Character a spawned", "a disconnected"]);

        match decode(&rx.recv().await.unwrap()) {
            ServerMessage::Error(e) => assert_eq!(e.error, "unknown command type: JUMP"),
            other => panic!("expected an error frame, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reader_surfaces_command_errors() {
        let (context, _log) = context_with_log();
        let (id, tx, mut rx) = register(&context).await;
        let (_trigger, shutdown) = shutdown::channel();

        let reader = BufReader::new(
            Builder::new()
                .read(b"{\"type\":\"MOVE\",\"character_id\":\"ghost\",\"data\":{\"dx\":1,\"dy\":1}}\n")
                .build(),
        );
        read_commands(&context, id, reader, tx, shutdown)
            .await
            .unwrap();

        assert_eq!(
            decode(&rx.recv().await.unwrap()),
            ServerMessage::Error(ErrorMessage {
                error: "character ghost not found".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_reader_stops_on_undecodable_frame() {
        let (context, _log) = context_with_log();
        let (id, tx, _rx) = register(&context).await;
        let (_trigger, shutdown) = shutdown::channel();

        let reader = BufReader::new(Builder::new().read(b"not json\n").build());
        let result = read_commands(&context, id, reader, tx, shutdown).await;

        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_reader_rejects_oversized_frame() {
        let (context, _log) = context_with_log();
        let (id, tx, _rx) = register(&context).await;
        let (_trigger, shutdown) = shutdown::channel();

        let oversized = vec![b'x'; MAX_FRAME_BYTES + 16];
        let reader = BufReader::new(Builder::new().read(&oversized).build());
        let result = read_commands(&context, id, reader, tx, shutdown).await;

        assert!(matches!(result, Err(TransportError::FrameTooLong { .. })));
    }

    #[tokio::test]
    async fn test_reader_exits_on_shutdown() {
        let (context, _log) = context_with_log();
        let (id, tx, _rx) = register(&context).await;
        let (trigger, shutdown) = shutdown::channel();

        let (client, server) = tokio::io::duplex(64);
        let reader = tokio::spawn({
            let context = Arc::clone(&context);
            async move { read_commands(&context, id, BufReader::new(server), tx, shutdown).await }
        });

        trigger.trigger();
        assert!(reader.await.unwrap().is_ok());
        drop(client);
    }

    #[tokio::test]
    async fn test_teardown_disconnects_owner() {
        let (context, log) = context_with_log();
        let (id, tx, rx) = register(&context).await;
        let (_trigger, shutdown) = shutdown::channel();
        let writer = tokio::spawn(run_writer(
            id,
            tokio::io::sink(),
            rx,
            Duration::from_secs(1),
        ));

        let reader = BufReader::new(
            Builder::new()
                .read(b"{\"type\":\"SPAWN\",\"character_id\":\"a\"}\n")
                .build(),
        );
        handle_connection(Arc::clone(&context), id, reader, tx, writer, shutdown).await;

        assert!(context.connections.lock().await.is_empty());
        assert!(!context.world.lock().await.contains("a"));
        assert_eq!(log.events(), vec!["Character a spawned", "a disconnected"]);
    }

    #[tokio::test]
    async fn test_teardown_without_owner_leaves_world_alone() {
        let (context, log) = context_with_log();
        context
            .world
            .lock()
            .await
            .insert(Character::new("b", CharacterClass::Mage, 1.0, 1.0, 1.0));
        let (id, tx, rx) = register(&context).await;
        let (_trigger, shutdown) = shutdown::channel();
        let writer = tokio::spawn(run_writer(id, tokio::io::sink(), rx, Duration::from_secs(1)));

        let reader = BufReader::new(Builder::new().read(b"{}\n").build());
        handle_connection(Arc::clone(&context), id, reader, tx, writer, shutdown).await;

        assert!(context.world.lock().await.contains("b"));
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn test_writer_writes_frames_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let mock = Builder::new().write(b"one\n").write(b"two\n").build();
        tx.send(Frame::from("one\n")).await.unwrap();
        tx.send(Frame::from("two\n")).await.unwrap();
        drop(tx);

        run_writer(1, mock, rx, Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_writer_continues_after_failed_write() {
        let (tx, rx) = mpsc::channel(4);
        let mock = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::Other, "hiccup"))
            .write(b"two\n")
            .build();
        tx.send(Frame::from("one\n")).await.unwrap();
        tx.send(Frame::from("two\n")).await.unwrap();
        drop(tx);

        run_writer(1, mock, rx, Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_snapshots_flow_after_failed_write() {
        let (context, _log) = context_with_log();
        let (id, tx, rx) = register(&context).await;
        let mock = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::Other, "hiccup"))
            .write(b"{\"characters\":[]}\n")
            .write(b"{\"characters\":[]}\n")
            .build();
        let writer = tokio::spawn(run_writer(id, mock, rx, Duration::from_secs(1)));

        for _ in 0..3 {
            assert_eq!(context.broadcast_once().await, 1);
            tokio::task::yield_now().await;
        }
        assert!(!writer.is_finished());

        context.connections.lock().await.remove_connection(id);
        drop(tx);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_stalled_writer_tears_connection_down() {
        let (context, log) = context_with_log();
        let (id, tx, rx) = register(&context).await;
        let (_shutdown_trigger, shutdown) = shutdown::channel();

        // Nobody reads the peer end, so the second half of the frame never fits.
        let (_peer_out, socket_out) = tokio::io::duplex(8);
        let writer = tokio::spawn(run_writer(
            id,
            socket_out,
            rx,
            Duration::from_millis(50),
        ));

        let (mut peer_in, socket_in) = tokio::io::duplex(1024);
        peer_in
            .write_all(b"{\"type\":\"SPAWN\",\"character_id\":\"a\"}\n")
            .await
            .unwrap();
        tx.try_send(Frame::from("{\"characters\":[]}\n")).unwrap();

        handle_connection(
            Arc::clone(&context),
            id,
            BufReader::new(socket_in),
            tx,
            writer,
            shutdown,
        )
        .await;

        assert!(context.connections.lock().await.is_empty());
        assert!(!context.world.lock().await.contains("a"));
        assert_eq!(log.events(), vec!["Character a spawned", "a disconnected"]);
        drop(peer_in);
    }

    #[tokio::test]
    async fn test_broadcast_sends_identical_frames() {
        let (context, _log) = context_with_log();
        context.world.lock().await.spawn_random_character("a");
        let (_id1, _tx1, mut rx1) = register(&context).await;
        let (_id2, _tx2, mut rx2) = register(&context).await;

        assert_eq!(context.broadcast_once().await, 2);

        let first = rx1.recv().await.unwrap();
        let second = rx2.recv().await.unwrap();
        assert_eq!(first, second);
        match decode(&first) {
            ServerMessage::Snapshot(snapshot) => assert!(snapshot.get("a").is_some()),
            other => panic!("expected a snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_full_and_closed_queues() {
        let (context, _log) = context_with_log();
        let (full_tx, _full_rx) = mpsc::channel(1);
        full_tx.try_send(Frame::from("pending\n")).unwrap();
        let (closed_tx, closed_rx) = mpsc::channel(1);
        drop(closed_rx);
        {
            let mut connections = context.connections.lock().await;
            connections.add_connection(test_addr(), full_tx);
            connections.add_connection(test_addr(), closed_tx);
        }
        let (_id, _tx, mut healthy) = register(&context).await;

        assert_eq!(context.broadcast_once().await, 1);
        assert!(healthy.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_broadcast_shows_death_then_respawns() {
        let (context, log) = context_with_log();
        {
            let mut world = context.world.lock().await;
            world.insert(Character::new("a", CharacterClass::Warrior, 10.0, 10.0, 1.0));
            world
                .get_mut("a")
                .unwrap()
                .take_damage(1000.0, DamageType::Magical);
        }
        let (_id, _tx, mut rx) = register(&context).await;

        context.broadcast_once().await;

        let snapshot: Snapshot = match decode(&rx.recv().await.unwrap()) {
            ServerMessage::Snapshot(snapshot) => snapshot,
            other => panic!("expected a snapshot, got {:?}", other),
        };
        assert_eq!(snapshot.get("a").unwrap().state, CharacterState::Dying);

        let world = context.world.lock().await;
        let fresh = world.get("a").unwrap();
        assert!(!fresh.is_dead());
        assert_eq!(fresh.health(), fresh.max_health());
        assert!(log.contains("Character a is dead"));
    }

    #[tokio::test]
    async fn test_tick_once_advances_world() {
        let (context, _log) = context_with_log();
        context.tick_once().await;
        context.tick_once().await;
        assert_eq!(context.world.lock().await.tick(), 2);
    }
}
