//! WebSocket Game Server
//!
//! Async WebSocket server for multiplayer races.
//! Each room runs as its own task fed by a single command queue, so every
//! mutating operation on a room is processed in arrival order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::maze::Position;
use crate::race::{Clock, SystemClock, TickGuard};
use super::config::ServerConfig;
use super::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
use super::room::{ConnectionId, MazeRoom, Outbound, RoomError, RoomScheduler, RoomSettings, Target};

/// Queued commands per room.
const ROOM_QUEUE_CAPACITY: usize = 256;

/// Queued outbound messages per connection.
const OUTBOX_CAPACITY: usize = 64;

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection limit reached.
    #[error("Connection limit reached")]
    ConnectionLimitReached,

    /// Room limit reached.
    #[error("Room limit of {0} reached")]
    RoomLimitReached(usize),

    /// Room command queue is full.
    #[error("Room {0} is busy")]
    RoomBusy(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameServerError {
    /// Error payload sent to the client.
    pub fn to_server_error(&self) -> ServerError {
        let code = match self {
            Self::ConnectionLimitReached | Self::RoomLimitReached(_) | Self::RoomBusy(_) => {
                ErrorCode::ServerOverloaded
            }
            Self::BindFailed(_) | Self::WebSocket(_) | Self::Internal(_) => ErrorCode::InternalError,
        };
        ServerError::new(code, self.to_string())
    }
}

// =============================================================================
// ROOM TASKS
// =============================================================================

/// Work item for a room task.
#[derive(Debug)]
pub enum RoomCommand {
    /// Connection joins; replies go to `outbox`.
    Join {
        conn: ConnectionId,
        player_id: Option<String>,
        name: Option<String>,
        outbox: mpsc::Sender<ServerMessage>,
    },
    /// Position report to relay.
    Move { conn: ConnectionId, position: Position },
    /// Finish claim.
    Finish { conn: ConnectionId },
    /// Leader asks for the next maze.
    NextMaze { conn: ConnectionId },
    /// Connection left or disconnected.
    Leave { conn: ConnectionId },
    /// Race clock tick.
    Tick,
    /// Scheduled advance for `round`.
    AutoAdvance { round: u64 },
}

/// Sending side of a room's queue.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: String,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Room name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a command. Returns `false` if the room task is gone.
    pub async fn send(&self, command: RoomCommand) -> bool {
        self.tx.send(command).await.is_ok()
    }

    fn try_send(&self, command: RoomCommand) -> Result<(), GameServerError> {
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => GameServerError::RoomBusy(self.name.clone()),
            mpsc::error::TrySendError::Closed(_) => {
                GameServerError::Internal(format!("room {} stopped", self.name))
            }
        })
    }
}

/// Timers that feed back into the room's own queue.
struct ChannelScheduler {
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomScheduler for ChannelScheduler {
    fn every(&self, period: Duration) -> TickGuard {
        let tx = self.tx.clone();
        TickGuard::spawn(period, move || match tx.try_send(RoomCommand::Tick) {
            Ok(()) => true,
            // A backed-up queue just skips this tick.
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        })
    }

    fn after(&self, delay: Duration, round: u64) -> TickGuard {
        let tx = self.tx.clone();
        TickGuard::once(delay, move || {
            if tx.try_send(RoomCommand::AutoAdvance { round }).is_err() {
                debug!(round, "auto advance not delivered");
            }
        })
    }
}

/// Room name -> running room task.
#[derive(Clone)]
struct RoomDirectory {
    config: Arc<ServerConfig>,
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    clock: Arc<dyn Clock>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RoomDirectory {
    /// Queue a join for `name`, starting the room's task on first use.
    ///
    /// The join is queued while the directory lock is held, so a room
    /// cannot retire between lookup and delivery.
    async fn join(&self, name: &str, command: RoomCommand) -> Result<RoomHandle, GameServerError> {
        {
            let rooms = self.rooms.read().await;
            if let Some(handle) = rooms.get(name) {
                handle.try_send(command)?;
                return Ok(handle.clone());
            }
        }

        let mut rooms = self.rooms.write().await;
        let handle = match rooms.get(name) {
            Some(handle) => handle.clone(),
            None => {
                if rooms.len() >= self.config.max_rooms {
                    return Err(GameServerError::RoomLimitReached(self.config.max_rooms));
                }
                let handle = self.spawn(name);
                rooms.insert(name.to_string(), handle.clone());
                info!(room = name, rooms = rooms.len(), "room opened");
                handle
            }
        };
        handle.try_send(command)?;
        Ok(handle)
    }

    fn spawn(&self, name: &str) -> RoomHandle {
        let (tx, rx) = mpsc::channel(ROOM_QUEUE_CAPACITY);
        let scheduler = ChannelScheduler { tx: tx.clone() };
        let room = MazeRoom::new(
            RoomSettings::from_config(&self.config, name),
            Box::new(scheduler),
        );
        tokio::spawn(run_room(room, rx, self.clone(), self.shutdown_tx.subscribe()));
        RoomHandle { name: name.to_string(), tx }
    }

    /// Remove an empty room unless more commands are already queued for it.
    /// The default room is never removed.
    async fn retire(&self, name: &str, commands: &mpsc::Receiver<RoomCommand>) -> bool {
        if name == self.config.default_room {
            return false;
        }
        let mut rooms = self.rooms.write().await;
        if !commands.is_empty() {
            return false;
        }
        rooms.remove(name);
        info!(room = name, rooms = rooms.len(), "room closed");
        true
    }

    async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }
}

/// Drive one room until shutdown. Rooms other than the default one also
/// stop once they empty.
async fn run_room(
    mut room: MazeRoom,
    mut commands: mpsc::Receiver<RoomCommand>,
    directory: RoomDirectory,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let clock = directory.clock.clone();
    let mut outboxes: HashMap<ConnectionId, mpsc::Sender<ServerMessage>> = HashMap::new();

    loop {
        let command = tokio::select! {
            command = commands.recv() => match command {
                Some(command) => command,
                None => break,
            },
            _ = shutdown_rx.recv() => break,
        };

        let now = clock.now_ms();
        let result = match command {
            RoomCommand::Join { conn, player_id, name, outbox } => {
                match room.join(conn, player_id, name, now) {
                    Ok(out) => {
                        outboxes.insert(conn, outbox);
                        // A rejoin may have evicted an older connection.
                        outboxes.retain(|c, _| room.player(c).is_some());
                        Ok(out)
                    }
                    Err(e) => {
                        warn!(room = %room.name(), "join rejected: {}", e);
                        let _ = outbox.try_send(ServerMessage::Error(e.to_server_error()));
                        Ok(Vec::new())
                    }
                }
            }
            RoomCommand::Move { conn, position } => room.move_player(conn, position),
            RoomCommand::Finish { conn } => room.finish(conn, now),
            RoomCommand::NextMaze { conn } => room.next_maze(conn, now),
            RoomCommand::Leave { conn } => {
                let out = room.leave(conn);
                outboxes.remove(&conn);
                Ok(out)
            }
            RoomCommand::Tick => Ok(room.tick(now)),
            RoomCommand::AutoAdvance { round } => room.auto_advance(round, now),
        };

        match result {
            Ok(out) => deliver(&outboxes, out),
            Err(RoomError::NotInRoom(conn)) => {
                debug!(room = %room.name(), %conn, "message from connection outside the room");
            }
            Err(e) => {
                error!(room = %room.name(), "room operation failed: {}", e);
                deliver(
                    &outboxes,
                    vec![Outbound::broadcast(ServerMessage::Error(e.to_server_error()))],
                );
            }
        }

        if room.is_empty() && directory.retire(room.name(), &commands).await {
            break;
        }
    }

    debug!(room = %room.name(), "room task stopped");
}

/// Fan messages out to connection outboxes. Full or closed outboxes drop.
fn deliver(outboxes: &HashMap<ConnectionId, mpsc::Sender<ServerMessage>>, out: Vec<Outbound>) {
    for Outbound { target, message } in out {
        for (conn, outbox) in outboxes {
            let wanted = match target {
                Target::Broadcast => true,
                Target::To(to) => *conn == to,
                Target::AllExcept(except) => *conn != except,
            };
            if wanted && outbox.try_send(message.clone()).is_err() {
                debug!(%conn, kind = message.kind(), "outbound message dropped");
            }
        }
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// Decrements the live connection count when dropped.
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: Arc<ServerConfig>,
    /// Rooms by name.
    directory: RoomDirectory,
    /// Live connections.
    connections: Arc<AtomicUsize>,
    /// Time source for pongs and race timing.
    clock: Arc<dyn Clock>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a server on a custom clock.
    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let config = Arc::new(config);

        Self {
            directory: RoomDirectory {
                config: config.clone(),
                rooms: Arc::new(RwLock::new(HashMap::new())),
                clock: clock.clone(),
                shutdown_tx: shutdown_tx.clone(),
            },
            config,
            connections: Arc::new(AtomicUsize::new(0)),
            clock,
            shutdown_tx,
        }
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, GameServerError> {
        Ok(TcpListener::bind(&self.config.bind_addr).await?)
    }

    /// Run the server.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        info!("Maze race server listening on {}", listener.local_addr()?);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connection_count() >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                Self::reject_connection(stream, GameServerError::ConnectionLimitReached);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Complete the handshake only to report `reason`, then close.
    fn reject_connection(stream: TcpStream, reason: GameServerError) {
        tokio::spawn(async move {
            let mut ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    debug!("Handshake with rejected client failed: {}", e);
                    return;
                }
            };
            if let Ok(text) = ServerMessage::Error(reason.to_server_error()).to_json() {
                let _ = ws_stream.send(Message::Text(text)).await;
            }
            let _ = ws_stream.close(None).await;
        });
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream) {
        self.connections.fetch_add(1, Ordering::SeqCst);
        let slot = ConnectionSlot(self.connections.clone());
        let directory = self.directory.clone();
        let clock = self.clock.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let conn: ConnectionId = Uuid::new_v4();

        tokio::spawn(async move {
            let _slot = slot;
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!(%conn, "WebSocket handshake failed: {}", e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut current: Option<RoomHandle> = None;

            // Handle incoming messages
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        warn!(%conn, "Dropping malformed message: {}", e);
                                        continue;
                                    }
                                };

                                Self::handle_client_message(
                                    conn,
                                    client_msg,
                                    &directory,
                                    &mut current,
                                    clock.as_ref(),
                                    &msg_tx,
                                ).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!(%conn, "Client disconnected");
                                break;
                            }
                            Some(Err(e)) => {
                                warn!(%conn, "WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Cleanup
            if let Some(room) = current.take() {
                room.send(RoomCommand::Leave { conn }).await;
            }
            drop(msg_tx);
            // Let queued messages (e.g. shutdown) flush before closing.
            let _ = tokio::time::timeout(Duration::from_millis(250), sender_task).await;

            info!(%conn, "Client cleaned up");
        });
    }

    /// Route one client message to its room.
    async fn handle_client_message(
        conn: ConnectionId,
        msg: ClientMessage,
        directory: &RoomDirectory,
        current: &mut Option<RoomHandle>,
        clock: &dyn Clock,
        sender: &mpsc::Sender<ServerMessage>,
    ) {
        let command = match msg {
            ClientMessage::Ping { timestamp } => {
                let _ = sender
                    .send(ServerMessage::Pong { timestamp, server_time: clock.now_ms() })
                    .await;
                return;
            }
            ClientMessage::Join { player_id, name, room } => {
                let name_of_room = room
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| directory.config.default_room.clone());

                if let Some(previous) = current.take() {
                    if previous.name() != name_of_room {
                        previous.send(RoomCommand::Leave { conn }).await;
                    }
                }

                let command = RoomCommand::Join {
                    conn,
                    player_id,
                    name,
                    outbox: sender.clone(),
                };
                match directory.join(&name_of_room, command).await {
                    Ok(handle) => *current = Some(handle),
                    Err(e) => {
                        warn!(%conn, room = %name_of_room, "join refused: {}", e);
                        let _ = sender.send(ServerMessage::Error(e.to_server_error())).await;
                    }
                }
                return;
            }
            ClientMessage::Leave => {
                if let Some(room) = current.take() {
                    room.send(RoomCommand::Leave { conn }).await;
                }
                return;
            }
            ClientMessage::Move { position, .. } => RoomCommand::Move { conn, position },
            ClientMessage::Finish { .. } => RoomCommand::Finish { conn },
            ClientMessage::NextMaze => RoomCommand::NextMaze { conn },
        };

        // A room that emptied and closed no longer counts as joined.
        if let Some(room) = current.as_ref() {
            if room.send(command).await {
                return;
            }
            debug!(%conn, room = %room.name(), "room closed under connection");
            *current = None;
        }

        let _ = sender
            .send(ServerMessage::Error(ServerError::new(
                ErrorCode::NotInRoom,
                "join a room first",
            )))
            .await;
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Get number of open rooms.
    pub async fn room_count(&self) -> usize {
        self.directory.len().await
    }
}
