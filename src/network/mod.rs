//! Network Layer
//!
//! WebSocket server, JSON message contracts and the per-room race
//! coordinator. Everything here runs on wall-clock time; maze generation
//! stays in `maze/`.

pub mod config;
pub mod protocol;
pub mod room;
pub mod server;

pub use config::{ServerConfig, DEFAULT_PORT, DEFAULT_ROOM};
pub use protocol::{
    BestTime, ClientMessage, ErrorCode, PlayerSnapshot, RoomSnapshot, ServerError, ServerMessage,
};
pub use room::{ConnectionId, MazeRoom, NullScheduler, Outbound, RoomError, RoomScheduler, RoomSettings, Target};
pub use server::{GameServer, GameServerError, RoomCommand, RoomHandle};
