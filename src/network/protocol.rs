//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every message is a JSON object tagged with `"type"` (snake_case) and
//! carrying camelCase fields.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::maze::{MazeData, Position};
use crate::race::{RacePhase, Ranking};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a room. Missing fields get server defaults.
    #[serde(rename_all = "camelCase")]
    Join {
        player_id: Option<String>,
        name: Option<String>,
        room: Option<String>,
    },

    /// Position report, relayed to everyone else.
    #[serde(rename_all = "camelCase")]
    Move {
        player_id: Option<String>,
        position: Position,
    },

    /// Sender reached the finish.
    #[serde(rename_all = "camelCase")]
    Finish { player_id: Option<String> },

    /// Ask to advance the rotation. Only the current leader is honoured.
    NextMaze,

    /// Leave the room.
    Leave,

    /// Ping for latency measurement.
    Ping { timestamp: u64 },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full snapshot for a (re)joining client.
    RoomState(RoomSnapshot),

    /// A round started.
    #[serde(rename_all = "camelCase")]
    RaceStart {
        maze: usize,
        start_time: i64,
        maze_data: MazeData,
    },

    /// The rotation advanced.
    #[serde(rename_all = "camelCase")]
    MazeUpdate {
        current_maze: usize,
        maze_data: MazeData,
    },

    /// Another player's position.
    #[serde(rename_all = "camelCase")]
    Move {
        player_id: String,
        position: Position,
    },

    /// Someone finished; rankings are authoritative.
    #[serde(rename_all = "camelCase")]
    PlayerFinish {
        player_id: String,
        player_name: String,
        time: u64,
        rankings: Vec<Ranking>,
    },

    /// The round hit the max duration.
    #[serde(rename_all = "camelCase")]
    RaceTimeout { maze: usize, elapsed_ms: u64 },

    /// A player entered the room.
    PlayerJoined { player: PlayerSnapshot },

    /// A player left the room.
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: String },

    /// Pong response.
    #[serde(rename_all = "camelCase")]
    Pong { timestamp: u64, server_time: i64 },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown { reason: String },
}

/// One participant as seen by others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub finish_time: Option<u64>,
}

/// Everything a late joiner needs to rebuild local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    /// Room name.
    pub room: String,
    /// Id the server assigned to the recipient.
    pub player_id: Option<String>,
    pub players: Vec<PlayerSnapshot>,
    pub rankings: Vec<Ranking>,
    pub current_maze: usize,
    pub race_active: bool,
    pub phase: RacePhase,
    pub elapsed_ms: u64,
    /// Epoch ms the current round started, if one is running or finished.
    pub start_time: Option<i64>,
    pub maze_data: Option<MazeData>,
    #[serde(default)]
    pub best_times: Vec<BestTime>,
}

/// Room record for one maze index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestTime {
    pub maze: usize,
    pub time: u64,
}

impl BestTime {
    /// Flatten a best-time map, ordered by maze index.
    pub fn from_map(map: &BTreeMap<usize, u64>) -> Vec<BestTime> {
        map.iter().map(|(maze, time)| BestTime { maze: *maze, time: *time }).collect()
    }
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Room is at capacity.
    RoomFull,
    /// Message arrived before a join.
    NotInRoom,
    /// Connection or room limit reached, or a room queue is full.
    ServerOverloaded,
    /// Maze could not be generated, or a room task stopped.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::RoomState(_) => "room_state",
            ServerMessage::RaceStart { .. } => "race_start",
            ServerMessage::MazeUpdate { .. } => "maze_update",
            ServerMessage::Move { .. } => "move",
            ServerMessage::PlayerFinish { .. } => "player_finish",
            ServerMessage::RaceTimeout { .. } => "race_timeout",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::PlayerLeft { .. } => "player_left",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::Error(_) => "error",
            ServerMessage::Shutdown { .. } => "shutdown",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_with_defaults() {
        let parsed = ClientMessage::from_json(r#"{"type":"join"}"#).unwrap();
        assert_eq!(
            parsed,
            ClientMessage::Join { player_id: None, name: None, room: None }
        );

        let parsed = ClientMessage::from_json(
            r#"{"type":"join","playerId":"abc","name":"Ada"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ClientMessage::Join {
                player_id: Some("abc".into()),
                name: Some("Ada".into()),
                room: None,
            }
        );
    }

    #[test]
    fn test_move_parsing() {
        let parsed = ClientMessage::from_json(
            r#"{"type":"move","playerId":"p1","position":{"x":1.5,"y":0.5,"z":-2.0}}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ClientMessage::Move {
                player_id: Some("p1".into()),
                position: Position::new(1.5, 0.5, -2.0),
            }
        );
    }

    #[test]
    fn test_malformed_move_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"move","position":{"x":1.0}}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"move"}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_unit_messages() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"next_maze"}"#).unwrap(),
            ClientMessage::NextMaze
        );
        assert_eq!(
            ClientMessage::NextMaze.to_json().unwrap(),
            r#"{"type":"next_maze"}"#
        );
    }

    #[test]
    fn test_race_start_wire_shape() {
        let msg = ServerMessage::RaceStart {
            maze: 2,
            start_time: 1_700_000_000_000,
            maze_data: MazeData::new(4242, 31, 31),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "race_start",
                "maze": 2,
                "startTime": 1_700_000_000_000i64,
                "mazeData": {"seed": 4242, "width": 31, "height": 31}
            })
        );
    }

    #[test]
    fn test_player_finish_wire_shape() {
        let msg = ServerMessage::PlayerFinish {
            player_id: "p1".into(),
            player_name: "Ada".into(),
            time: 4200,
            rankings: vec![Ranking {
                player_id: "p1".into(),
                player_name: "Ada".into(),
                finish_time_ms: 4200,
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "player_finish");
        assert_eq!(value["playerId"], "p1");
        assert_eq!(value["playerName"], "Ada");
        assert_eq!(value["rankings"][0]["time"], 4200);
    }

    #[test]
    fn test_room_state_round_trip() {
        let mut records = BTreeMap::new();
        records.insert(0, 3100);
        let best_times = BestTime::from_map(&records);
        let msg = ServerMessage::RoomState(RoomSnapshot {
            room: "maze_room".into(),
            player_id: Some("p1".into()),
            players: vec![PlayerSnapshot {
                id: "p1".into(),
                name: "Ada".into(),
                position: Position::new(0.0, 0.5, 0.0),
                finish_time: None,
            }],
            rankings: Vec::new(),
            current_maze: 1,
            race_active: true,
            phase: RacePhase::Running,
            elapsed_ms: 1200,
            start_time: Some(1_700_000_000_000),
            maze_data: Some(MazeData::new(7, 31, 31)),
            best_times,
        });

        let json = msg.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "room_state");
        assert_eq!(value["raceActive"], true);
        assert_eq!(value["currentMaze"], 1);
        assert_eq!(value["players"][0]["finishTime"], serde_json::Value::Null);
        assert_eq!(value["bestTimes"][0]["time"], 3100);

        let parsed = ServerMessage::from_json(&json).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::Error(ServerError::new(ErrorCode::RoomFull, "room is full"));
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"room_full\""));
        assert_eq!(msg.kind(), "error");
    }
}
