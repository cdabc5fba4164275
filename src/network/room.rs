//! Maze Room Coordinator
//!
//! Keeps one room's race state consistent across its connected clients:
//! join/leave, position relay, finish arbitration and maze rotation.
//!
//! The room is plain synchronous logic. Every operation takes `now` and
//! returns the messages to deliver; timers come from an injected
//! [`RoomScheduler`]. The server runs each room behind a single queue so
//! operations are totally ordered.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::rng::SeededRng;
use crate::maze::{generate, GenerationError, MazeData, MazeGrid, Position};
use crate::race::{
    Millis, PlayerRecord, RaceConfig, RacePhase, RaceSession, TickGuard, TickOutcome,
};
use super::config::ServerConfig;
use super::protocol::{BestTime, ErrorCode, PlayerSnapshot, RoomSnapshot, ServerError, ServerMessage};

/// Transient handle for one WebSocket connection.
pub type ConnectionId = Uuid;

/// Who receives an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every connection in the room.
    Broadcast,
    /// A single connection.
    To(ConnectionId),
    /// Everyone but one connection.
    AllExcept(ConnectionId),
}

/// A message the room wants delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Recipients.
    pub target: Target,
    /// Payload.
    pub message: ServerMessage,
}

impl Outbound {
    /// To every connection in the room.
    pub fn broadcast(message: ServerMessage) -> Self {
        Self { target: Target::Broadcast, message }
    }

    /// To one connection.
    pub fn to(conn: ConnectionId, message: ServerMessage) -> Self {
        Self { target: Target::To(conn), message }
    }

    /// To everyone but `conn`.
    pub fn all_except(conn: ConnectionId, message: ServerMessage) -> Self {
        Self { target: Target::AllExcept(conn), message }
    }
}

/// Timer source for a room.
pub trait RoomScheduler: Send {
    /// Deliver elapsed-time ticks every `period` until the guard drops.
    fn every(&self, period: Duration) -> TickGuard;

    /// Deliver an auto-advance for `round` after `delay` unless the guard drops.
    fn after(&self, delay: Duration, round: u64) -> TickGuard;
}

/// Scheduler that never fires. Ticks and advances are driven by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScheduler;

impl RoomScheduler for NullScheduler {
    fn every(&self, _period: Duration) -> TickGuard {
        TickGuard::inert()
    }

    fn after(&self, _delay: Duration, _round: u64) -> TickGuard {
        TickGuard::inert()
    }
}

/// Room errors.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Room is at capacity.
    #[error("room {room} is full ({capacity} players)")]
    RoomFull { room: String, capacity: usize },

    /// Connection has not joined this room.
    #[error("connection {0} is not in the room")]
    NotInRoom(ConnectionId),

    /// Maze generation failed.
    #[error("maze generation failed: {0}")]
    Generation(#[from] GenerationError),
}

impl RoomError {
    /// Client-facing form of this error.
    pub fn to_server_error(&self) -> ServerError {
        let code = match self {
            RoomError::RoomFull { .. } => ErrorCode::RoomFull,
            RoomError::NotInRoom(_) => ErrorCode::NotInRoom,
            RoomError::Generation(_) => ErrorCode::InternalError,
        };
        ServerError::new(code, self.to_string())
    }
}

/// Per-room settings.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Room name clients join by.
    pub name: String,
    /// Player limit.
    pub capacity: usize,
    /// Requested maze width.
    pub maze_width: usize,
    /// Requested maze height.
    pub maze_height: usize,
    /// Pause before an automatic advance.
    pub next_maze_delay: Duration,
    /// Seed of the room's seed stream. Random when unset.
    pub root_seed: Option<u32>,
    /// Race timing.
    pub race: RaceConfig,
}

impl RoomSettings {
    /// Settings for room `name` under the server configuration.
    pub fn from_config(config: &ServerConfig, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: config.room_capacity,
            maze_width: config.maze_width,
            maze_height: config.maze_height,
            next_maze_delay: config.next_maze_delay,
            root_seed: config.room_seed,
            race: config.race.clone(),
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default(), super::config::DEFAULT_ROOM)
    }
}

/// One multiplayer room.
pub struct MazeRoom {
    settings: RoomSettings,
    session: RaceSession,
    players: BTreeMap<ConnectionId, PlayerRecord>,
    seeds: SeededRng,
    maze: Option<MazeGrid>,
    scheduler: Box<dyn RoomScheduler>,
    advance: Option<TickGuard>,
}

impl MazeRoom {
    /// Empty idle room.
    pub fn new(settings: RoomSettings, scheduler: Box<dyn RoomScheduler>) -> Self {
        let seeds = SeededRng::from_optional(settings.root_seed);
        info!(room = %settings.name, root_seed = seeds.seed(), "room created");

        Self {
            session: RaceSession::new(settings.race.clone()),
            settings,
            players: BTreeMap::new(),
            seeds,
            maze: None,
            scheduler,
            advance: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn session(&self) -> &RaceSession {
        &self.session
    }

    /// Grid for the current round, if one is running or finished.
    pub fn maze(&self) -> Option<&MazeGrid> {
        self.maze.as_ref()
    }

    pub fn maze_data(&self) -> Option<MazeData> {
        self.maze.as_ref().map(MazeGrid::maze_data)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, conn: &ConnectionId) -> Option<&PlayerRecord> {
        self.players.get(conn)
    }

    /// An automatic advance is pending.
    pub fn advance_scheduled(&self) -> bool {
        self.advance.is_some()
    }

    /// Snapshot for a (re)joining client.
    pub fn snapshot(&self, recipient: Option<&ConnectionId>) -> RoomSnapshot {
        RoomSnapshot {
            room: self.settings.name.clone(),
            player_id: recipient
                .and_then(|conn| self.players.get(conn))
                .map(|p| p.id.clone()),
            players: self.players.values().map(player_snapshot).collect(),
            rankings: self.session.rankings().to_vec(),
            current_maze: self.session.current_maze_index(),
            race_active: self.session.is_running(),
            phase: self.session.phase(),
            elapsed_ms: self.session.elapsed_ms(),
            start_time: self.session.start_timestamp(),
            maze_data: self.maze_data(),
            best_times: BestTime::from_map(self.session.best_times()),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Add a connection to the room.
    ///
    /// A join carrying a known `player_id` replaces that player's stale
    /// record. The first join into an idle room starts a race.
    pub fn join(
        &mut self,
        conn: ConnectionId,
        player_id: Option<String>,
        name: Option<String>,
        now: Millis,
    ) -> Result<Vec<Outbound>, RoomError> {
        let id = player_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| PlayerRecord::default_name(&id));

        let stale: Vec<ConnectionId> = self
            .players
            .iter()
            .filter(|(c, p)| **c == conn || p.id == id)
            .map(|(c, _)| *c)
            .collect();
        let mut previous = None;
        for c in stale {
            previous = self.players.remove(&c);
            debug!(room = %self.settings.name, player_id = %id, "replacing stale record");
        }

        if self.players.len() >= self.settings.capacity {
            return Err(RoomError::RoomFull {
                room: self.settings.name.clone(),
                capacity: self.settings.capacity,
            });
        }

        let mut out = Vec::new();
        if self.session.phase() == RacePhase::Idle {
            let maze_data = self.begin_round(now)?;
            out.push(self.race_start(now, maze_data));
        }

        let mut record = PlayerRecord::new(id.clone(), name);
        // Reconnecting keeps progress made in the current round.
        if let Some(prev) = previous {
            record.position = prev.position;
            record.finish_time_ms = prev.finish_time_ms;
            record.last_checkpoint = prev.last_checkpoint;
        }
        let snapshot = player_snapshot(&record);
        self.players.insert(conn, record);

        info!(
            room = %self.settings.name,
            player_id = %id,
            players = self.players.len(),
            "player joined"
        );

        out.insert(0, Outbound::to(conn, ServerMessage::RoomState(self.snapshot(Some(&conn)))));
        out.insert(1, Outbound::all_except(conn, ServerMessage::PlayerJoined { player: snapshot }));
        Ok(out)
    }

    /// Relay a position report. Non-finite positions are dropped.
    pub fn move_player(&mut self, conn: ConnectionId, position: Position) -> Result<Vec<Outbound>, RoomError> {
        let player = self.players.get_mut(&conn).ok_or(RoomError::NotInRoom(conn))?;

        if !position.is_finite() {
            warn!(player_id = %player.id, ?position, "dropping non-finite position");
            return Ok(Vec::new());
        }

        player.position = position;
        Ok(vec![Outbound::all_except(
            conn,
            ServerMessage::Move { player_id: player.id.clone(), position },
        )])
    }

    /// Record the sender reaching the finish.
    pub fn finish(&mut self, conn: ConnectionId, now: Millis) -> Result<Vec<Outbound>, RoomError> {
        let player = self.players.get_mut(&conn).ok_or(RoomError::NotInRoom(conn))?;

        let time = match self.session.finish(&player.id, &player.name, now) {
            Some(time) => time,
            None => {
                debug!(player_id = %player.id, "finish ignored");
                return Ok(Vec::new());
            }
        };
        player.finish_time_ms = Some(time);

        let message = ServerMessage::PlayerFinish {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            time,
            rankings: self.session.rankings().to_vec(),
        };

        if self.players.values().all(PlayerRecord::has_finished) {
            self.schedule_advance();
        }

        Ok(vec![Outbound::broadcast(message)])
    }

    /// Advance the rotation if the sender holds rank #1. Otherwise ignored.
    pub fn next_maze(&mut self, conn: ConnectionId, now: Millis) -> Result<Vec<Outbound>, RoomError> {
        let player = self.players.get(&conn).ok_or(RoomError::NotInRoom(conn))?;

        if !self.session.is_leader(&player.id) {
            debug!(player_id = %player.id, "next maze request ignored, not the leader");
            return Ok(Vec::new());
        }

        self.rotate_and_start(now)
    }

    /// Remove a connection. An emptied room resets to idle.
    ///
    /// If everyone still present has finished, the advance is scheduled
    /// just as if the last of them had finished now.
    pub fn leave(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        let player = match self.players.remove(&conn) {
            Some(player) => player,
            None => return Vec::new(),
        };

        info!(
            room = %self.settings.name,
            player_id = %player.id,
            players = self.players.len(),
            "player left"
        );

        if self.players.is_empty() {
            self.reset();
            return Vec::new();
        }

        if self.advance.is_none()
            && matches!(self.session.phase(), RacePhase::Finished(_))
            && self.players.values().all(PlayerRecord::has_finished)
        {
            self.schedule_advance();
        }

        vec![Outbound::broadcast(ServerMessage::PlayerLeft { player_id: player.id })]
    }

    /// Elapsed-time tick. Broadcasts a timeout when the round runs out.
    pub fn tick(&mut self, now: Millis) -> Vec<Outbound> {
        match self.session.tick(now) {
            TickOutcome::TimedOut { elapsed_ms } => {
                self.schedule_advance();
                vec![Outbound::broadcast(ServerMessage::RaceTimeout {
                    maze: self.session.current_maze_index(),
                    elapsed_ms,
                })]
            }
            TickOutcome::Running { .. } | TickOutcome::Inactive => Vec::new(),
        }
    }

    /// Scheduled advance. Ignored if the round already moved on.
    pub fn auto_advance(&mut self, round: u64, now: Millis) -> Result<Vec<Outbound>, RoomError> {
        if round != self.session.round() || self.players.is_empty() {
            debug!(round, current = self.session.round(), "stale auto advance");
            return Ok(Vec::new());
        }
        if !matches!(self.session.phase(), RacePhase::Finished(_)) {
            return Ok(Vec::new());
        }
        self.rotate_and_start(now)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn begin_round(&mut self, now: Millis) -> Result<MazeData, RoomError> {
        let seed = self.seeds.next_published_seed();
        let grid = generate(
            self.settings.maze_width,
            self.settings.maze_height,
            self.session.current_maze_index(),
            seed,
        )?;
        let maze_data = grid.maze_data();
        self.maze = Some(grid);
        self.advance = None;

        for player in self.players.values_mut() {
            player.reset_for_round();
        }

        self.session.start_race(now);
        let ticker = self.scheduler.every(self.settings.race.tick_period);
        self.session.attach_ticker(ticker);

        info!(
            room = %self.settings.name,
            maze = self.session.current_maze_index(),
            seed,
            "round started"
        );

        Ok(maze_data)
    }

    fn race_start(&self, now: Millis, maze_data: MazeData) -> Outbound {
        Outbound::broadcast(ServerMessage::RaceStart {
            maze: self.session.current_maze_index(),
            start_time: now,
            maze_data,
        })
    }

    fn rotate_and_start(&mut self, now: Millis) -> Result<Vec<Outbound>, RoomError> {
        self.session.rotate();
        self.maze = None;

        let maze_data = self.begin_round(now)?;
        Ok(vec![
            Outbound::broadcast(ServerMessage::MazeUpdate {
                current_maze: self.session.current_maze_index(),
                maze_data: maze_data.clone(),
            }),
            self.race_start(now, maze_data),
        ])
    }

    fn schedule_advance(&mut self) {
        let round = self.session.round();
        self.advance = Some(self.scheduler.after(self.settings.next_maze_delay, round));
        debug!(room = %self.settings.name, round, "auto advance scheduled");
    }

    fn reset(&mut self) {
        self.session.reset();
        self.maze = None;
        self.advance = None;
    }
}

fn player_snapshot(player: &PlayerRecord) -> PlayerSnapshot {
    PlayerSnapshot {
        id: player.id.clone(),
        name: player.name.clone(),
        position: player.position,
        finish_time: player.finish_time_ms,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race::RaceResult;
    use std::sync::{Arc, Mutex};

    const T0: Millis = 1_700_000_000_000;

    fn settings() -> RoomSettings {
        RoomSettings {
            name: "test_room".into(),
            capacity: 3,
            maze_width: 15,
            maze_height: 15,
            next_maze_delay: Duration::from_secs(10),
            root_seed: Some(42),
            race: RaceConfig::default(),
        }
    }

    fn room() -> MazeRoom {
        MazeRoom::new(settings(), Box::new(NullScheduler))
    }

    /// Records what was scheduled.
    #[derive(Clone, Default)]
    struct RecordingScheduler {
        advances: Arc<Mutex<Vec<u64>>>,
    }

    impl RoomScheduler for RecordingScheduler {
        fn every(&self, _period: Duration) -> TickGuard {
            TickGuard::inert()
        }

        fn after(&self, _delay: Duration, round: u64) -> TickGuard {
            if let Ok(mut advances) = self.advances.lock() {
                advances.push(round);
            }
            TickGuard::inert()
        }
    }

    fn join(room: &mut MazeRoom, id: &str) -> ConnectionId {
        let conn = Uuid::new_v4();
        room.join(conn, Some(id.into()), None, T0).unwrap();
        conn
    }

    fn kinds(out: &[Outbound]) -> Vec<&'static str> {
        out.iter().map(|o| o.message.kind()).collect()
    }

    #[test]
    fn test_first_join_starts_race() {
        let mut room = room();
        let conn = Uuid::new_v4();
        let out = room.join(conn, None, None, T0).unwrap();

        assert_eq!(kinds(&out), vec!["room_state", "player_joined", "race_start"]);
        assert_eq!(out[0].target, Target::To(conn));
        assert!(room.session().is_running());
        assert!(room.maze().is_some());

        match &out[0].message {
            ServerMessage::RoomState(snapshot) => {
                assert!(snapshot.race_active);
                assert_eq!(snapshot.players.len(), 1);
                let id = snapshot.player_id.clone().unwrap();
                assert_eq!(snapshot.players[0].name, PlayerRecord::default_name(&id));
                assert_eq!(snapshot.maze_data, room.maze_data());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_second_join_does_not_restart() {
        let mut room = room();
        join(&mut room, "a");
        let round = room.session().round();

        let conn = Uuid::new_v4();
        let out = room.join(conn, Some("b".into()), Some("Bob".into()), T0 + 500).unwrap();
        assert_eq!(kinds(&out), vec!["room_state", "player_joined"]);
        assert_eq!(room.session().round(), round);
    }

    #[test]
    fn test_room_full() {
        let mut room = room();
        join(&mut room, "a");
        join(&mut room, "b");
        join(&mut room, "c");

        let err = room.join(Uuid::new_v4(), Some("d".into()), None, T0).unwrap_err();
        assert!(matches!(err, RoomError::RoomFull { capacity: 3, .. }));
        assert_eq!(err.to_server_error().code, ErrorCode::RoomFull);
        assert_eq!(room.player_count(), 3);
    }

    #[test]
    fn test_rejoin_replaces_stale_record() {
        let mut room = room();
        let old = join(&mut room, "a");
        join(&mut room, "b");
        join(&mut room, "c");

        // Full room, but the reconnecting player frees their own slot.
        let new = Uuid::new_v4();
        room.join(new, Some("a".into()), Some("Ada".into()), T0).unwrap();
        assert_eq!(room.player_count(), 3);
        assert!(room.player(&old).is_none());
        assert_eq!(room.player(&new).unwrap().name, "Ada");
    }

    #[test]
    fn test_move_relayed_to_others() {
        let mut room = room();
        let a = join(&mut room, "a");
        let position = Position::new(1.0, 0.5, 2.0);

        let out = room.move_player(a, position).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Target::AllExcept(a));
        assert_eq!(
            out[0].message,
            ServerMessage::Move { player_id: "a".into(), position }
        );
        assert_eq!(room.player(&a).unwrap().position, position);
    }

    #[test]
    fn test_non_finite_move_dropped() {
        let mut room = room();
        let a = join(&mut room, "a");
        let out = room.move_player(a, Position::new(f64::NAN, 0.5, 0.0)).unwrap();
        assert!(out.is_empty());
        assert_eq!(room.player(&a).unwrap().position, Position::default());
    }

    #[test]
    fn test_unknown_connection() {
        let mut room = room();
        let stranger = Uuid::new_v4();
        assert!(matches!(
            room.move_player(stranger, Position::default()),
            Err(RoomError::NotInRoom(_))
        ));
        assert!(room.leave(stranger).is_empty());
    }

    #[test]
    fn test_finish_broadcasts_rankings() {
        let mut room = room();
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");

        let out = room.finish(b, T0 + 3_000).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Target::Broadcast);
        match &out[0].message {
            ServerMessage::PlayerFinish { player_id, time, rankings, .. } => {
                assert_eq!(player_id, "b");
                assert_eq!(*time, 3_000);
                assert_eq!(rankings.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        let out = room.finish(a, T0 + 5_000).unwrap();
        match &out[0].message {
            ServerMessage::PlayerFinish { rankings, .. } => {
                assert_eq!(rankings[0].player_id, "b");
                assert_eq!(rankings[1].player_id, "a");
            }
            other => panic!("unexpected {:?}", other),
        }

        // Duplicate finish is a no-op.
        assert!(room.finish(a, T0 + 6_000).unwrap().is_empty());
        assert_eq!(room.session().rankings().len(), 2);
    }

    #[test]
    fn test_next_maze_gated_to_leader() {
        let mut room = room();
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");
        room.finish(a, T0 + 2_000).unwrap();
        room.finish(b, T0 + 4_000).unwrap();

        assert!(room.next_maze(b, T0 + 5_000).unwrap().is_empty());
        assert_eq!(room.session().current_maze_index(), 0);

        let seed_before = room.maze().map(|m| m.seed());
        let out = room.next_maze(a, T0 + 5_000).unwrap();
        assert_eq!(kinds(&out), vec!["maze_update", "race_start"]);
        assert_eq!(room.session().current_maze_index(), 1);
        assert!(room.session().is_running());
        assert!(room.session().rankings().is_empty());
        assert_eq!(room.session().best_time(0), Some(2_000));
        assert_ne!(room.maze().map(|m| m.seed()), seed_before);
        assert!(room.players.values().all(|p| !p.has_finished()));
    }

    #[test]
    fn test_next_maze_ignored_before_anyone_finishes() {
        let mut room = room();
        let a = join(&mut room, "a");
        assert!(room.next_maze(a, T0 + 1_000).unwrap().is_empty());
        assert!(room.session().is_running());
    }

    #[test]
    fn test_all_finished_schedules_advance() {
        let scheduler = RecordingScheduler::default();
        let advances = scheduler.advances.clone();
        let mut room = MazeRoom::new(settings(), Box::new(scheduler));
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");

        room.finish(a, T0 + 1_000).unwrap();
        assert!(!room.advance_scheduled());
        room.finish(b, T0 + 2_000).unwrap();
        assert!(room.advance_scheduled());

        let round = room.session().round();
        assert_eq!(*advances.lock().unwrap(), vec![round]);

        // Stale round is ignored; the live one rotates.
        assert!(room.auto_advance(round + 7, T0 + 12_000).unwrap().is_empty());
        let out = room.auto_advance(round, T0 + 12_000).unwrap();
        assert_eq!(kinds(&out), vec!["maze_update", "race_start"]);
        assert_eq!(room.session().current_maze_index(), 1);
        assert!(!room.advance_scheduled());
    }

    #[test]
    fn test_leaving_straggler_schedules_advance() {
        let mut room = room();
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");
        let c = join(&mut room, "c");

        room.finish(a, T0 + 1_000).unwrap();
        room.finish(b, T0 + 2_000).unwrap();
        assert!(!room.advance_scheduled());

        // The only unfinished player leaves, then the leader does.
        assert_eq!(kinds(&room.leave(c)), vec!["player_left"]);
        assert!(room.advance_scheduled());
        room.leave(a);
        assert_eq!(room.player_count(), 1);
        assert!(room.advance_scheduled());

        let round = room.session().round();
        let out = room.auto_advance(round, T0 + 12_000).unwrap();
        assert_eq!(kinds(&out), vec!["maze_update", "race_start"]);
        assert_eq!(room.session().current_maze_index(), 1);
        assert!(room.session().is_running());
    }

    #[test]
    fn test_leave_keeps_waiting_for_unfinished_players() {
        let mut room = room();
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");
        let c = join(&mut room, "c");

        room.finish(a, T0 + 1_000).unwrap();
        room.leave(c);
        assert!(!room.advance_scheduled());
        assert!(room.player(&b).is_some());
    }

    #[test]
    fn test_timeout_broadcast_and_advance() {
        let mut config = settings();
        config.race.max_race_ms = 10_000;
        let mut room = MazeRoom::new(config, Box::new(NullScheduler));
        join(&mut room, "a");

        assert!(room.tick(T0 + 5_000).is_empty());
        let out = room.tick(T0 + 10_000);
        assert_eq!(kinds(&out), vec!["race_timeout"]);
        assert_eq!(
            room.session().phase(),
            RacePhase::Finished(RaceResult::Timeout)
        );
        assert!(room.session().rankings().is_empty());
        assert!(room.advance_scheduled());

        let round = room.session().round();
        room.auto_advance(round, T0 + 20_000).unwrap();
        assert!(room.session().is_running());
    }

    #[test]
    fn test_last_leave_resets_room() {
        let mut room = room();
        let a = join(&mut room, "a");
        let b = join(&mut room, "b");
        room.finish(a, T0 + 1_000).unwrap();
        room.next_maze(a, T0 + 2_000).unwrap();
        assert_eq!(room.session().current_maze_index(), 1);

        let out = room.leave(b);
        assert_eq!(kinds(&out), vec!["player_left"]);

        assert!(room.leave(a).is_empty());
        assert!(room.is_empty());
        assert_eq!(room.session().phase(), RacePhase::Idle);
        assert_eq!(room.session().current_maze_index(), 0);
        assert!(room.maze().is_none());

        // Reusable: next join starts a fresh race.
        let out = room.join(Uuid::new_v4(), None, None, T0 + 9_000).unwrap();
        assert!(kinds(&out).contains(&"race_start"));
    }

    #[test]
    fn test_seed_stream_is_reproducible() {
        let mut first = room();
        let mut second = room();
        join(&mut first, "a");
        join(&mut second, "a");
        assert_eq!(first.maze_data(), second.maze_data());
    }
}
