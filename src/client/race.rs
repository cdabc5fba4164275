//! Client Race Context
//!
//! Everything a client needs to run its half of a race: the local player,
//! a local [`RaceSession`] mirroring the room, the maze regenerated from the
//! broadcast seed with its activation registry, and remote player positions.
//!
//! State changes only through [`ClientRace::apply`] (server messages),
//! [`ClientRace::update_position`] (local movement) and
//! [`ClientRace::tick`] (local clock).

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::maze::zones::grid_to_world;
use crate::maze::{generate, Activation, ActivationZones, GridCoord, HazardKind, MazeData, MazeGrid, Position};
use crate::network::protocol::{ClientMessage, PlayerSnapshot, ServerMessage};
use crate::race::{Millis, PlayerId, PlayerRecord, RaceConfig, RaceSession, TickOutcome};
use super::persist::PersistedState;

/// Something the render/UI layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A round started on the given maze.
    RaceStarted { maze: usize },
    /// The rotation moved to a new maze.
    MazeChanged { maze: usize },
    /// Local player hit a trap and was sent back.
    HazardHit { kind: HazardKind, respawn: Position },
    /// Local player went through a teleporter.
    Teleported { from: GridCoord, to: Position },
    /// Local player touched a new checkpoint.
    CheckpointReached(GridCoord),
    /// Local player reached the finish.
    Finished { time_ms: u64 },
    /// Authoritative rankings changed.
    RankingsUpdated,
    /// The round ran out of time.
    TimedOut,
    /// Someone else joined, left or moved.
    PlayersChanged,
}

/// Result of a local position update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// For the UI.
    pub events: Vec<ClientEvent>,
    /// For the server. A `Move` always comes first.
    pub outbound: Vec<ClientMessage>,
}

/// A remote participant as last reported.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    /// Display name.
    pub name: String,
    /// Last relayed position.
    pub position: Position,
    /// Server-reported finish time this round.
    pub finish_time_ms: Option<u64>,
}

/// Client-side race state.
pub struct ClientRace {
    player: PlayerRecord,
    session: RaceSession,
    maze: Option<MazeGrid>,
    zones: ActivationZones,
    remotes: BTreeMap<PlayerId, RemotePlayer>,
}

impl ClientRace {
    /// Client for the local player, before any maze is known.
    pub fn new(player_id: impl Into<PlayerId>, name: impl Into<String>, config: RaceConfig) -> Self {
        Self {
            player: PlayerRecord::new(player_id, name),
            session: RaceSession::new(config),
            maze: None,
            zones: ActivationZones::default(),
            remotes: BTreeMap::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn player(&self) -> &PlayerRecord {
        &self.player
    }

    pub fn session(&self) -> &RaceSession {
        &self.session
    }

    pub fn maze(&self) -> Option<&MazeGrid> {
        self.maze.as_ref()
    }

    pub fn zones(&self) -> &ActivationZones {
        &self.zones
    }

    pub fn remote_players(&self) -> &BTreeMap<PlayerId, RemotePlayer> {
        &self.remotes
    }

    /// Join request for this player.
    pub fn join_message(&self, room: Option<String>) -> ClientMessage {
        ClientMessage::Join {
            player_id: Some(self.player.id.clone()),
            name: Some(self.player.name.clone()),
            room,
        }
    }

    /// What survives a page reload.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            current_maze_index: self.session.current_maze_index(),
            maze_data: self.maze.as_ref().map(MazeGrid::maze_data),
        }
    }

    /// Restore the maze a previous run was on.
    ///
    /// Maze data with out-of-range dimensions is dropped and the client
    /// waits for the server's maze instead.
    pub fn restore(&mut self, state: &PersistedState) {
        self.session.set_current_maze(state.current_maze_index);
        match &state.maze_data {
            Some(data) if data.has_valid_dimensions() => self.load_maze(data),
            Some(data) => {
                warn!(width = data.width, height = data.height, "ignoring saved maze with bad dimensions");
            }
            None => {}
        }
    }

    // =========================================================================
    // Maze
    // =========================================================================

    /// Regenerate the maze for the current rotation slot from its seed.
    ///
    /// A fingerprint mismatch is logged and the local grid is kept. A maze
    /// that fails to generate leaves the client without a grid.
    pub fn load_maze(&mut self, data: &MazeData) {
        let variant = self.session.current_maze_index();
        match generate(data.width, data.height, variant, data.seed) {
            Ok(grid) => {
                if let Some(expected) = &data.fingerprint {
                    let local = grid.fingerprint();
                    if *expected != local {
                        warn!(
                            seed = data.seed,
                            expected = %expected,
                            local = %local,
                            "regenerated maze differs from the server's"
                        );
                    }
                }
                self.install_grid(grid);
            }
            Err(e) => {
                warn!(seed = data.seed, "could not regenerate maze: {}", e);
                self.maze = None;
                self.zones = ActivationZones::default();
            }
        }
    }

    /// Use an already built grid for this round.
    pub fn install_grid(&mut self, grid: MazeGrid) {
        self.zones = ActivationZones::build(&grid);
        debug!(
            seed = grid.seed(),
            hazards = self.zones.hazard_count(),
            teleporters = self.zones.teleporter_count(),
            checkpoints = self.zones.checkpoint_count(),
            "maze installed"
        );
        self.maze = Some(grid);
    }

    fn spawn_point(&self) -> Option<Position> {
        self.maze
            .as_ref()
            .map(|grid| grid_to_world(grid.start(), grid.width(), grid.height()))
    }

    // =========================================================================
    // Server messages
    // =========================================================================

    /// Apply one server message.
    pub fn apply(&mut self, message: ServerMessage, now: Millis) -> Vec<ClientEvent> {
        match message {
            ServerMessage::RoomState(snapshot) => {
                if let Some(id) = snapshot.player_id {
                    self.player.id = id;
                }
                self.remotes.clear();
                for player in &snapshot.players {
                    self.upsert_remote(player);
                }

                self.session.set_current_maze(snapshot.current_maze);
                for best in &snapshot.best_times {
                    self.session.merge_best_time(best.maze, best.time);
                }
                if let Some(data) = &snapshot.maze_data {
                    self.load_maze(data);
                }
                self.player.reset_for_round();

                let mut events = vec![ClientEvent::PlayersChanged];
                if snapshot.race_active {
                    self.session.start_race(snapshot.start_time.unwrap_or(now));
                    self.session.tick(now);
                    events.push(ClientEvent::RaceStarted { maze: snapshot.current_maze });
                }
                for ranking in &snapshot.rankings {
                    self.session.record_finish(&ranking.player_id, &ranking.player_name, ranking.finish_time_ms);
                    if ranking.player_id == self.player.id {
                        self.player.finish_time_ms = Some(ranking.finish_time_ms);
                    }
                }
                events
            }

            ServerMessage::RaceStart { maze, start_time, maze_data } => {
                self.session.set_current_maze(maze);
                self.load_maze(&maze_data);
                self.player.reset_for_round();
                if let Some(spawn) = self.spawn_point() {
                    self.player.position = spawn;
                }
                for remote in self.remotes.values_mut() {
                    remote.finish_time_ms = None;
                }
                self.session.start_race(start_time);
                info!(maze, seed = maze_data.seed, "race started");
                vec![ClientEvent::RaceStarted { maze }]
            }

            ServerMessage::MazeUpdate { current_maze, maze_data } => {
                self.session.set_current_maze(current_maze);
                self.load_maze(&maze_data);
                vec![ClientEvent::MazeChanged { maze: current_maze }]
            }

            ServerMessage::PlayerFinish { player_id, time, rankings, .. } => {
                for ranking in &rankings {
                    self.session.record_finish(&ranking.player_id, &ranking.player_name, ranking.finish_time_ms);
                }
                if player_id == self.player.id {
                    self.player.finish_time_ms = Some(time);
                } else if let Some(remote) = self.remotes.get_mut(&player_id) {
                    remote.finish_time_ms = Some(time);
                }
                vec![ClientEvent::RankingsUpdated]
            }

            ServerMessage::Move { player_id, position } => {
                if player_id == self.player.id {
                    return Vec::new();
                }
                if !position.is_finite() {
                    warn!(%player_id, "dropping non-finite remote position");
                    return Vec::new();
                }
                match self.remotes.get_mut(&player_id) {
                    Some(remote) => remote.position = position,
                    None => {
                        self.remotes.insert(
                            player_id.clone(),
                            RemotePlayer {
                                name: PlayerRecord::default_name(&player_id),
                                position,
                                finish_time_ms: None,
                            },
                        );
                    }
                }
                vec![ClientEvent::PlayersChanged]
            }

            ServerMessage::RaceTimeout { .. } => {
                if let Some(start) = self.session.start_timestamp() {
                    let deadline = start + self.session.config().max_race_ms as i64;
                    if let TickOutcome::TimedOut { .. } = self.session.tick(deadline.max(now)) {
                        return vec![ClientEvent::TimedOut];
                    }
                }
                Vec::new()
            }

            ServerMessage::PlayerJoined { player } => {
                if player.id == self.player.id {
                    return Vec::new();
                }
                self.upsert_remote(&player);
                vec![ClientEvent::PlayersChanged]
            }

            ServerMessage::PlayerLeft { player_id } => {
                if self.remotes.remove(&player_id).is_some() {
                    vec![ClientEvent::PlayersChanged]
                } else {
                    Vec::new()
                }
            }

            ServerMessage::Error(err) => {
                warn!(code = ?err.code, "server error: {}", err.message);
                Vec::new()
            }

            ServerMessage::Shutdown { reason } => {
                info!(%reason, "server shutting down");
                Vec::new()
            }

            ServerMessage::Pong { .. } => Vec::new(),
        }
    }

    fn upsert_remote(&mut self, player: &PlayerSnapshot) {
        if player.id == self.player.id {
            return;
        }
        self.remotes.insert(
            player.id.clone(),
            RemotePlayer {
                name: player.name.clone(),
                position: player.position,
                finish_time_ms: player.finish_time,
            },
        );
    }

    // =========================================================================
    // Local movement
    // =========================================================================

    /// Advance the local elapsed time.
    pub fn tick(&mut self, now: Millis) -> Option<ClientEvent> {
        match self.session.tick(now) {
            TickOutcome::TimedOut { .. } => Some(ClientEvent::TimedOut),
            _ => None,
        }
    }

    /// Report where the local player is and resolve what they stepped on.
    pub fn update_position(&mut self, position: Position, now: Millis) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        if !position.is_finite() {
            warn!(?position, "ignoring non-finite local position");
            return outcome;
        }
        self.player.position = position;

        if self.session.is_running() && !self.player.has_finished() {
            if let Some((at, activation)) = self.zones.probe_world(&position) {
                self.activate(at, activation, now, &mut outcome);
            }
        }

        outcome.outbound.insert(
            0,
            ClientMessage::Move {
                player_id: Some(self.player.id.clone()),
                position: self.player.position,
            },
        );
        outcome
    }

    fn activate(&mut self, at: GridCoord, activation: Activation, now: Millis, outcome: &mut StepOutcome) {
        let grid = match &self.maze {
            Some(grid) => grid,
            None => return,
        };
        let (width, height) = (grid.width(), grid.height());

        match activation {
            Activation::Hazard(kind) => {
                self.session.apply_respawn_penalty();
                let respawn = grid_to_world(self.player.respawn_point(grid), width, height);
                self.player.position = respawn;
                debug!(?kind, x = at.x, y = at.y, "hazard hit");
                outcome.events.push(ClientEvent::HazardHit { kind, respawn });
            }
            Activation::Teleport { to } => {
                let cooldown = self.session.config().teleport_cooldown_ms;
                if self.player.try_teleport(now, cooldown) {
                    let destination = grid_to_world(to, width, height);
                    self.player.position = destination;
                    outcome.events.push(ClientEvent::Teleported { from: at, to: destination });
                }
            }
            Activation::Checkpoint(checkpoint) => {
                if self.player.reach_checkpoint(checkpoint) {
                    outcome.events.push(ClientEvent::CheckpointReached(checkpoint));
                }
            }
            Activation::Finish => {
                let id = self.player.id.clone();
                let name = self.player.name.clone();
                if let Some(time_ms) = self.session.finish(&id, &name, now) {
                    self.player.finish_time_ms = Some(time_ms);
                    outcome.events.push(ClientEvent::Finished { time_ms });
                    outcome.outbound.push(ClientMessage::Finish { player_id: Some(id) });
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
