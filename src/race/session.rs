//! Race Session State Machine
//!
//! Owns one room's race lifecycle:
//!
//! ```text
//! Idle -> Running -> Finished(Win | Timeout) -> (rotate) -> Idle -> Running
//! ```
//!
//! All operations take `now` in epoch milliseconds. The elapsed-time ticker
//! is a [`TickGuard`] owned by the session and dropped on every transition
//! out of `Running`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use super::clock::Millis;
use super::player::PlayerId;
use super::ticker::TickGuard;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Race timing and rotation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceConfig {
    /// Elapsed-time tick period.
    pub tick_period: Duration,
    /// Races running this long end in a timeout.
    pub max_race_ms: u64,
    /// Time added per hazard respawn.
    pub respawn_penalty_ms: u64,
    /// Length of the maze rotation.
    pub total_mazes: usize,
    /// Minimum gap between two teleports by one player.
    pub teleport_cooldown_ms: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(100),
            max_race_ms: 300_000, // 5 minutes
            respawn_penalty_ms: 3_000,
            total_mazes: 5,
            teleport_cooldown_ms: 1_000,
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

/// How a finished race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceResult {
    Win,
    Timeout,
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum RacePhase {
    Idle,
    Running,
    Finished(RaceResult),
}

/// One leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    #[serde(rename = "id")]
    pub player_id: PlayerId,
    #[serde(rename = "name")]
    pub player_name: String,
    #[serde(rename = "time")]
    pub finish_time_ms: u64,
}

/// Result of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed.
    Inactive,
    /// Elapsed time updated.
    Running { elapsed_ms: u64 },
    /// Max duration reached on this tick.
    TimedOut { elapsed_ms: u64 },
}

/// Authoritative race state for one room.
#[derive(Debug)]
pub struct RaceSession {
    config: RaceConfig,
    current_maze_index: usize,
    phase: RacePhase,
    start_timestamp: Option<Millis>,
    elapsed_ms: u64,
    rankings: Vec<Ranking>,
    best_times: BTreeMap<usize, u64>,
    round: u64,
    ticker: Option<TickGuard>,
}

impl RaceSession {
    pub fn new(config: RaceConfig) -> Self {
        Self {
            config,
            current_maze_index: 0,
            phase: RacePhase::Idle,
            start_timestamp: None,
            elapsed_ms: 0,
            rankings: Vec::new(),
            best_times: BTreeMap::new(),
            round: 0,
            ticker: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn phase(&self) -> RacePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RacePhase::Running
    }

    pub fn current_maze_index(&self) -> usize {
        self.current_maze_index
    }

    pub fn start_timestamp(&self) -> Option<Millis> {
        self.start_timestamp
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Sorted ascending by finish time.
    pub fn rankings(&self) -> &[Ranking] {
        &self.rankings
    }

    /// Current rank #1, holder of rotate authority.
    pub fn leader(&self) -> Option<&Ranking> {
        self.rankings.first()
    }

    pub fn is_leader(&self, player_id: &str) -> bool {
        self.leader().map(|r| r.player_id == player_id).unwrap_or(false)
    }

    pub fn has_finished(&self, player_id: &str) -> bool {
        self.rankings.iter().any(|r| r.player_id == player_id)
    }

    pub fn best_time(&self, maze_index: usize) -> Option<u64> {
        self.best_times.get(&maze_index).copied()
    }

    pub fn best_times(&self) -> &BTreeMap<usize, u64> {
        &self.best_times
    }

    /// Increments on every start. Used to discard stale scheduled work.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// An elapsed-time ticker is attached.
    pub fn has_ticker(&self) -> bool {
        self.ticker.is_some()
    }

    fn elapsed_at(&self, now: Millis) -> u64 {
        self.start_timestamp
            .map(|start| now.saturating_sub(start).max(0) as u64)
            .unwrap_or(0)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Begin a round. Any previous ticker is dropped first.
    ///
    /// Returns the new round number.
    pub fn start_race(&mut self, now: Millis) -> u64 {
        self.ticker = None;
        self.phase = RacePhase::Running;
        self.start_timestamp = Some(now);
        self.elapsed_ms = 0;
        self.rankings.clear();
        self.round += 1;

        info!(
            maze = self.current_maze_index,
            round = self.round,
            "race started"
        );
        self.round
    }

    /// Install the elapsed-time ticker. Ignored unless running.
    pub fn attach_ticker(&mut self, guard: TickGuard) {
        if self.is_running() {
            self.ticker = Some(guard);
        }
    }

    /// Update elapsed time and enforce the max race duration.
    pub fn tick(&mut self, now: Millis) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Inactive;
        }

        self.elapsed_ms = self.elapsed_at(now);

        if self.elapsed_ms >= self.config.max_race_ms {
            self.phase = RacePhase::Finished(RaceResult::Timeout);
            self.ticker = None;
            info!(
                maze = self.current_maze_index,
                elapsed_ms = self.elapsed_ms,
                "race timed out"
            );
            return TickOutcome::TimedOut { elapsed_ms: self.elapsed_ms };
        }

        TickOutcome::Running { elapsed_ms: self.elapsed_ms }
    }

    /// Record a player reaching the finish.
    ///
    /// The first finisher ends the race. Later finishers in a won round are
    /// still ranked. Returns the finish time, or `None` if the call had no
    /// effect (not running, timed out, or already ranked).
    pub fn finish(&mut self, player_id: &str, player_name: &str, now: Millis) -> Option<u64> {
        match self.phase {
            RacePhase::Running => {
                let time = self.elapsed_at(now);
                self.elapsed_ms = time;
                self.phase = RacePhase::Finished(RaceResult::Win);
                self.ticker = None;
                self.upsert_ranking(player_id, player_name, time);
                info!(player_id, time_ms = time, "race won");
                Some(time)
            }
            RacePhase::Finished(RaceResult::Win) => {
                if self.has_finished(player_id) {
                    return None;
                }
                let time = self.elapsed_at(now);
                self.upsert_ranking(player_id, player_name, time);
                debug!(player_id, time_ms = time, "late finish ranked");
                Some(time)
            }
            _ => None,
        }
    }

    /// Upsert a finish time reported by an authority. Ends a running race.
    pub fn record_finish(&mut self, player_id: &str, player_name: &str, time_ms: u64) {
        if self.is_running() {
            self.elapsed_ms = time_ms;
            self.phase = RacePhase::Finished(RaceResult::Win);
            self.ticker = None;
        }
        self.upsert_ranking(player_id, player_name, time_ms);
    }

    /// Adopt a best time known elsewhere, keeping the lower of the two.
    pub fn merge_best_time(&mut self, maze_index: usize, time_ms: u64) {
        let best = self.best_times.entry(maze_index).or_insert(time_ms);
        *best = (*best).min(time_ms);
    }

    fn upsert_ranking(&mut self, player_id: &str, player_name: &str, time_ms: u64) {
        self.rankings.retain(|r| r.player_id != player_id);
        self.rankings.push(Ranking {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            finish_time_ms: time_ms,
        });
        self.rankings.sort_by_key(|r| r.finish_time_ms);
        self.merge_best_time(self.current_maze_index, time_ms);
    }

    /// Shift the start back by the respawn penalty. Only while running.
    pub fn apply_respawn_penalty(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        if let Some(start) = self.start_timestamp.as_mut() {
            *start -= self.config.respawn_penalty_ms as i64;
            debug!(penalty_ms = self.config.respawn_penalty_ms, "respawn penalty");
            return true;
        }
        false
    }

    /// Advance to the next maze in the rotation and return its index.
    ///
    /// Best times carry over; a fresh [`RaceSession::start_race`] is expected next.
    pub fn rotate(&mut self) -> usize {
        let next = (self.current_maze_index + 1) % self.config.total_mazes.max(1);
        self.enter_maze(next);
        next
    }

    /// Jump straight to a maze index, as announced by an authority.
    pub fn set_current_maze(&mut self, index: usize) {
        self.enter_maze(index % self.config.total_mazes.max(1));
    }

    fn enter_maze(&mut self, index: usize) {
        self.ticker = None;
        self.current_maze_index = index;
        self.phase = RacePhase::Idle;
        self.start_timestamp = None;
        self.elapsed_ms = 0;
        self.rankings.clear();
    }

    /// Back to idle on the first maze. Best times are kept.
    pub fn reset(&mut self) {
        self.enter_maze(0);
        info!("race session reset");
    }
}

impl Default for RaceSession {
    fn default() -> Self {
        Self::new(RaceConfig::default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
