//! Server Configuration
//!
//! Defaults plus `MAZE_*` environment overrides. Invalid values are logged
//! and ignored rather than aborting startup.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::maze::{MAX_DIMENSION, MIN_DIMENSION};
use crate::race::RaceConfig;

/// Default WebSocket port.
pub const DEFAULT_PORT: u16 = 2567;

/// Default room name.
pub const DEFAULT_ROOM: &str = "maze_room";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Maximum live rooms. Joins naming a new room beyond this are refused.
    pub max_rooms: usize,
    /// Players per room.
    pub room_capacity: usize,
    /// Room used when a join names none.
    pub default_room: String,
    /// Requested maze width (normalized by the generator).
    pub maze_width: usize,
    /// Requested maze height (normalized by the generator).
    pub maze_height: usize,
    /// Pause before an automatic advance to the next maze.
    pub next_maze_delay: Duration,
    /// Root seed for each room's seed stream. Random when unset.
    pub room_seed: Option<u32>,
    /// Race timing.
    pub race: RaceConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_connections: 1000,
            max_rooms: 100,
            room_capacity: 8,
            default_room: DEFAULT_ROOM.to_string(),
            maze_width: 30,
            maze_height: 30,
            next_maze_delay: Duration::from_secs(10),
            room_seed: None,
            race: RaceConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load from process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let race = RaceConfig {
            max_race_ms: parse_or(&lookup, "MAZE_MAX_RACE_MS", defaults.race.max_race_ms),
            respawn_penalty_ms: parse_or(
                &lookup,
                "MAZE_RESPAWN_PENALTY_MS",
                defaults.race.respawn_penalty_ms,
            ),
            ..defaults.race.clone()
        };

        Self {
            bind_addr: parse_or(&lookup, "MAZE_BIND_ADDR", defaults.bind_addr),
            max_connections: parse_or(&lookup, "MAZE_MAX_CONNECTIONS", defaults.max_connections),
            max_rooms: parse_or(&lookup, "MAZE_MAX_ROOMS", defaults.max_rooms).max(1),
            room_capacity: parse_or(&lookup, "MAZE_ROOM_CAPACITY", defaults.room_capacity).max(1),
            maze_width: dimension_or(&lookup, "MAZE_WIDTH", defaults.maze_width),
            maze_height: dimension_or(&lookup, "MAZE_HEIGHT", defaults.maze_height),
            next_maze_delay: Duration::from_millis(parse_or(
                &lookup,
                "MAZE_NEXT_DELAY_MS",
                defaults.next_maze_delay.as_millis() as u64,
            )),
            room_seed: lookup("MAZE_ROOM_SEED").and_then(|raw| match raw.trim().parse() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    warn!(key = "MAZE_ROOM_SEED", value = %raw, "invalid value, using random seeds");
                    None
                }
            }),
            race,
            ..defaults
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "invalid value, using default");
                default
            }
        },
        None => default,
    }
}

/// Maze side length, clamped to what the generator accepts.
fn dimension_or<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    let clamped = value.clamp(MIN_DIMENSION, MAX_DIMENSION);
    if clamped != value {
        warn!(key, value, clamped, "maze dimension out of range, clamping");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.room_capacity, 8);
        assert_eq!(config.max_rooms, 100);
        assert_eq!(config.default_room, "maze_room");
        assert_eq!(config.next_maze_delay, Duration::from_secs(10));
        assert_eq!(config.race.max_race_ms, 300_000);
        assert!(config.room_seed.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("MAZE_BIND_ADDR", "127.0.0.1:9000"),
            ("MAZE_ROOM_CAPACITY", "4"),
            ("MAZE_MAX_ROOMS", "12"),
            ("MAZE_WIDTH", "41"),
            ("MAZE_MAX_RACE_MS", "60000"),
            ("MAZE_RESPAWN_PENALTY_MS", "1500"),
            ("MAZE_NEXT_DELAY_MS", "2500"),
            ("MAZE_ROOM_SEED", "12345"),
        ]));

        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.room_capacity, 4);
        assert_eq!(config.max_rooms, 12);
        assert_eq!(config.maze_width, 41);
        assert_eq!(config.maze_height, 30);
        assert_eq!(config.race.max_race_ms, 60_000);
        assert_eq!(config.race.respawn_penalty_ms, 1_500);
        assert_eq!(config.race.total_mazes, 5);
        assert_eq!(config.next_maze_delay, Duration::from_millis(2_500));
        assert_eq!(config.room_seed, Some(12345));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("MAZE_BIND_ADDR", "nowhere"),
            ("MAZE_ROOM_CAPACITY", "-3"),
            ("MAZE_ROOM_SEED", "seed"),
        ]));

        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.room_capacity, 8);
        assert!(config.room_seed.is_none());
    }

    #[test]
    fn test_maze_dimensions_clamped() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("MAZE_WIDTH", "18446744073709551615"),
            ("MAZE_HEIGHT", "3"),
        ]));
        assert_eq!(config.maze_width, MAX_DIMENSION);
        assert_eq!(config.maze_height, MIN_DIMENSION);
    }
}
