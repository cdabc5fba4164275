//! # Maze Race Server
//!
//! Seeded maze generation and authoritative race sessions for Maze Race.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MAZE RACE SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded 32-bit LCG                         │
//! │  └── hash.rs     - Grid fingerprints                         │
//! │                                                              │
//! │  maze/           - Maze domain (deterministic)               │
//! │  ├── cell.rs     - Cell kinds, coordinates, positions        │
//! │  ├── grid.rs     - MazeGrid and its metadata                 │
//! │  ├── generator.rs- Seeded carving and embellishment          │
//! │  ├── hazards.rs  - Traps, teleporters, checkpoints           │
//! │  ├── pathfinder.rs- BFS solution path                        │
//! │  └── zones.rs    - Per-round activation registry             │
//! │                                                              │
//! │  race/           - Race lifecycle                            │
//! │  ├── session.rs  - Idle/Running/Finished state machine       │
//! │  ├── player.rs   - Player records                            │
//! │  ├── ticker.rs   - Scoped timer tasks                        │
//! │  └── clock.rs    - Wall clock                                │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server, room tasks              │
//! │  ├── room.rs     - Room coordinator                          │
//! │  ├── protocol.rs - Message types                             │
//! │  └── config.rs   - Server configuration                      │
//! │                                                              │
//! │  client/         - Client mirror                             │
//! │  ├── race.rs     - Client race context                       │
//! │  ├── connection.rs- WebSocket client                         │
//! │  └── persist.rs  - Reload persistence                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/` and `maze/` draw every random choice from one seeded stream.
//! Given identical `(width, height, variant, seed)`, generation produces
//! **identical grids** on every peer, so the server only broadcasts the
//! seed and clients rebuild the maze locally.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod maze;
pub mod race;
pub mod network;
pub mod client;

// Re-export commonly used types
pub use crate::core::rng::SeededRng;
pub use maze::{generate, find_path, Cell, GridCoord, MazeGrid, MazeData, Position};
pub use race::{RaceConfig, RacePhase, RaceSession, Ranking};
pub use network::{GameServer, ServerConfig};
pub use client::ClientRace;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
