//! Client side of a race.
//!
//! A context object that mirrors the room's race state, regenerates mazes
//! from broadcast seeds and resolves local movement against the activation
//! registry, plus the WebSocket connection and reload persistence around it.

pub mod connection;
pub mod persist;
pub mod race;

pub use connection::{ConnectionError, ServerConnection};
pub use persist::{PersistError, PersistedState, StateStore};
pub use race::{ClientEvent, ClientRace, RemotePlayer, StepOutcome};
