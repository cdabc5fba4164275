//! Race lifecycle.
//!
//! The per-room state machine, player bookkeeping, and the timing pieces
//! (clock and scoped ticker) it runs on.

pub mod clock;
pub mod ticker;
pub mod session;
pub mod player;

pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use ticker::TickGuard;
pub use session::{RaceConfig, RacePhase, RaceResult, RaceSession, Ranking, TickOutcome};
pub use player::{PlayerId, PlayerRecord};
