//! Controller module - playback and session logic
//!
//! - `queue`: the play queue and everything that moves through it
//! - `session`: login/logout with completion waits and display feedback
//! - `session_events`: session event listener
//! - `barrier`: resettable signal the session waits are built on

mod barrier;
mod queue;
mod session;
mod session_events;

pub use queue::QueueController;
pub use session::SessionCoordinator;
