mod controller;
mod ticker;

// Public API of the test session subsystem.
pub use crate::error::SessionError;
pub use controller::{CallOutcome, PendingGenerate, PendingSubmit, TestSessionController};
pub use ticker::ElapsedTicker;
