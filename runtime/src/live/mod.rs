//! Live interaction with the account: session setup and step attempts.

pub mod act;
pub mod catalog;
pub mod session;

pub use act::{attempt, locate, preview_control, AttemptOutcome, AttemptRecord, StepPhase};
pub use catalog::{action_spec, candidates, ActionSpec, ControlCandidate};
pub use session::{login, open_overview, read_account};
