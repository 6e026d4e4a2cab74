mod controller;
mod state;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{Advance, CaseSession, IdleSignal, IdleSignals, SubmitOutcome};
pub use state::{SessionPhase, StepInteraction};
pub use view::SessionView;
