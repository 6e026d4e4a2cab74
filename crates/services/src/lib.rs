#![forbid(unsafe_code)]

pub mod authority;
pub mod config;
pub mod error;
pub mod session;
pub mod watchdog;

pub use case_core::Clock;

pub use authority::{
    AnswerSubmission, AnswerVerdict, CaseAuthority, HttpCaseAuthority, LearnerStats,
    RecordedSubmission, ScriptedAuthority,
};
pub use config::{AuthorityConfig, IdlePolicy};
pub use error::{AuthorityError, SessionError};
pub use session::{
    Advance, CaseSession, IdleSignal, IdleSignals, SessionPhase, SessionView, StepInteraction,
    SubmitOutcome,
};
pub use watchdog::{ActivityWatchdog, IdleCallback};
