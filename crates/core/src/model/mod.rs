mod case;
mod ids;
mod step;
mod summary;

pub use case::{Case, ProgressEntry};
pub use ids::{CaseId, OptionId, StepId};
pub use step::{Step, StepKind, StepOption, TimeoutOverride};
pub use summary::FinalSummary;
