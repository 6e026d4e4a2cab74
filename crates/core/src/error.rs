use thiserror::Error;

use crate::model::StepId;

/// Errors raised while building or reading a case.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CaseError {
    #[error("case has no steps")]
    NoSteps,

    #[error("step index {index} is out of range for {len} steps")]
    StepOutOfRange { index: usize, len: usize },

    #[error("step {step} has malformed content: {source}")]
    InvalidContent {
        step: StepId,
        #[source]
        source: serde_json::Error,
    },
}
