//! Port to the remote case authority, the single durable record of answers
//! and scores.

mod http;
mod memory;
mod wire;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use case_core::model::{Case, CaseId, FinalSummary, OptionId, StepId};

use crate::error::AuthorityError;

pub use http::HttpCaseAuthority;
pub use memory::{RecordedSubmission, ScriptedAuthority};

/// Body of an answer submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub selected_option_id: OptionId,
    pub is_final_step: bool,
    /// Whole seconds since the learner entered the step (or last retried).
    pub time_spent: u64,
    pub hint_shown: bool,
    pub attempt_number: u32,
}

/// Cumulative learner statistics reported with a final answer.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LearnerStats {
    pub cases_completed: u32,
    pub total_score: f64,
}

/// The authority's ruling on a submitted answer.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerVerdict {
    pub correct: bool,
    #[serde(default, rename = "final", deserialize_with = "null_as_false")]
    pub is_final: bool,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub stats: Option<LearnerStats>,
}

impl AnswerVerdict {
    #[must_use]
    pub fn correct() -> Self {
        Self {
            correct: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn incorrect(feedback: Option<&str>) -> Self {
        Self {
            correct: false,
            feedback: feedback.map(str::to_string),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn finished(score: f64, stats: LearnerStats) -> Self {
        Self {
            correct: true,
            is_final: true,
            score: Some(score),
            stats: Some(stats),
            ..Self::default()
        }
    }

    /// Summary for a final verdict; missing figures default to zero.
    #[must_use]
    pub fn summary(&self) -> FinalSummary {
        let stats = self.stats.clone().unwrap_or_default();
        FinalSummary {
            score: self.score.unwrap_or_default(),
            cases_completed: stats.cases_completed,
            total_score: stats.total_score,
        }
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

/// Remote source of truth for cases, answers and hints.
#[async_trait]
pub trait CaseAuthority: Send + Sync {
    /// Fetch a case together with any prior progress.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError` on transport, status or decoding failures.
    async fn fetch_case(&self, case_id: &CaseId) -> Result<Case, AuthorityError>;

    /// Submit an answer and receive the authority's verdict.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError` on transport, status or validation failures.
    async fn submit_answer(
        &self,
        case_id: &CaseId,
        step_id: &StepId,
        submission: &AnswerSubmission,
    ) -> Result<AnswerVerdict, AuthorityError>;

    /// Fetch a contextual hint for a step. `Ok(None)` means no hint exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthorityError` on transport or status failures.
    async fn fetch_hint(&self, step_id: &StepId) -> Result<Option<String>, AuthorityError>;
}
