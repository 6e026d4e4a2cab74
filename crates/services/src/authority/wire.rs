use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use case_core::CaseError;
use case_core::model::{
    Case, CaseId, OptionId, ProgressEntry, Step, StepId, StepKind, StepOption, TimeoutOverride,
};

/// Persisted shape of a case as served by `GET /cases/{id}`.
///
/// Kept separate from the domain `Case` so wire quirks (nullable fields,
/// inline step payloads) stay out of the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaseRecord {
    id: CaseId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    is_completed: Option<bool>,
    #[serde(default)]
    steps: Vec<StepRecord>,
    #[serde(default)]
    user_progress: Option<HashMap<StepId, ProgressRecord>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepRecord {
    id: StepId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    options: Option<Vec<OptionRecord>>,
    #[serde(default)]
    idle_timeout: Option<TimeoutOverride>,
    #[serde(default)]
    hint_enabled: Option<bool>,
    /// Either a nested `content` object or the remaining step fields.
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionRecord {
    id: OptionId,
    #[serde(alias = "text")]
    label: String,
    #[serde(default)]
    feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecord {
    #[serde(default)]
    selected_option_id: Option<OptionId>,
    #[serde(default)]
    is_correct: Option<bool>,
}

/// Body of `GET /steps/{id}/hint`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct HintRecord {
    #[serde(default)]
    pub hint: Option<String>,
}

impl HintRecord {
    pub(crate) fn into_hint(self) -> Option<String> {
        self.hint.filter(|h| !h.trim().is_empty())
    }
}

impl StepRecord {
    fn into_step(mut self) -> Step {
        let content = match self.rest.remove("content") {
            Some(content) => content,
            None if self.rest.is_empty() => Value::Null,
            None => Value::Object(self.rest),
        };
        let options = self
            .options
            .unwrap_or_default()
            .into_iter()
            .map(|record| {
                let option = StepOption::new(record.id, record.label);
                match record.feedback.filter(|f| !f.trim().is_empty()) {
                    Some(feedback) => option.with_feedback(feedback),
                    None => option,
                }
            })
            .collect();

        let mut step = Step::new(self.id, StepKind::from_tag(&self.kind), content)
            .with_options(options)
            .with_idle_timeout(self.idle_timeout)
            .with_hint_eligible(self.hint_enabled != Some(false));
        if let Some(title) = self.title {
            step = step.with_title(title);
        }
        step
    }
}

impl CaseRecord {
    /// Convert the record into a domain `Case`.
    ///
    /// # Errors
    ///
    /// Returns `CaseError::NoSteps` when the case has no steps.
    pub(crate) fn into_case(self) -> Result<Case, CaseError> {
        let steps = self.steps.into_iter().map(StepRecord::into_step).collect();
        let progress = self
            .user_progress
            .unwrap_or_default()
            .into_iter()
            .map(|(step_id, record)| {
                (
                    step_id,
                    ProgressEntry {
                        selected_option: record.selected_option_id,
                        is_correct: record.is_correct,
                    },
                )
            })
            .collect();

        Ok(Case::new(self.id, self.title.unwrap_or_default(), steps)?
            .completed(self.is_completed.unwrap_or(false))
            .with_progress(progress))
    }
}
