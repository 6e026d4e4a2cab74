use std::collections::HashMap;

use crate::error::CaseError;
use crate::model::ids::{CaseId, OptionId, StepId};
use crate::model::step::Step;

/// Answer previously recorded by the authority for one step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressEntry {
    pub selected_option: Option<OptionId>,
    pub is_correct: Option<bool>,
}

/// A loaded case: an ordered, immutable sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    id: CaseId,
    title: String,
    is_completed: bool,
    steps: Vec<Step>,
    progress: HashMap<StepId, ProgressEntry>,
}

impl Case {
    /// Build a case from its steps.
    ///
    /// # Errors
    ///
    /// Returns `CaseError::NoSteps` if `steps` is empty.
    pub fn new(
        id: impl Into<CaseId>,
        title: impl Into<String>,
        steps: Vec<Step>,
    ) -> Result<Self, CaseError> {
        if steps.is_empty() {
            return Err(CaseError::NoSteps);
        }
        Ok(Self {
            id: id.into(),
            title: title.into(),
            is_completed: false,
            steps,
            progress: HashMap::new(),
        })
    }

    /// Marks the case as already completed (review mode).
    #[must_use]
    pub fn completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: HashMap<StepId, ProgressEntry>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn id(&self) -> &CaseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// # Errors
    ///
    /// Returns `CaseError::StepOutOfRange` for an index past the last step.
    pub fn step(&self, index: usize) -> Result<&Step, CaseError> {
        self.steps.get(index).ok_or(CaseError::StepOutOfRange {
            index,
            len: self.steps.len(),
        })
    }

    #[must_use]
    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.steps.len()
    }

    #[must_use]
    pub fn progress_for(&self, step: &StepId) -> Option<&ProgressEntry> {
        self.progress.get(step)
    }
}
