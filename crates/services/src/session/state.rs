use chrono::{DateTime, Utc};

use case_core::model::{OptionId, ProgressEntry, Step};

/// Lifecycle of a case session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Ready,
    Completed,
    /// Load failed; the message is shown in place of any step.
    Failed(String),
}

/// Interaction state of the current step. Rebuilt on every step entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInteraction {
    pub selected: Option<OptionId>,
    pub feedback: Option<String>,
    pub correct: Option<bool>,
    pub attempt: u32,
    /// A hint was shown during the current attempt; gates further fetches.
    pub hint_shown: bool,
    /// A hint was shown at any point since entering the step; reported to
    /// the authority with each submission.
    pub hint_used: bool,
    pub hint_open: bool,
    pub hint: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl StepInteraction {
    pub(crate) fn fresh(started_at: DateTime<Utc>) -> Self {
        Self {
            selected: None,
            feedback: None,
            correct: None,
            attempt: 1,
            hint_shown: false,
            hint_used: false,
            hint_open: false,
            hint: None,
            started_at,
        }
    }

    /// Re-apply an answer the authority recorded earlier, verbatim.
    pub(crate) fn hydrate(&mut self, step: &Step, saved: &ProgressEntry) {
        self.selected.clone_from(&saved.selected_option);
        self.correct = saved.is_correct;
        self.feedback = saved
            .selected_option
            .as_ref()
            .and_then(|id| step.option(id))
            .and_then(|option| option.feedback())
            .map(str::to_string);
    }

    /// Back to unanswered for another attempt.
    pub(crate) fn next_attempt(&mut self, started_at: DateTime<Utc>) {
        self.selected = None;
        self.feedback = None;
        self.correct = None;
        self.attempt = self.attempt.saturating_add(1);
        self.hint_shown = false;
        self.hint_open = false;
        self.hint = None;
        self.started_at = started_at;
    }
}
