use case_core::model::{FinalSummary, OptionId, StepKind};

use super::state::SessionPhase;

/// Presentation-agnostic snapshot of a session.
///
/// Read-only: nothing here feeds back into gating.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub title: Option<String>,
    pub review_mode: bool,
    pub step_index: usize,
    pub step_count: usize,
    pub step_kind: Option<StepKind>,
    pub progress_percent: u8,
    pub selected: Option<OptionId>,
    pub feedback: Option<String>,
    pub correct: Option<bool>,
    pub attempt: u32,
    pub hint: Option<String>,
    pub hint_open: bool,
    pub can_advance: bool,
    pub can_go_back: bool,
    pub can_retry: bool,
    pub elapsed_seconds: u64,
    pub summary: Option<FinalSummary>,
}
