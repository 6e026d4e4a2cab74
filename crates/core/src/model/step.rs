use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::model::ids::{OptionId, StepId};

//
// ─── STEP KIND ─────────────────────────────────────────────────────────────────
//

/// Type tag of a step. Unknown tags are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StepKind {
    Info,
    History,
    Mcq,
    Investigation,
    Diagnosis,
    Treatment,
    Other(String),
}

impl StepKind {
    /// Parses a wire tag, case-insensitively.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "info" => Self::Info,
            "history" => Self::History,
            "mcq" => Self::Mcq,
            "investigation" => Self::Investigation,
            "diagnosis" => Self::Diagnosis,
            "treatment" => Self::Treatment,
            _ => Self::Other(normalized),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::History => "history",
            Self::Mcq => "mcq",
            Self::Investigation => "investigation",
            Self::Diagnosis => "diagnosis",
            Self::Treatment => "treatment",
            Self::Other(tag) => tag,
        }
    }

    /// Only decision points gate advancement on a correct answer.
    #[must_use]
    pub fn is_gated(&self) -> bool {
        matches!(self, Self::Mcq)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── IDLE TIMEOUT OVERRIDE ─────────────────────────────────────────────────────
//

/// Per-step inactivity override, in seconds, exactly as authored.
///
/// Authors may write a number or a string; anything that does not parse as
/// a positive finite number is ignored in favour of the type default. Any
/// other JSON shape lands in `Other` so one bad field never rejects a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutOverride {
    Seconds(f64),
    Text(String),
    Other(Value),
}

impl TimeoutOverride {
    /// The override in seconds, if it is usable.
    #[must_use]
    pub fn seconds(&self) -> Option<f64> {
        let value = match self {
            Self::Seconds(secs) => *secs,
            Self::Text(raw) => raw.trim().parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        (value.is_finite() && value > 0.0).then_some(value)
    }
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// One answer choice of a multiple-choice step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOption {
    id: OptionId,
    label: String,
    feedback: Option<String>,
}

impl StepOption {
    #[must_use]
    pub fn new(id: impl Into<OptionId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            feedback: None,
        }
    }

    /// Static feedback shown when the authority sends none.
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &OptionId {
        &self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }
}

//
// ─── STEP ──────────────────────────────────────────────────────────────────────
//

/// A single stage of a case. Immutable once the case is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    id: StepId,
    kind: StepKind,
    title: Option<String>,
    content: Value,
    options: Vec<StepOption>,
    idle_timeout: Option<TimeoutOverride>,
    hint_eligible: bool,
}

impl Step {
    #[must_use]
    pub fn new(id: impl Into<StepId>, kind: StepKind, content: Value) -> Self {
        Self {
            id: id.into(),
            kind,
            title: None,
            content,
            options: Vec::new(),
            idle_timeout: None,
            hint_eligible: true,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<StepOption>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<TimeoutOverride>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_hint_eligible(mut self, eligible: bool) -> Self {
        self.hint_eligible = eligible;
        self
    }

    #[must_use]
    pub fn id(&self) -> &StepId {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Type-specific payload, interpreted by the content adapters.
    #[must_use]
    pub fn content(&self) -> &Value {
        &self.content
    }

    #[must_use]
    pub fn options(&self) -> &[StepOption] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&StepOption> {
        self.options.iter().find(|option| option.id() == id)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<&TimeoutOverride> {
        self.idle_timeout.as_ref()
    }

    #[must_use]
    pub fn hint_eligible(&self) -> bool {
        self.hint_eligible
    }
}
