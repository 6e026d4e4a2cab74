use serde::Deserialize;

use super::parse_content;
use crate::error::CaseError;
use crate::model::{OptionId, Step};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct McqContent {
    #[serde(alias = "prompt", alias = "text")]
    question: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionLine {
    pub id: OptionId,
    pub label: String,
    pub selected: bool,
    /// Correctness of this option, known only once it has been submitted.
    pub verdict: Option<bool>,
}

/// Decision point with the current selection marked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct McqView {
    pub question: Option<String>,
    pub options: Vec<OptionLine>,
}

impl McqView {
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.question.iter().cloned().collect();
        for option in &self.options {
            let mark = match (option.selected, option.verdict) {
                (true, Some(true)) => "[✓]",
                (true, Some(false)) => "[✗]",
                (true, None) => "[*]",
                (false, _) => "[ ]",
            };
            lines.push(format!("{mark} {}) {}", option.id, option.label));
        }
        lines
    }
}

/// Format a multiple-choice step given the current selection and its outcome.
///
/// # Errors
///
/// Returns `CaseError::InvalidContent` if the payload has the wrong shape.
pub fn mcq(
    step: &Step,
    selected: Option<&OptionId>,
    correct: Option<bool>,
) -> Result<McqView, CaseError> {
    let content: McqContent = parse_content(step)?;
    let options = step
        .options()
        .iter()
        .map(|option| {
            let is_selected = selected == Some(option.id());
            OptionLine {
                id: option.id().clone(),
                label: option.label().to_string(),
                selected: is_selected,
                verdict: if is_selected { correct } else { None },
            }
        })
        .collect();
    Ok(McqView {
        question: content.question.or_else(|| step.title().map(str::to_string)),
        options,
    })
}
