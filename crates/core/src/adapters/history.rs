use serde::Deserialize;

use super::parse_content;
use crate::error::CaseError;
use crate::model::Step;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HistoryContent {
    #[serde(alias = "prompt")]
    intro: Option<String>,
    #[serde(alias = "items")]
    questions: Vec<QaPair>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QaPair {
    question: String,
    answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaEntry {
    pub number: usize,
    pub question: String,
    pub answer: String,
}

/// History-taking transcript, in authored order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryView {
    pub intro: Option<String>,
    pub entries: Vec<QaEntry>,
}

impl HistoryView {
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.intro.iter().cloned().collect();
        for entry in &self.entries {
            lines.push(format!("Q{}. {}", entry.number, entry.question));
            lines.push(format!("    {}", entry.answer));
        }
        lines
    }
}

/// Format a history step's question/answer list.
///
/// # Errors
///
/// Returns `CaseError::InvalidContent` if the payload has the wrong shape.
pub fn history(step: &Step) -> Result<HistoryView, CaseError> {
    let content: HistoryContent = parse_content(step)?;
    let entries = content
        .questions
        .into_iter()
        .filter(|qa| !qa.question.trim().is_empty())
        .enumerate()
        .map(|(i, qa)| QaEntry {
            number: i + 1,
            question: qa.question.trim().to_string(),
            answer: qa.answer.trim().to_string(),
        })
        .collect();
    Ok(HistoryView {
        intro: content.intro,
        entries,
    })
}
