//! Presentation formatting for each step kind.
//!
//! Everything here is a pure function of a `Step` (plus, for decision
//! points, the current selection). Nothing holds state and nothing talks to
//! the authority.

mod brief;
mod history;
mod investigation;
mod mcq;
mod media;
mod summary;

pub use brief::{BriefView, brief};
pub use history::{HistoryView, QaEntry, history};
pub use investigation::{
    InvestigationGroup, InvestigationRow, InvestigationView, ResultMarker, investigation,
};
pub use mcq::{McqView, OptionLine, mcq};
pub use media::to_embeddable;
pub use summary::{format_clock, summary_lines};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CaseError;
use crate::model::Step;

/// Decode a step's payload, treating a missing payload as empty.
fn parse_content<T: DeserializeOwned + Default>(step: &Step) -> Result<T, CaseError> {
    if step.content().is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(step.content().clone()).map_err(|source| CaseError::InvalidContent {
        step: step.id().clone(),
        source,
    })
}

/// Render a scalar JSON value as display text.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => Some(other.to_string()),
    }
}

/// `presentingComplaint` / `blood_pressure` -> `Presenting complaint` / `Blood pressure`.
fn humanize_key(key: &str) -> String {
    let mut words = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' || ch == '-' {
            words.push(' ');
        } else if ch.is_uppercase() && i > 0 {
            words.push(' ');
            words.extend(ch.to_lowercase());
        } else {
            words.push(ch);
        }
    }
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn humanize_splits_camel_and_snake_case() {
        assert_eq!(humanize_key("presentingComplaint"), "Presenting complaint");
        assert_eq!(humanize_key("blood_pressure"), "Blood pressure");
        assert_eq!(humanize_key("age"), "Age");
        assert_eq!(humanize_key(""), "");
    }

    #[test]
    fn value_text_flattens_scalars_and_lists() {
        assert_eq!(value_text(&json!(54)), Some("54".into()));
        assert_eq!(value_text(&json!("  ")), None);
        assert_eq!(value_text(&json!(["cough", "fever"])), Some("cough, fever".into()));
        assert_eq!(value_text(&Value::Null), None);
    }
}
