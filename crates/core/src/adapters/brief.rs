use serde::Deserialize;
use serde_json::{Map, Value};

use super::{humanize_key, parse_content, to_embeddable, value_text};
use crate::error::CaseError;
use crate::model::Step;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InfoContent {
    title: Option<String>,
    #[serde(alias = "description", alias = "body")]
    text: Option<String>,
    patient: Map<String, Value>,
    vitals: Map<String, Value>,
    #[serde(alias = "videoUrl", alias = "mediaUrl")]
    media: Option<String>,
}

/// Patient brief ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BriefView {
    pub title: Option<String>,
    pub narrative: Option<String>,
    pub patient: Vec<(String, String)>,
    pub vitals: Vec<(String, String)>,
    pub media_url: Option<String>,
}

impl BriefView {
    /// Plain-text rendering, one line per entry.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(title) = &self.title {
            lines.push(title.clone());
        }
        if let Some(narrative) = &self.narrative {
            lines.push(narrative.clone());
        }
        for (label, value) in self.patient.iter().chain(&self.vitals) {
            lines.push(format!("{label}: {value}"));
        }
        if let Some(url) = &self.media_url {
            lines.push(format!("Media: {url}"));
        }
        lines
    }
}

fn labelled(fields: &Map<String, Value>) -> Vec<(String, String)> {
    fields
        .iter()
        .filter_map(|(key, value)| value_text(value).map(|text| (humanize_key(key), text)))
        .collect()
}

/// Format an informational step as a patient brief.
///
/// # Errors
///
/// Returns `CaseError::InvalidContent` if the payload has the wrong shape.
pub fn brief(step: &Step) -> Result<BriefView, CaseError> {
    let content: InfoContent = parse_content(step)?;
    Ok(BriefView {
        title: content.title.or_else(|| step.title().map(str::to_string)),
        narrative: content.text.filter(|t| !t.trim().is_empty()),
        patient: labelled(&content.patient),
        vitals: labelled(&content.vitals),
        media_url: to_embeddable(content.media.as_deref()),
    })
}
