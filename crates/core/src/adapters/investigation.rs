use serde::Deserialize;

use super::parse_content;
use crate::error::CaseError;
use crate::model::Step;

const UNLABELLED_GROUP: &str = "Results";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InvestigationContent {
    #[serde(alias = "investigations", alias = "results")]
    tests: Vec<TestResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TestResult {
    #[serde(alias = "test")]
    name: String,
    result: String,
    #[serde(alias = "group", alias = "category")]
    label: Option<String>,
    #[serde(alias = "reference")]
    normal_range: Option<String>,
}

/// Visual marker derived from the result text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultMarker {
    Positive,
    Negative,
    Neutral,
}

impl ResultMarker {
    /// Case-insensitive substring match on the result text.
    #[must_use]
    pub fn classify(result: &str) -> Self {
        let lowered = result.to_lowercase();
        if lowered.contains("positive") {
            Self::Positive
        } else if lowered.contains("negative") {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Positive => "(+)",
            Self::Negative => "(-)",
            Self::Neutral => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestigationRow {
    pub name: String,
    pub result: String,
    pub normal_range: Option<String>,
    pub marker: ResultMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestigationGroup {
    pub label: String,
    pub rows: Vec<InvestigationRow>,
}

/// Test results grouped by label, groups in order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InvestigationView {
    pub groups: Vec<InvestigationGroup>,
}

impl InvestigationView {
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for group in &self.groups {
            lines.push(format!("[{}]", group.label));
            for row in &group.rows {
                let mut line = format!("  {}: {}", row.name, row.result);
                if let Some(range) = &row.normal_range {
                    line.push_str(&format!(" (ref {range})"));
                }
                let symbol = row.marker.symbol();
                if !symbol.is_empty() {
                    line.push(' ');
                    line.push_str(symbol);
                }
                lines.push(line);
            }
        }
        lines
    }
}

/// Format an investigation step.
///
/// # Errors
///
/// Returns `CaseError::InvalidContent` if the payload has the wrong shape.
pub fn investigation(step: &Step) -> Result<InvestigationView, CaseError> {
    let content: InvestigationContent = parse_content(step)?;
    let mut groups: Vec<InvestigationGroup> = Vec::new();

    for test in content.tests {
        let label = test
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| UNLABELLED_GROUP.to_string());
        let row = InvestigationRow {
            marker: ResultMarker::classify(&test.result),
            name: test.name,
            result: test.result,
            normal_range: test.normal_range,
        };
        match groups.iter_mut().find(|g| g.label == label) {
            Some(group) => group.rows.push(row),
            None => groups.push(InvestigationGroup {
                label,
                rows: vec![row],
            }),
        }
    }

    Ok(InvestigationView { groups })
}
