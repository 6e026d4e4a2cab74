use crate::model::FinalSummary;

/// Seconds as `m:ss`, for the time-on-step readout.
#[must_use]
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[must_use]
pub fn summary_lines(summary: &FinalSummary) -> Vec<String> {
    vec![
        format!("Case score: {}", summary.score),
        format!("Cases completed: {}", summary.cases_completed),
        format!("Total score: {}", summary.total_score),
    ]
}
