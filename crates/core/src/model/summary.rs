/// Result of finishing a case, as reported by the authority.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalSummary {
    pub score: f64,
    pub cases_completed: u32,
    pub total_score: f64,
}
