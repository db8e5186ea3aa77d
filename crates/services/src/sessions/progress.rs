use serde::Serialize;

/// Aggregated view of session progress, useful for a host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub completion_rate: u32,
    pub is_complete: bool,
}
