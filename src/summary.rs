use serde::{Deserialize, Serialize};

pub const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Success,
    Failure,
}

/// Outcome of one baseline or scan run, kept on the site as `last_result`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanSummary {
    pub outcome: ScanOutcome,
    pub parsed_count: usize,
    pub new_or_inserted_count: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub sample_urls: Vec<String>,
}

impl ScanSummary {
    pub fn success<I, S>(
        parsed_count: usize,
        new_or_inserted_count: usize,
        duration_ms: u64,
        sample: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outcome: ScanOutcome::Success,
            parsed_count,
            new_or_inserted_count,
            duration_ms,
            error: None,
            sample_urls: sample.into_iter().take(SAMPLE_LIMIT).map(Into::into).collect(),
        }
    }

    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            outcome: ScanOutcome::Failure,
            parsed_count: 0,
            new_or_inserted_count: 0,
            duration_ms,
            error: Some(error.into()),
            sample_urls: Vec::new(),
        }
    }
}
