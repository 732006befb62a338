use serde::{Deserialize, Serialize};

use super::aggregate::AggregatedCandidate;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CommunityParams {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub records: Vec<AggregatedCandidate>,
    pub page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    /// Set when a source failed and the result is degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}
