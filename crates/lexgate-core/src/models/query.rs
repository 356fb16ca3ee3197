//! Question/answer types for the retrieval endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RagQueryRequest {
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Law,
    Decision,
}

/// A statute article or court decision cited by an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct QuerySource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub title: String,
    pub anchor: String,
    pub excerpt: String,
    pub score: f64,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub court_id: Option<i32>,
    #[serde(default)]
    pub law_article: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SourceCounts {
    pub law: u32,
    pub decision: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RagQueryResponse {
    pub short_conclusion: String,
    pub detailed_reasoning: String,
    #[serde(default)]
    pub sources: Vec<QuerySource>,
    pub confidence: f64,
    pub response_time_ms: u64,
    pub query_id: String,
    #[serde(default)]
    pub sources_by_type: SourceCounts,
    #[serde(default)]
    pub avg_score: f64,
}
