//! Per-user history, usage statistics and feedback.

use serde::{Deserialize, Serialize};

use super::query::QuerySource;
use super::user::User;

/// Paging for list endpoints. Unset fields are left to the server default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Page {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

/// Window for the usage chart and analytics endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

/// A question the user asked earlier, with the stored answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserQuery {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub short_conclusion: Option<String>,
    #[serde(default)]
    pub detailed_reasoning: Option<String>,
    #[serde(default)]
    pub sources: Vec<QuerySource>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub response_time_ms: Option<u64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct UserStats {
    pub total_queries: u64,
    pub queries_today: u64,
    pub queries_this_month: u64,
    pub avg_confidence: f64,
    pub avg_response_time_ms: f64,
    pub most_used_category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ChatSessionResponse {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Rating for an answered question.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FeedbackRequest {
    pub query_id: String,
    /// 1 to 5
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub is_helpful: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default)]
pub struct UsageSummary {
    pub daily_queries_used: u32,
    pub daily_queries_remaining: u32,
    pub monthly_queries_used: u32,
    pub monthly_queries_remaining: u32,
    pub success_rate: f64,
    pub most_used_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Dashboard {
    pub user: User,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub recent_queries: Vec<UserQuery>,
    #[serde(default)]
    pub usage_summary: UsageSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UsagePoint {
    pub date: String,
    pub queries: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UsageChart {
    #[serde(default)]
    pub chart_data: Vec<UsagePoint>,
}

impl UsageChart {
    pub fn total_queries(&self) -> u64 {
        self.chart_data.iter().map(|point| u64::from(point.queries)).sum()
    }
}
