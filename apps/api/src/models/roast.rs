use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted analysis result. Write-once: rows are never mutated after
/// insert, and the short `result_id` is the shareable handle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoastResult {
    pub result_id: String,
    pub grade: String,
    pub headline: String,
    pub rejection: String,
    pub skill_gaps: Vec<String>,
    pub hiring_manager_quote: String,
    pub improvements: Vec<String>,
    pub ats_score: Option<i32>,
    /// Extended analysis fields (recruiter notes, heatmap, priorities,
    /// competition, bullet rewrite) as one document.
    pub details: serde_json::Value,
    pub is_paid: bool,
    pub is_free_roast: bool,
    pub email: Option<String>,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
