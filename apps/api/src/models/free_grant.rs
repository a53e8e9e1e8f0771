use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One-shot free-roast grant. Existence of the row is the gate; there is
/// no counter to reset.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FreeGrant {
    pub email: String,
    pub used_at: DateTime<Utc>,
    pub result_id: Option<String>,
}
