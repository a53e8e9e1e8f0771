use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A provider-confirmed checkout session, redeemable for one funded
/// analysis. `used` flips true exactly once and never back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentSession {
    pub session_id: String,
    pub used: bool,
    /// Amount in the provider's minor units (cents).
    pub amount: Option<i64>,
    pub created_at: DateTime<Utc>,
}
