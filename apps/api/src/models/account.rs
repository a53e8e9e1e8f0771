use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-principal roast-credit balance and usage history.
/// Keyed by normalized email; the identity-provider account id is an
/// attribute, not the key.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub email: String,
    pub account_id: Option<String>,
    pub roasts_remaining: i32,
    pub total_roasts: i32,
    pub plan: String,
    pub created_at: DateTime<Utc>,
    pub last_roast_at: Option<DateTime<Utc>>,
}

/// Purchasable plans. The balance row stores the lowercase string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Pro => "pro",
        }
    }

    /// Credits granted when a pack of this plan is purchased.
    pub fn roast_count(&self) -> i32 {
        match self {
            Plan::Starter => 10,
            Plan::Pro => 50,
        }
    }

    pub fn parse(s: &str) -> Option<Plan> {
        match s {
            "starter" => Some(Plan::Starter),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }
}
