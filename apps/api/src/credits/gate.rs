//! Credit authorization gate — the one place paywall policy lives.
//!
//! Decision order is fixed: a supplied payment-session token is validated
//! exclusively (credit balances are ignored); otherwise a guest falls to
//! the free-tier ledger; otherwise the account credit balance decides.
//! The ordering matters: a guest who later authenticates must not re-claim
//! a free grant under a fresh account, which is why both ledgers key off
//! the same normalized email.
//!
//! `authorize` is provisional — it checks but debits nothing. The caller
//! runs the expensive analysis, persists the result, and only then calls
//! `commit`, so a failed analysis never costs the user anything. The price
//! of that ordering is a small race: a balance observed positive can be
//! drained by a concurrent request before commit. The conditional updates
//! make the loss explicit and we absorb it (an extra free use), never the
//! inverse.

use std::fmt;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, warn};

use crate::credits::{entitlements, free_tier, payments};
use crate::errors::AppError;
use crate::identity::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    NoCreditsRemaining,
    InvalidOrExpiredSession,
    FreeGrantAlreadyUsed,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NoCreditsRemaining => "no_credits_remaining",
            DenialReason::InvalidOrExpiredSession => "invalid_or_expired_session",
            DenialReason::FreeGrantAlreadyUsed => "free_grant_already_used",
        }
    }

    /// User-facing paywall copy.
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::NoCreditsRemaining => "No roasts remaining. Please upgrade to continue.",
            DenialReason::InvalidOrExpiredSession => {
                "This payment session is invalid or has already been used."
            }
            DenialReason::FreeGrantAlreadyUsed => "Your free roast has already been used.",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The gate's verdict for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Funded by the account credit balance. `remaining` is the balance
    /// observed at check time; the debit lands at commit.
    Credit { remaining: i32 },
    /// Funded by a confirmed one-time payment session.
    Payment { session_id: String },
    /// Funded by the guest's one-shot free grant.
    FreeGrant,
    Denied { reason: DenialReason },
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Authorization::Denied { .. })
    }

    /// Funding label recorded on the persisted result.
    pub fn funding(&self) -> &'static str {
        match self {
            Authorization::Credit { .. } => "credit",
            Authorization::Payment { .. } => "paid",
            Authorization::FreeGrant => "free",
            Authorization::Denied { .. } => "denied",
        }
    }
}

/// Provisional authorization: consults exactly one ledger per the fixed
/// decision order and reports ALLOW/DENY without debiting anything.
pub async fn authorize(
    pool: &PgPool,
    principal: &Principal,
    session_token: Option<&str>,
) -> Result<Authorization, AppError> {
    if let Some(token) = session_token {
        return Ok(if payments::is_valid(pool, token).await? {
            Authorization::Payment {
                session_id: token.to_string(),
            }
        } else {
            Authorization::Denied {
                reason: DenialReason::InvalidOrExpiredSession,
            }
        });
    }

    if principal.is_guest() {
        let status = free_tier::check_email(pool, principal.email()).await?;
        return Ok(if status.exists {
            Authorization::Denied {
                reason: DenialReason::FreeGrantAlreadyUsed,
            }
        } else {
            Authorization::FreeGrant
        });
    }

    let Principal::Account { id, email } = principal else {
        unreachable!("guest handled above");
    };
    let account = entitlements::get_or_create(pool, email, Some(id.as_str())).await?;
    Ok(if account.roasts_remaining > 0 {
        Authorization::Credit {
            remaining: account.roasts_remaining,
        }
    } else {
        Authorization::Denied {
            reason: DenialReason::NoCreditsRemaining,
        }
    })
}

/// Commits the debit matching an earlier ALLOW, after the funded result
/// has been persisted under `result_id`. Returns the post-debit credit
/// balance when the funding source was the credit ledger.
pub async fn commit(
    pool: &PgPool,
    authorization: &Authorization,
    principal: &Principal,
    result_id: &str,
) -> Result<Option<i32>, AppError> {
    match authorization {
        Authorization::Credit { .. } => {
            let outcome = entitlements::consume(pool, principal.email()).await?;
            if !outcome.granted {
                // Balance drained between authorize and commit. The result
                // already shipped; absorb the free use rather than failing.
                warn!(
                    email = principal.email(),
                    result_id, "credit commit lost the race, balance already at zero"
                );
            }
            Ok(Some(outcome.remaining))
        }
        Authorization::FreeGrant => {
            let outcome = free_tier::mark_used(pool, principal.email(), Some(result_id)).await?;
            if outcome.already_used {
                warn!(
                    email = principal.email(),
                    result_id, "free grant commit lost the race, grant already recorded"
                );
            }
            Ok(None)
        }
        Authorization::Payment { session_id } => {
            if !payments::consume(pool, session_id).await? {
                warn!(
                    session_id = %session_id,
                    result_id, "payment session consumed concurrently, absorbing"
                );
            }
            Ok(None)
        }
        Authorization::Denied { reason } => {
            error!(reason = reason.as_str(), "commit called on a denied authorization");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_reason_wire_strings() {
        assert_eq!(
            DenialReason::NoCreditsRemaining.as_str(),
            "no_credits_remaining"
        );
        assert_eq!(
            DenialReason::InvalidOrExpiredSession.as_str(),
            "invalid_or_expired_session"
        );
        assert_eq!(
            DenialReason::FreeGrantAlreadyUsed.as_str(),
            "free_grant_already_used"
        );
    }

    #[test]
    fn test_denial_reason_serializes_as_snake_case() {
        let json = serde_json::to_string(&DenialReason::FreeGrantAlreadyUsed).unwrap();
        assert_eq!(json, r#""free_grant_already_used""#);
    }

    #[test]
    fn test_funding_labels() {
        assert_eq!(Authorization::Credit { remaining: 2 }.funding(), "credit");
        assert_eq!(
            Authorization::Payment {
                session_id: "cs_123".to_string()
            }
            .funding(),
            "paid"
        );
        assert_eq!(Authorization::FreeGrant.funding(), "free");
    }

    #[test]
    fn test_denied_is_not_allowed() {
        let denied = Authorization::Denied {
            reason: DenialReason::NoCreditsRemaining,
        };
        assert!(!denied.is_allowed());
        assert!(Authorization::FreeGrant.is_allowed());
        assert!(Authorization::Credit { remaining: 1 }.is_allowed());
    }

    #[test]
    fn test_paywall_copy_matches_reason() {
        assert!(DenialReason::NoCreditsRemaining
            .message()
            .contains("upgrade"));
        assert!(DenialReason::FreeGrantAlreadyUsed
            .message()
            .contains("free roast"));
    }
}
