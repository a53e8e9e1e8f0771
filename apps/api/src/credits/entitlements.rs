//! Entitlement store — per-principal roast-credit balances.
//!
//! Canonical key is the normalized email: it is the only identifier
//! present in both the guest and authenticated paths, so keying here and
//! in the free-tier ledger off the same string prevents double-granting
//! across the sign-up boundary. The identity-provider account id is
//! stored as an attribute.

use sqlx::PgPool;

use crate::identity::normalize_email;
use crate::models::account::Account;

/// Credits granted on first sight of a principal.
pub const FREE_ALLOTMENT: i32 = 3;

/// Outcome of a consume attempt. Denial is a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub granted: bool,
    pub remaining: i32,
}

/// Returns the entitlement record for `email`, creating it with the free
/// allotment if absent. The unique key on `email` makes concurrent first
/// requests converge on one row with one allotment.
pub async fn get_or_create(
    pool: &PgPool,
    email: &str,
    account_id: Option<&str>,
) -> Result<Account, sqlx::Error> {
    let email = normalize_email(email);

    sqlx::query(
        r#"
        INSERT INTO accounts (email, account_id, roasts_remaining, total_roasts, plan)
        VALUES ($1, $2, $3, 0, 'free')
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(&email)
    .bind(account_id)
    .bind(FREE_ALLOTMENT)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(&email)
        .fetch_one(pool)
        .await
}

/// Debits one roast. A single compare-and-decrement: two concurrent calls
/// against a balance of 1 cannot both observe it, and the balance never
/// goes negative. Consuming at zero is a denial with no mutation.
pub async fn consume(pool: &PgPool, email: &str) -> Result<ConsumeOutcome, sqlx::Error> {
    let email = normalize_email(email);

    let remaining: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE accounts
           SET roasts_remaining = roasts_remaining - 1,
               total_roasts = total_roasts + 1,
               last_roast_at = NOW()
         WHERE email = $1 AND roasts_remaining > 0
        RETURNING roasts_remaining
        "#,
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    Ok(match remaining {
        Some(remaining) => ConsumeOutcome {
            granted: true,
            remaining,
        },
        None => ConsumeOutcome {
            granted: false,
            remaining: 0,
        },
    })
}

/// Adds purchased credits and optionally upgrades the plan. Not idempotent
/// on its own: callers must invoke it at most once per purchase event (the
/// payment-session tracker's freshness signal is that guarantee).
pub async fn top_up(
    pool: &PgPool,
    email: &str,
    count: i32,
    plan: Option<&str>,
) -> Result<Account, sqlx::Error> {
    let email = normalize_email(email);

    sqlx::query_as::<_, Account>(
        r#"
        UPDATE accounts
           SET roasts_remaining = roasts_remaining + $2,
               plan = COALESCE($3, plan)
         WHERE email = $1
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(count)
    .bind(plan)
    .fetch_one(pool)
    .await
}
