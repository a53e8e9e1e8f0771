//! Free-tier ledger — one roast per email, ever.
//!
//! Existence of the row is the gate. Marking twice is not an error: the
//! replay may attach a newer result id, but `used_at` is immutable and no
//! second grant is possible.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::identity::normalize_email;
use crate::models::free_grant::FreeGrant;

#[derive(Debug, Clone, Serialize)]
pub struct FreeGrantStatus {
    pub exists: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub result_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkOutcome {
    pub already_used: bool,
}

pub async fn check_email(pool: &PgPool, email: &str) -> Result<FreeGrantStatus, sqlx::Error> {
    let email = normalize_email(email);

    let grant = sqlx::query_as::<_, FreeGrant>("SELECT * FROM free_roasts WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;

    Ok(match grant {
        Some(grant) => FreeGrantStatus {
            exists: true,
            used_at: Some(grant.used_at),
            result_id: grant.result_id,
        },
        None => FreeGrantStatus {
            exists: false,
            used_at: None,
            result_id: None,
        },
    })
}

/// Records the one-shot grant. Concurrent calls for the same email resolve
/// to at most one fresh grant; the key conflict is the enforcement.
pub async fn mark_used(
    pool: &PgPool,
    email: &str,
    result_id: Option<&str>,
) -> Result<MarkOutcome, sqlx::Error> {
    let email = normalize_email(email);

    let inserted = sqlx::query(
        r#"
        INSERT INTO free_roasts (email, result_id)
        VALUES ($1, $2)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(&email)
    .bind(result_id)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted == 1 {
        return Ok(MarkOutcome {
            already_used: false,
        });
    }

    // Replay: attach the most recent result id, leave used_at alone.
    if let Some(result_id) = result_id {
        sqlx::query("UPDATE free_roasts SET result_id = $2 WHERE email = $1")
            .bind(&email)
            .bind(result_id)
            .execute(pool)
            .await?;
    }

    Ok(MarkOutcome { already_used: true })
}
