//! Payment session tracker — each provider-confirmed session funds at most
//! one analysis.
//!
//! `record` is the webhook-side write and must tolerate redelivery;
//! `consume` is the request-side write and must fire at most once per
//! session, ever. Both are single conditional statements.

use sqlx::PgPool;

use crate::models::payment::PaymentSession;

/// Records a confirmed session in the unused state. Redelivered events are
/// a no-op — in particular, a session already consumed is never reset.
/// Returns true when this call inserted the row, i.e. the event was seen
/// for the first time.
pub async fn record(
    pool: &PgPool,
    session_id: &str,
    amount: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO payments (session_id, used, amount)
        VALUES ($1, FALSE, $2)
        ON CONFLICT (session_id) DO NOTHING
        "#,
    )
    .bind(session_id)
    .bind(amount)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(inserted == 1)
}

/// True iff the session exists and is unused. Unknown tokens (webhook not
/// yet delivered, or forged) are always invalid.
pub async fn is_valid(pool: &PgPool, session_id: &str) -> Result<bool, sqlx::Error> {
    let session =
        sqlx::query_as::<_, PaymentSession>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await?;

    Ok(matches!(session, Some(session) if !session.used))
}

/// Flips the session to used. Returns false when the session was missing
/// or already used — the conditional update closes the window between an
/// `is_valid` check and the consume.
pub async fn consume(pool: &PgPool, session_id: &str) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query("UPDATE payments SET used = TRUE WHERE session_id = $1 AND used = FALSE")
        .bind(session_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(updated == 1)
}
