//! Result persistence — write-once rows behind short shareable ids.

use rand_core::{OsRng, RngCore};
use sqlx::PgPool;

use crate::analysis::models::RoastAnalysis;
use crate::models::roast::RoastResult;

const ID_ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const ID_LEN: usize = 10;

/// Opaque 10-char id for shareable result URLs. OS entropy; 62^10 keyspace
/// makes collisions a non-concern at this scale (the primary key still
/// backstops them).
pub fn short_id() -> String {
    let mut bytes = [0u8; ID_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ID_ALPHABET[(*b as usize) % ID_ALPHABET.len()] as char)
        .collect()
}

/// Who funded a result. Recorded on the row, never updated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Provenance<'a> {
    pub is_paid: bool,
    pub is_free_roast: bool,
    pub email: Option<&'a str>,
    pub payment_session_id: Option<&'a str>,
}

/// Inserts the result row. Write-once: there is no update path for
/// results anywhere in the service.
pub async fn save_result(
    pool: &PgPool,
    result_id: &str,
    analysis: &RoastAnalysis,
    provenance: Provenance<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO results
            (result_id, grade, headline, rejection, skill_gaps, hiring_manager_quote,
             improvements, ats_score, details, is_paid, is_free_roast, email,
             payment_session_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(result_id)
    .bind(&analysis.grade)
    .bind(&analysis.headline)
    .bind(&analysis.rejection)
    .bind(&analysis.skill_gaps)
    .bind(&analysis.hiring_manager_quote)
    .bind(&analysis.improvements)
    .bind(analysis.ats.score as i32)
    .bind(analysis.details())
    .bind(provenance.is_paid)
    .bind(provenance.is_free_roast)
    .bind(provenance.email)
    .bind(provenance.payment_session_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_result(
    pool: &PgPool,
    result_id: &str,
) -> Result<Option<RoastResult>, sqlx::Error> {
    sqlx::query_as::<_, RoastResult>("SELECT * FROM results WHERE result_id = $1")
        .bind(result_id)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_length_and_alphabet() {
        let id = short_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_short_ids_are_distinct() {
        let ids: std::collections::HashSet<String> = (0..100).map(|_| short_id()).collect();
        assert_eq!(ids.len(), 100);
    }
}
