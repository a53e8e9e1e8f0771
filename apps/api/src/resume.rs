//! Resume PDF intake — multipart upload to plain text.

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use std::io::Write;

use crate::errors::AppError;
use crate::rate_limit::client_ip;
use crate::state::AppState;

/// More lenient than analyze: parsing is cheap.
const PARSE_RATE_LIMIT: u32 = 20;
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
const MAX_TEXT_CHARS: usize = 50_000;
const TRUNCATION_MARKER: &str = "\n\n[Resume truncated due to length]";

#[derive(Debug, Serialize)]
pub struct ParseResumeResponse {
    pub text: String,
    pub chars: usize,
}

/// POST /api/v1/resume/parse
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ParseResumeResponse>, AppError> {
    let ip = client_ip(&headers);
    state
        .limiter
        .check(&format!("parse:{ip}"), PARSE_RATE_LIMIT)
        .await?;

    let mut file: Option<bytes::Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_lowercase();
            let is_pdf = matches!(
                field.content_type(),
                Some("application/pdf") | Some("application/x-pdf")
            ) || file_name.ends_with(".pdf");
            if !is_pdf {
                return Err(AppError::Validation(
                    "Invalid file type. Please upload a PDF file.".to_string(),
                ));
            }
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            file = Some(data);
            break;
        }
    }

    let Some(data) = file else {
        return Err(AppError::Validation("No file provided".to_string()));
    };
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }

    // pdf-extract is synchronous CPU work; keep it off the runtime threads.
    let extracted = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let mut tmp = tempfile::NamedTempFile::new()?;
        tmp.write_all(&data)?;
        pdf_extract::extract_text(tmp.path())
            .map_err(|e| anyhow::anyhow!("pdf extraction failed: {e}"))
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task panicked: {e}")))?
    .map_err(|e| {
        AppError::Validation(format!(
            "Failed to parse PDF ({e}). Please try pasting your resume instead."
        ))
    })?;

    let text = clean_text(&extracted);
    if text.is_empty() {
        return Err(AppError::Validation(
            "Could not extract text from PDF. Please try pasting your resume instead.".to_string(),
        ));
    }

    let chars = text.chars().count();
    Ok(Json(ParseResumeResponse { text, chars }))
}

/// Normalizes line endings, collapses blank-line runs, and truncates
/// pathological inputs before they reach the LLM.
fn clean_text(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n");
    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    let text = text.trim();

    if text.chars().count() > MAX_TEXT_CHARS {
        let mut truncated: String = text.chars().take(MAX_TEXT_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_normalizes_line_endings() {
        assert_eq!(clean_text("a\r\nb\r\nc"), "a\nb\nc");
    }

    #[test]
    fn test_clean_text_collapses_blank_runs() {
        assert_eq!(clean_text("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_text_trims() {
        assert_eq!(clean_text("  \n resume text \n\n"), "resume text");
    }

    #[test]
    fn test_clean_text_truncates_long_input() {
        let long = "x".repeat(MAX_TEXT_CHARS + 500);
        let cleaned = clean_text(&long);
        assert!(cleaned.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            cleaned.chars().count(),
            MAX_TEXT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn test_clean_text_short_input_untouched() {
        assert_eq!(clean_text("short resume"), "short resume");
    }
}
