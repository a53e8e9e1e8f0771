//! Roast engine — trait seam over the external analysis call.
//!
//! `AppState` holds an `Arc<dyn RoastAnalyzer>`, so the orchestrating
//! handler and its tests never touch the Anthropic API directly. The
//! production backend is `LlmRoastAnalyzer`; tests substitute stubs.

use async_trait::async_trait;

use crate::analysis::models::{RawAnalysis, RoastAnalysis};
use crate::analysis::prompts::{ROAST_PROMPT_TEMPLATE, ROAST_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::LlmClient;

/// The analyzer trait. Implement this to swap backends without touching
/// the endpoint, handler, or caller code.
#[async_trait]
pub trait RoastAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<RoastAnalysis, AppError>;
}

/// Production backend: one Claude call, then the ingestion boundary.
pub struct LlmRoastAnalyzer {
    llm: LlmClient,
}

impl LlmRoastAnalyzer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RoastAnalyzer for LlmRoastAnalyzer {
    async fn analyze(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<RoastAnalysis, AppError> {
        let prompt = ROAST_PROMPT_TEMPLATE
            .replace("{resume}", resume_text)
            .replace("{job_description}", job_description);

        let raw: RawAnalysis = self
            .llm
            .call_json(&prompt, ROAST_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Roast analysis failed: {e}")))?;

        RoastAnalysis::ingest(raw).map_err(|e| AppError::Llm(format!("Unusable analysis: {e}")))
    }
}
