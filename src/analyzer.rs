//! Tone-analysis integration — one HTTP call per message to the LLM backend.
//!
//! `analyze_tone` is total: any transport, status, or decode error collapses
//! to [`ToneAnalysis::fallback`] and is logged, never propagated.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::ToneAnalysis;
use crate::error::AnalyzerError;

/// Bounded timeout for the backend call. Exceeding it degrades to the
/// fallback analysis rather than failing the pipeline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1000;

/// Tone analyzer seam. The pipeline depends on this trait so tests can
/// substitute a canned analysis.
#[async_trait]
pub trait ToneAnalyzer: Send + Sync {
    /// Analyze a message body. Never fails outward.
    async fn analyze_tone(&self, body: &str) -> ToneAnalysis;
}

/// LLM-backed analyzer speaking the backend's generate API.
pub struct LlmToneAnalyzer {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

/// Request body for the backend's generate endpoint.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmToneAnalyzer {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
        }
    }

    async fn request_analysis(&self, body: &str) -> Result<ToneAnalysis, AnalyzerError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: build_analysis_prompt(body),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.api_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzerError::Status(status.as_u16()));
        }

        let analysis: ToneAnalysis = response.json().await?;
        Ok(analysis)
    }
}

#[async_trait]
impl ToneAnalyzer for LlmToneAnalyzer {
    async fn analyze_tone(&self, body: &str) -> ToneAnalysis {
        // Blank input never triggers a backend call.
        if body.trim().is_empty() {
            debug!("Blank message body, skipping tone analysis");
            return ToneAnalysis::fallback();
        }

        match self.request_analysis(body).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(error = %e, "Tone analysis failed, using fallback");
                ToneAnalysis::fallback()
            }
        }
    }
}

/// Instruction prompt embedding the message body and the required output
/// schema.
fn build_analysis_prompt(body: &str) -> String {
    format!(
        "Analyze the following email message and provide:\n\
         1. Overall sentiment (VERY_NEGATIVE, NEGATIVE, NEUTRAL, POSITIVE, VERY_POSITIVE)\n\
         2. Main emotions (ANGER, FEAR, HAPPINESS, SADNESS, SURPRISE, DISGUST, NEUTRAL) with values from 0 to 1\n\
         3. Urgency (LOW, NORMAL, HIGH, CRITICAL)\n\
         4. Formality (VERY_INFORMAL, INFORMAL, NEUTRAL, FORMAL, VERY_FORMAL)\n\
         5. Main topics (list of keywords)\n\
         6. A short summary of the content\n\
         \n\
         Respond with a JSON object using the keys: sentiment, emotions, urgency, formality, topTopics, summaryText.\n\
         \n\
         Message:\n\
         {body}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_body_and_schema() {
        let prompt = build_analysis_prompt("My order never arrived.");
        assert!(prompt.contains("My order never arrived."));
        assert!(prompt.contains("VERY_NEGATIVE"));
        assert!(prompt.contains("topTopics"));
        assert!(prompt.contains("summaryText"));
    }

    #[tokio::test]
    async fn blank_body_short_circuits_without_network() {
        // Unroutable endpoint — a network attempt would error, not fall
        // through this fast.
        let analyzer = LlmToneAnalyzer::new("http://127.0.0.1:1", "test-model");
        let analysis = analyzer.analyze_tone("   \n\t  ").await;
        assert_eq!(analysis, ToneAnalysis::fallback());
    }

    #[tokio::test]
    async fn unreachable_backend_yields_fallback() {
        let analyzer = LlmToneAnalyzer::new("http://127.0.0.1:1", "test-model");
        let analysis = analyzer.analyze_tone("This is urgent!").await;
        assert_eq!(analysis, ToneAnalysis::fallback());
    }
}
