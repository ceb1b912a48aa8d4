//! Intent extraction for free-text user input.
//!
//! Sends the text to a completion model with a fixed instruction, parses
//! the structured answer and falls back to the offline keyword classifier
//! whenever the call fails, times out or returns something unusable. The
//! extractor never returns an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use shelfwise_backend_openai::CompletionModel;
use shelfwise_features::classify_offline;
use shelfwise_model::IntentRecord;

mod parse;

pub use parse::{parse_response, scan_labels, ModelResponse};

/// Instruction sent with every intent request.
pub const SYSTEM_PROMPT: &str = r#"You are a shopping intent analyst for an electronics store.
Analyze the user's message and reply with a single JSON object and nothing else:
{
  "intent_type": "purchase | price_comparison | information | brand_research | after_sales",
  "confidence": 0.0-1.0,
  "product_categories": ["phone", "laptop", "headphone", "tablet", "camera", "wearable"],
  "price_range": "low | mid | high",
  "brand_preferences": ["brand"],
  "urgency_level": 0.0-1.0,
  "keywords": ["keyword"],
  "analysis_summary": "one sentence"
}
Only list categories and brands the user actually mentions or clearly implies."#;

/// Configuration for the intent extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Budget for the remote call before falling back, in milliseconds
    pub timeout_ms: u64,
    /// Sampling temperature; kept low for repeatable answers
    pub temperature: f32,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            temperature: 0.3,
        }
    }
}

impl IntentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Turns free text into an [`IntentRecord`].
pub struct IntentExtractor<M> {
    model: Arc<M>,
    config: IntentConfig,
}

impl<M> Clone for IntentExtractor<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            config: self.config.clone(),
        }
    }
}

impl<M: CompletionModel> IntentExtractor<M> {
    pub fn new(model: Arc<M>, config: IntentConfig) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Extract intent from `text`.
    ///
    /// Blank text returns [`IntentRecord::empty`] without calling the
    /// model. Dropping the returned future cancels the in-flight call.
    pub async fn extract(&self, text: &str, user_id: &str) -> IntentRecord {
        if text.trim().is_empty() {
            return IntentRecord::empty();
        }

        let started = Instant::now();
        let call = self
            .model
            .complete(SYSTEM_PROMPT, text, self.config.temperature);

        let raw = match tokio::time::timeout(self.config.timeout(), call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(
                    user_id,
                    model = self.model.name(),
                    error = %e,
                    "Intent model call failed, using offline classifier"
                );
                return classify_offline(text);
            }
            Err(_) => {
                tracing::warn!(
                    user_id,
                    model = self.model.name(),
                    timeout_ms = self.config.timeout_ms,
                    "Intent model call timed out, using offline classifier"
                );
                return classify_offline(text);
            }
        };

        let record = match parse_response(&raw) {
            ModelResponse::Parsed(record) => Some(record),
            ModelResponse::Unparseable(raw) => {
                tracing::debug!(user_id, "Model response is not JSON, scanning for labels");
                scan_labels(&raw)
            }
        };

        match record {
            Some(record) => {
                tracing::info!(
                    user_id,
                    intent = %record.category,
                    confidence = record.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Intent extracted by model"
                );
                record
            }
            None => {
                tracing::warn!(user_id, "Model response unusable, using offline classifier");
                classify_offline(text)
            }
        }
    }
}
