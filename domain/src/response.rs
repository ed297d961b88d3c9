//! Result value objects - immutable outputs of a conversation turn
//!
//! - [`ModelReply`] - a single model's result for one turn
//! - [`ModelOutcome`] - per-model success-or-error entry in a fan-out
//! - [`MultiModelResponse`] - aggregate for one user turn, keyed by model
//!   identity; created fresh per turn and never persisted

use serde::{Deserialize, Serialize};

/// Token accounting reported by a provider for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// The raw result of one provider round trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReply {
    /// Response content (text, image URL, or output file path)
    pub content: String,
    /// Token metrics, when the provider reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Wall-clock latency of the round trip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ModelReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            latency_ms: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// One model's entry in a multi-model turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutcome {
    /// Internal identifier of the model slot (`name`, `name#N`)
    pub internal_id: String,
    /// Human-facing label (`name[ #N][ (role)]`)
    pub display_name: String,
    /// The reply, when the model succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<ModelReply>,
    /// Error marker, when it did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelOutcome {
    pub fn success(
        internal_id: impl Into<String>,
        display_name: impl Into<String>,
        reply: ModelReply,
    ) -> Self {
        Self {
            internal_id: internal_id.into(),
            display_name: display_name.into(),
            reply: Some(reply),
            error: None,
        }
    }

    pub fn failure(
        internal_id: impl Into<String>,
        display_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            internal_id: internal_id.into(),
            display_name: display_name.into(),
            reply: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.reply.is_some()
    }
}

/// Aggregate result of one user turn across every configured model
///
/// Entries stay in configuration order regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiModelResponse {
    pub outcomes: Vec<ModelOutcome>,
}

impl MultiModelResponse {
    pub fn new(outcomes: Vec<ModelOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn get(&self, internal_id: &str) -> Option<&ModelOutcome> {
        self.outcomes.iter().find(|o| o.internal_id == internal_id)
    }

    pub fn successes(&self) -> impl Iterator<Item = &ModelOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    /// One labeled block per model: `from: <display name>` followed by the
    /// content or the error marker.
    pub fn combined_text(&self) -> String {
        self.outcomes
            .iter()
            .map(|o| {
                let body = match (&o.reply, &o.error) {
                    (Some(reply), _) => reply.content.as_str(),
                    (None, Some(error)) => error.as_str(),
                    (None, None) => "",
                };
                format!("from: {}\n{}", o.display_name, body)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Per-model metrics, parallel to `outcomes`; `None` for entries whose
    /// provider reported no usage (including errors).
    pub fn metrics(&self) -> Vec<Option<TokenUsage>> {
        self.outcomes
            .iter()
            .map(|o| o.reply.as_ref().and_then(|r| r.usage))
            .collect()
    }

    /// Whether any underlying result exposes token metrics.
    pub fn has_metrics(&self) -> bool {
        self.metrics().iter().any(|m| m.is_some())
    }
}
