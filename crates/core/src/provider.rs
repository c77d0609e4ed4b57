//! Provider trait — the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation plus wire-format tool
//! declarations to a model endpoint and hand back the raw response body.
//! Interpreting that body is the job of a [`ProviderAdapter`](crate::ProviderAdapter).
//!
//! Implementations: Anthropic Messages API, OpenAI-compatible chat completions.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Per-request settings for a provider call.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// The model to use (e.g., "claude-sonnet-4-20250514", "gpt-4o")
    pub model: String,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Fires when the caller abandons the request
    pub cancel: CancellationToken,
}

impl SendOptions {
    pub fn new(model: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_output_tokens,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Token usage reported for one model call.
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

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this. The agent executor calls
/// `send_with_tools()` once per turn and never looks at the wire format
/// except through the paired adapter.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name of this provider (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send the conversation and return the raw response body.
    ///
    /// `tools` are already in the provider's wire format. An empty slice
    /// means the model may not call tools. Implementations must stop early
    /// with [`ProviderError::Cancelled`] once `options.cancel` fires.
    async fn send_with_tools(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
        options: &SendOptions,
    ) -> std::result::Result<serde_json::Value, ProviderError>;

    /// Check if the provider is reachable and configured correctly.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
