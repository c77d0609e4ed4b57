//! Context management — keeps the conversation inside the model's window.
//!
//! Two independent strategies:
//!
//! - **Structural compaction** ([`ContextManager::compact`]) runs inside the
//!   turn loop whenever [`ContextManager::should_compact`] says so. It keeps
//!   the system prompt, the first user message, and the last few assistant
//!   turns verbatim and replaces everything in between with a digest.
//! - **Deep compaction** ([`summarize_history`] + [`rebuild_from_summary`])
//!   asks the model for a narrative summary and starts a fresh history
//!   from it. Only on explicit request.

pub mod compaction;
pub mod summarize;
pub mod token;

pub use compaction::{DIGEST_TEXT_LIMIT, PRESERVED_TURNS};
pub use summarize::{SUMMARY_PROMPT, rebuild_from_summary, summarize_history};
pub use token::{CHARS_PER_TOKEN, JSON_OVERHEAD_FACTOR};

use shellwright_config::ContextConfig;
use shellwright_core::Message;
use tracing::info;

/// Token-budget policy for one conversation.
#[derive(Debug, Clone, Default)]
pub struct ContextManager {
    config: ContextConfig,
}

impl ContextManager {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Estimated token count of `messages`.
    pub fn estimate_tokens(&self, messages: &[Message]) -> u64 {
        token::estimate_tokens(messages)
    }

    /// Tokens the conversation may reach before compaction kicks in.
    pub fn threshold(&self) -> f64 {
        let usable = self
            .config
            .token_limit
            .saturating_sub(self.config.output_reserve_tokens);
        usable as f64 * self.config.compaction_ratio
    }

    pub fn should_compact(&self, messages: &[Message]) -> bool {
        self.estimate_tokens(messages) as f64 > self.threshold()
    }

    /// Structurally compacted copy of `messages`.
    pub fn compact(&self, messages: &[Message]) -> Vec<Message> {
        let before = self.estimate_tokens(messages);
        let compacted = compaction::compact(messages);
        info!(
            before_messages = messages.len(),
            after_messages = compacted.len(),
            before_tokens = before,
            after_tokens = self.estimate_tokens(&compacted),
            "Context compacted"
        );
        compacted
    }
}
