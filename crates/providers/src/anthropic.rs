//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use crate::anthropic_adapter::AnthropicAdapter;
use crate::http::{build_client, send_json};
use crate::wire::{WireItem, group_tool_results};
use async_trait::async_trait;
use serde_json::{Value, json};
use shellwright_core::{Message, Provider, ProviderAdapter, ProviderError, SendOptions};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            // Long generations with large tool outputs can be slow
            client: build_client(300),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Split the conversation into the top-level system prompt and the
    /// `messages` array.
    fn to_api_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut api_messages = Vec::new();

        for item in group_tool_results(messages) {
            match item {
                WireItem::ToolResults(batch) => {
                    api_messages.extend(AnthropicAdapter.format_tool_results(&batch));
                }
                WireItem::Message(Message::System { content }) => system_parts.push(content),
                WireItem::Message(Message::User { content }) => {
                    api_messages.push(json!({"role": "user", "content": content}));
                }
                WireItem::Message(Message::Assistant {
                    content,
                    tool_calls,
                }) => {
                    if tool_calls.is_empty() {
                        api_messages.push(json!({"role": "assistant", "content": content}));
                        continue;
                    }
                    let mut blocks = Vec::new();
                    if !content.is_empty() {
                        blocks.push(json!({"type": "text", "text": content}));
                    }
                    for tc in tool_calls {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": tc.id,
                            "name": tc.name,
                            "input": tc.input,
                        }));
                    }
                    api_messages.push(json!({"role": "assistant", "content": blocks}));
                }
                // Grouped above
                WireItem::Message(Message::ToolResult { .. }) => {}
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, api_messages)
    }

    fn request_body(messages: &[Message], tools: &[Value], options: &SendOptions) -> Value {
        let (system, api_messages) = Self::to_api_messages(messages);

        let mut body = json!({
            "model": options.model,
            "messages": api_messages,
            "max_tokens": options.max_output_tokens,
        });

        if let Some(sys) = system {
            body["system"] = json!(sys);
        }

        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }

        body
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn send_with_tools(
        &self,
        messages: &[Message],
        tools: &[Value],
        options: &SendOptions,
    ) -> std::result::Result<Value, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "anthropic: no API key (set ANTHROPIC_API_KEY or providers.anthropic.api_key)".into(),
            ));
        }

        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(messages, tools, options);

        debug!(provider = "anthropic", model = %options.model, messages = messages.len(), tools = tools.len(), "Sending request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body);

        send_json("anthropic", request, &options.cancel).await
    }
}
