//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Groq, and any
//! endpoint exposing `/chat/completions` with function calling.

use crate::http::{build_client, send_json};
use crate::openai_adapter::OpenAiAdapter;
use crate::wire::{WireItem, group_tool_results};
use async_trait::async_trait;
use serde_json::{Value, json};
use shellwright_core::{Message, Provider, ProviderAdapter, ProviderError, SendOptions};
use tracing::debug;

/// An OpenAI-compatible LLM provider.
///
/// This handles the vast majority of LLM providers since most expose
/// an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(120),
        }
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Convert the neutral conversation to chat-completions messages.
    fn to_api_messages(messages: &[Message]) -> Vec<Value> {
        let mut api_messages = Vec::new();

        for item in group_tool_results(messages) {
            match item {
                WireItem::ToolResults(batch) => {
                    api_messages.extend(OpenAiAdapter.format_tool_results(&batch));
                }
                WireItem::Message(Message::System { content }) => {
                    api_messages.push(json!({"role": "system", "content": content}));
                }
                WireItem::Message(Message::User { content }) => {
                    api_messages.push(json!({"role": "user", "content": content}));
                }
                WireItem::Message(Message::Assistant {
                    content,
                    tool_calls,
                }) => {
                    let mut msg = json!({"role": "assistant", "content": content});
                    if !tool_calls.is_empty() {
                        let calls: Vec<Value> = tool_calls
                            .iter()
                            .map(|tc| {
                                json!({
                                    "id": tc.id,
                                    "type": "function",
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.input.to_string(),
                                    }
                                })
                            })
                            .collect();
                        msg["tool_calls"] = json!(calls);
                        if content.is_empty() {
                            msg["content"] = Value::Null;
                        }
                    }
                    api_messages.push(msg);
                }
                WireItem::Message(Message::ToolResult { .. }) => {}
            }
        }

        api_messages
    }

    fn request_body(messages: &[Message], tools: &[Value], options: &SendOptions) -> Value {
        let mut body = json!({
            "model": options.model,
            "messages": Self::to_api_messages(messages),
            "max_tokens": options.max_output_tokens,
            "stream": false,
        });

        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }

        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_with_tools(
        &self,
        messages: &[Message],
        tools: &[Value],
        options: &SendOptions,
    ) -> std::result::Result<Value, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{}: no API key configured",
                self.name
            )));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(messages, tools, options);

        debug!(provider = %self.name, model = %options.model, messages = messages.len(), tools = tools.len(), "Sending request");

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        send_json(&self.name, request, &options.cancel).await
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellwright_core::{ToolCall, ToolResult};

    #[test]
    fn convenience_constructors() {
        assert_eq!(OpenAiCompatProvider::openai("k").base_url, "https://api.openai.com/v1");
        assert_eq!(OpenAiCompatProvider::openrouter("k").name(), "openrouter");
        assert!(OpenAiCompatProvider::ollama(None).base_url.contains("11434"));
        assert_eq!(OpenAiCompatProvider::new("x", "http://h/v1/", "k").base_url, "http://h/v1");
    }

    #[test]
    fn assistant_tool_calls_serialize_arguments_as_string() {
        let messages = vec![
            Message::system("sys"),
            Message::user("run ls"),
            Message::assistant_with_tools("", vec![ToolCall::new("call_1", "shell", json!({"command": "ls"}))]),
            Message::tool_result("call_1", "shell", ToolResult::success("a\nb")),
        ];
        let wire = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[0]["role"], "system");
        assert!(wire[2]["content"].is_null());
        let args = wire[2]["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        assert_eq!(serde_json::from_str::<Value>(args).unwrap()["command"], "ls");
        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn empty_tool_list_is_omitted() {
        let body = OpenAiCompatProvider::request_body(&[Message::user("hi")], &[], &SendOptions::new("gpt-4o", 64));
        assert!(body.get("tools").is_none());
        assert_eq!(body["model"], "gpt-4o");
    }
}
