//! Adapter for Anthropic's Messages API dialect.
//!
//! - Tools are declared as `{name, description, input_schema}`
//! - Responses carry a `content` array of typed blocks (`text`, `tool_use`)
//! - `stop_reason == "tool_use"` marks a tool-call response
//! - Tool results go back as one `user` message of `tool_result` blocks

use crate::http::object_or_empty;
use serde_json::{Value, json};
use shellwright_core::{ProviderAdapter, TokenUsage, ToolCall, ToolResult, ToolResultEnvelope, ToolSchema};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    pub fn new() -> Self {
        Self
    }

    fn blocks(response: &Value) -> &[Value] {
        response["content"].as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn format_tools(&self, tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect()
    }

    fn parse_tool_calls(&self, response: &Value) -> Vec<ToolCall> {
        Self::blocks(response)
            .iter()
            .filter(|b| b["type"] == "tool_use")
            .map(|b| {
                let id = b["id"]
                    .as_str()
                    .map(String::from)
                    .unwrap_or_else(|| format!("toolu_{}", uuid::Uuid::new_v4().simple()));
                let name = b["name"].as_str().unwrap_or_default();
                ToolCall::new(id, name, object_or_empty(&b["input"]))
            })
            .collect()
    }

    fn format_tool_results(&self, results: &[ToolResultEnvelope]) -> Vec<Value> {
        if results.is_empty() {
            return Vec::new();
        }
        let blocks: Vec<Value> = results
            .iter()
            .map(|r| {
                let mut block = json!({
                    "type": "tool_result",
                    "tool_use_id": r.tool_call_id,
                    "content": r.result.to_model_text(),
                });
                if !matches!(r.result, ToolResult::Success { .. }) {
                    block["is_error"] = json!(true);
                }
                block
            })
            .collect();
        vec![json!({"role": "user", "content": blocks})]
    }

    fn is_tool_call_response(&self, response: &Value) -> bool {
        response["stop_reason"] == "tool_use"
            || Self::blocks(response).iter().any(|b| b["type"] == "tool_use")
    }

    fn extract_text_content(&self, response: &Value) -> String {
        Self::blocks(response)
            .iter()
            .filter(|b| b["type"] == "text")
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn extract_token_usage(&self, response: &Value) -> TokenUsage {
        let usage = &response["usage"];
        TokenUsage::new(
            usage["input_tokens"].as_u64().unwrap_or(0),
            usage["output_tokens"].as_u64().unwrap_or(0),
        )
    }
}
