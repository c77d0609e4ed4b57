//! Adapter for the OpenAI chat-completions dialect.
//!
//! - Tools are declared as `{type: "function", function: {...}}`
//! - Responses carry `choices[0].message` with a parallel `tool_calls` array
//! - `finish_reason == "tool_calls"` marks a tool-call response
//! - Tool arguments arrive as a JSON-encoded string
//! - Each tool result goes back as its own `{role: "tool"}` message

use crate::http::object_or_empty;
use serde_json::{Value, json};
use shellwright_core::{ProviderAdapter, TokenUsage, ToolCall, ToolResultEnvelope, ToolSchema};

#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl OpenAiAdapter {
    pub fn new() -> Self {
        Self
    }

    fn choice(response: &Value) -> &Value {
        &response["choices"][0]
    }

    fn raw_tool_calls(response: &Value) -> &[Value] {
        Self::choice(response)["message"]["tool_calls"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    fn format_tools(&self, tools: &[ToolSchema]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect()
    }

    fn parse_tool_calls(&self, response: &Value) -> Vec<ToolCall> {
        Self::raw_tool_calls(response)
            .iter()
            .map(|tc| {
                let id = tc["id"]
                    .as_str()
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                let function = &tc["function"];
                let name = function["name"].as_str().unwrap_or_default();
                ToolCall::new(id, name, object_or_empty(&function["arguments"]))
            })
            .collect()
    }

    fn format_tool_results(&self, results: &[ToolResultEnvelope]) -> Vec<Value> {
        results
            .iter()
            .map(|r| {
                json!({
                    "role": "tool",
                    "tool_call_id": r.tool_call_id,
                    "content": r.result.to_model_text(),
                })
            })
            .collect()
    }

    fn is_tool_call_response(&self, response: &Value) -> bool {
        Self::choice(response)["finish_reason"] == "tool_calls"
            || !Self::raw_tool_calls(response).is_empty()
    }

    fn extract_text_content(&self, response: &Value) -> String {
        match &Self::choice(response)["message"]["content"] {
            Value::String(text) => text.clone(),
            // Some gateways return content parts instead of a plain string
            Value::Array(parts) => parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
            _ => String::new(),
        }
    }

    fn extract_token_usage(&self, response: &Value) -> TokenUsage {
        let usage = &response["usage"];
        TokenUsage::new(
            usage["prompt_tokens"].as_u64().unwrap_or(0),
            usage["completion_tokens"].as_u64().unwrap_or(0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellwright_core::ToolResult;

    fn tool_call_response() -> Value {
        json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_1", "type": "function", "function": {"name": "list_dir", "arguments": "{\"path\":\"src\"}"}},
                        {"type": "function", "function": {"name": "shell", "arguments": "not json"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
        })
    }

    #[test]
    fn tool_definition_conversion() {
        let wire = OpenAiAdapter.format_tools(&[ToolSchema {
            name: "shell".into(),
            description: "Run a command".into(),
            parameters: json!({"type": "object", "properties": {}, "required": []}),
        }]);
        assert_eq!(wire[0]["type"], "function");
        assert_eq!(wire[0]["function"]["name"], "shell");
    }

    #[test]
    fn parses_string_arguments_and_fills_missing_ids() {
        let calls = OpenAiAdapter.parse_tool_calls(&tool_call_response());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].input, json!({"path": "src"}));
        assert!(calls[1].id.starts_with("call_"));
        assert_eq!(calls[1].input, json!({}));
    }

    #[test]
    fn detection_text_and_usage() {
        let resp = tool_call_response();
        assert!(OpenAiAdapter.is_tool_call_response(&resp));
        assert_eq!(OpenAiAdapter.extract_text_content(&resp), "");
        assert_eq!(OpenAiAdapter.extract_token_usage(&resp), TokenUsage::new(100, 50));
    }

    #[test]
    fn plain_answer() {
        let resp = json!({
            "choices": [{"message": {"role": "assistant", "content": "Done."}, "finish_reason": "stop"}]
        });
        assert!(!OpenAiAdapter.is_tool_call_response(&resp));
        assert_eq!(OpenAiAdapter.extract_text_content(&resp), "Done.");
        assert_eq!(OpenAiAdapter.extract_token_usage(&resp), TokenUsage::default());
    }

    #[test]
    fn missing_choices_never_panics() {
        let resp = json!({"error": "overloaded"});
        assert!(!OpenAiAdapter.is_tool_call_response(&resp));
        assert!(OpenAiAdapter.parse_tool_calls(&resp).is_empty());
        assert_eq!(OpenAiAdapter.extract_text_content(&resp), "");
    }

    #[test]
    fn one_tool_message_per_result() {
        let wire = OpenAiAdapter.format_tool_results(&[
            ToolResultEnvelope::new("call_1", "list_dir", ToolResult::success("main.rs")),
            ToolResultEnvelope::new("call_2", "shell", ToolResult::error("exit 1")),
        ]);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "tool");
        assert_eq!(wire[0]["tool_call_id"], "call_1");
        assert_eq!(wire[1]["content"], "Error: exit 1");
    }
}
