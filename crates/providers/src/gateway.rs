//! Adapter for OpenAI-compatible gateways (OpenRouter, Ollama, vLLM, ...).
//!
//! These speak the OpenAI wire format verbatim, so every call is delegated
//! to [`OpenAiAdapter`]; only the reported name differs.

use crate::openai_adapter::OpenAiAdapter;
use serde_json::Value;
use shellwright_core::{ProviderAdapter, TokenUsage, ToolCall, ToolResultEnvelope, ToolSchema};

#[derive(Debug, Clone)]
pub struct GatewayAdapter {
    name: String,
    inner: OpenAiAdapter,
}

impl GatewayAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: OpenAiAdapter,
        }
    }
}

impl ProviderAdapter for GatewayAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn format_tools(&self, tools: &[ToolSchema]) -> Vec<Value> {
        self.inner.format_tools(tools)
    }

    fn parse_tool_calls(&self, response: &Value) -> Vec<ToolCall> {
        self.inner.parse_tool_calls(response)
    }

    fn format_tool_results(&self, results: &[ToolResultEnvelope]) -> Vec<Value> {
        self.inner.format_tool_results(results)
    }

    fn is_tool_call_response(&self, response: &Value) -> bool {
        self.inner.is_tool_call_response(response)
    }

    fn extract_text_content(&self, response: &Value) -> String {
        self.inner.extract_text_content(response)
    }

    fn extract_token_usage(&self, response: &Value) -> TokenUsage {
        self.inner.extract_token_usage(response)
    }
}
