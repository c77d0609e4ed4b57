//! Provider adapter contract.
//!
//! Each model vendor speaks its own dialect for tool declarations, tool
//! calls, tool results and usage accounting. An adapter translates between
//! that dialect and the neutral types in this crate. Adapters are pure,
//! synchronous and total: malformed responses degrade to empty values
//! instead of failing.

use crate::message::{ToolCall, ToolResult};
use crate::provider::TokenUsage;
use crate::tool::ToolSchema;
use serde::{Deserialize, Serialize};

/// One tool outcome, addressed to the call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    pub tool_call_id: String,
    pub tool_name: String,
    pub result: ToolResult,
}

impl ToolResultEnvelope {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: ToolResult,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            result,
        }
    }
}

/// Translation between neutral types and one vendor's wire format.
pub trait ProviderAdapter: Send + Sync {
    /// Vendor identifier (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Neutral tool schemas to wire-format tool declarations, order preserved.
    fn format_tools(&self, tools: &[ToolSchema]) -> Vec<serde_json::Value>;

    /// Tool calls in a raw response, in emission order. Never fails.
    fn parse_tool_calls(&self, response: &serde_json::Value) -> Vec<ToolCall>;

    /// Wire-format message(s) carrying the given tool results.
    fn format_tool_results(&self, results: &[ToolResultEnvelope]) -> Vec<serde_json::Value>;

    /// Whether the response asks for tool execution.
    fn is_tool_call_response(&self, response: &serde_json::Value) -> bool;

    /// Concatenated textual content of the response; empty when there is none.
    fn extract_text_content(&self, response: &serde_json::Value) -> String;

    /// Usage reported by the response; zeros when absent.
    fn extract_token_usage(&self, response: &serde_json::Value) -> TokenUsage;
}
