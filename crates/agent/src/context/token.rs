//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, inflated by
//! a fixed factor for the JSON framing every wire format adds. Good enough
//! to decide when to compact; never used for billing.

use shellwright_core::Message;

/// Average characters per token.
pub const CHARS_PER_TOKEN: f64 = 4.0;

/// Multiplier for wire-format overhead (keys, quotes, delimiters).
pub const JSON_OVERHEAD_FACTOR: f64 = 1.1;

/// Characters a message contributes: role name, text, serialized tool-call
/// inputs, and tool-result payload.
pub fn message_chars(message: &Message) -> usize {
    let role = message.role_name().chars().count();
    let body = match message {
        Message::System { content } | Message::User { content } => content.chars().count(),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            content.chars().count()
                + tool_calls
                    .iter()
                    .map(|tc| tc.input.to_string().chars().count())
                    .sum::<usize>()
        }
        Message::ToolResult { result, .. } => result.payload().chars().count(),
    };
    role + body
}

/// Estimate the token count for a conversation. Rounds up.
pub fn estimate_tokens(messages: &[Message]) -> u64 {
    let chars: usize = messages.iter().map(message_chars).sum();
    if chars == 0 {
        return 0;
    }
    (chars as f64 * JSON_OVERHEAD_FACTOR / CHARS_PER_TOKEN).ceil() as u64
}
