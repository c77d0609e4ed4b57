//! Walks a neutral conversation in wire order.

use shellwright_core::{Message, ToolResultEnvelope};

pub(crate) enum WireItem<'a> {
    Message(&'a Message),
    /// A run of consecutive tool results, answered together
    ToolResults(Vec<ToolResultEnvelope>),
}

/// Group consecutive `ToolResult` messages so an adapter can format them
/// as one batch.
pub(crate) fn group_tool_results(messages: &[Message]) -> Vec<WireItem<'_>> {
    let mut items = Vec::new();
    let mut pending: Vec<ToolResultEnvelope> = Vec::new();

    for msg in messages {
        match msg {
            Message::ToolResult {
                tool_call_id,
                tool_name,
                result,
            } => pending.push(ToolResultEnvelope::new(
                tool_call_id.clone(),
                tool_name.clone(),
                result.clone(),
            )),
            other => {
                if !pending.is_empty() {
                    items.push(WireItem::ToolResults(std::mem::take(&mut pending)));
                }
                items.push(WireItem::Message(other));
            }
        }
    }
    if !pending.is_empty() {
        items.push(WireItem::ToolResults(pending));
    }
    items
}
