//! Structural compaction: keep the head and the recent tail verbatim,
//! replace the middle with a bullet digest.

use shellwright_core::Message;
use std::collections::HashSet;

/// Assistant turns (assistant message plus its tool results) kept verbatim.
pub const PRESERVED_TURNS: usize = 3;

/// Characters of assistant text quoted in the digest.
pub const DIGEST_TEXT_LIMIT: usize = 200;

const DIGEST_HEADER: &str = "[Earlier conversation compacted. Summary of omitted turns:]";

/// Compact a conversation.
///
/// Output order: system (if any), first user message, the synthesized
/// digest (if anything was dropped), then the preserved tail.
pub fn compact(messages: &[Message]) -> Vec<Message> {
    if messages.len() <= 2 {
        return messages.to_vec();
    }

    let system_idx = messages.first().filter(|m| m.is_system()).map(|_| 0);
    let first_user_idx = messages.iter().position(Message::is_user);
    let head: HashSet<usize> = system_idx.into_iter().chain(first_user_idx).collect();
    let head_end = head.iter().max().map(|i| i + 1).unwrap_or(0);

    let tail_start = tail_start(messages).max(head_end);

    let middle: Vec<&Message> = messages[..tail_start]
        .iter()
        .enumerate()
        .filter(|(i, _)| !head.contains(i))
        .map(|(_, m)| m)
        .collect();

    let mut compacted = Vec::with_capacity(head.len() + 1 + messages.len() - tail_start);
    if let Some(i) = system_idx {
        compacted.push(messages[i].clone());
    }
    if let Some(i) = first_user_idx {
        compacted.push(messages[i].clone());
    }
    if !middle.is_empty() {
        compacted.push(Message::user(digest(&middle)));
    }
    compacted.extend(
        messages[tail_start..]
            .iter()
            .enumerate()
            .filter(|(offset, _)| !head.contains(&(tail_start + offset)))
            .map(|(_, m)| m.clone()),
    );
    compacted
}

/// Index where the preserved tail begins: the [`PRESERVED_TURNS`]-th
/// assistant message counting back from the end, or the start of the log
/// when there are fewer.
fn tail_start(messages: &[Message]) -> usize {
    let mut seen = 0;
    for (i, msg) in messages.iter().enumerate().rev() {
        if msg.is_assistant() {
            seen += 1;
            if seen == PRESERVED_TURNS {
                return i;
            }
        }
    }
    0
}

fn digest(middle: &[&Message]) -> String {
    let mut lines = vec![DIGEST_HEADER.to_string()];
    for msg in middle {
        match msg {
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let text = clip(content.trim());
                let line = match (tool_calls.is_empty(), text.is_empty()) {
                    (true, _) => format!("- Assistant: {text}"),
                    (false, true) => format!("- Assistant called {}", tool_names(msg)),
                    (false, false) => format!("- Assistant called {}: {text}", tool_names(msg)),
                };
                lines.push(line);
            }
            Message::ToolResult {
                tool_name, result, ..
            } => lines.push(format!("- Tool {tool_name}: {}", result.status())),
            Message::User { content } => lines.push(format!("- User: {}", clip(content.trim()))),
            Message::System { .. } => {}
        }
    }
    lines.join("\n")
}

fn tool_names(msg: &Message) -> String {
    msg.tool_calls()
        .iter()
        .map(|tc| tc.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn clip(text: &str) -> String {
    text.chars().take(DIGEST_TEXT_LIMIT).collect()
}
