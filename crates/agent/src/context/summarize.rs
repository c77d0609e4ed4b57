//! LLM-driven deep compaction.
//!
//! Invoked explicitly (e.g. a `/compact` request), never from inside the
//! turn loop. The model writes a narrative summary of the whole session and
//! [`rebuild_from_summary`] turns it into a fresh three-message history.

use shellwright_core::{Message, Provider, ProviderAdapter, ProviderError, SendOptions};
use tracing::info;

/// Instruction appended to the history when asking for a summary.
pub const SUMMARY_PROMPT: &str = "Summarize this conversation so the work can continue in a fresh session. \
Do not call any tools. Use these sections:\n\
1. Goal: what the user is trying to accomplish\n\
2. Constraints: requirements, preferences, and limits the user stated\n\
3. Completed: work that is done, with outcomes\n\
4. In progress: what was underway when this summary was requested\n\
5. Files: every file read, created, or modified, with a short note\n\
6. Remaining: what still needs to be done\n\
7. Key decisions: choices made and why they matter for what comes next";

const ACKNOWLEDGEMENT: &str =
    "Understood. I have the context from the previous session and will continue from here.";

/// Ask the provider for a structured summary of `messages`.
///
/// Sends the full history plus [`SUMMARY_PROMPT`] with tool calling
/// disabled and returns the extracted text.
pub async fn summarize_history(
    provider: &dyn Provider,
    adapter: &dyn ProviderAdapter,
    messages: &[Message],
    options: &SendOptions,
) -> Result<String, ProviderError> {
    let mut request = messages.to_vec();
    request.push(Message::user(SUMMARY_PROMPT));

    let response = provider.send_with_tools(&request, &[], options).await?;
    let summary = adapter.extract_text_content(&response);
    if summary.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "summary response contained no text".into(),
        ));
    }

    info!(
        messages = messages.len(),
        summary_chars = summary.len(),
        "Conversation summarized"
    );
    Ok(summary)
}

/// Build a minimal resumable history from a summary: the original system
/// message (if any), the summary as user context, and an acknowledgement.
pub fn rebuild_from_summary(messages: &[Message], summary: &str) -> Vec<Message> {
    let mut rebuilt = Vec::with_capacity(3);
    if let Some(system) = messages.first().filter(|m| m.is_system()) {
        rebuilt.push(system.clone());
    }
    rebuilt.push(Message::user(format!(
        "Summary of the conversation so far:\n\n{summary}"
    )));
    rebuilt.push(Message::assistant(ACKNOWLEDGEMENT));
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    struct RecordingProvider {
        response: Value,
        seen: Mutex<Vec<(usize, usize)>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_with_tools(
            &self,
            messages: &[Message],
            tools: &[Value],
            _options: &SendOptions,
        ) -> Result<Value, ProviderError> {
            self.seen.lock().unwrap().push((messages.len(), tools.len()));
            assert_eq!(messages.last().unwrap().text(), SUMMARY_PROMPT);
            Ok(self.response.clone())
        }
    }

    struct TextAdapter;

    impl ProviderAdapter for TextAdapter {
        fn name(&self) -> &str {
            "text"
        }
        fn format_tools(&self, _tools: &[shellwright_core::ToolSchema]) -> Vec<Value> {
            Vec::new()
        }
        fn parse_tool_calls(&self, _response: &Value) -> Vec<shellwright_core::ToolCall> {
            Vec::new()
        }
        fn format_tool_results(&self, _results: &[shellwright_core::ToolResultEnvelope]) -> Vec<Value> {
            Vec::new()
        }
        fn is_tool_call_response(&self, _response: &Value) -> bool {
            false
        }
        fn extract_text_content(&self, response: &Value) -> String {
            response["text"].as_str().unwrap_or_default().to_string()
        }
        fn extract_token_usage(&self, _response: &Value) -> shellwright_core::TokenUsage {
            Default::default()
        }
    }

    fn history() -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::user("add a --verbose flag"),
            Message::assistant("Done."),
        ]
    }

    #[tokio::test]
    async fn summary_request_disables_tools() {
        let provider = RecordingProvider {
            response: json!({"text": "Goal: add a flag"}),
            seen: Mutex::new(Vec::new()),
        };
        let summary = summarize_history(&provider, &TextAdapter, &history(), &SendOptions::new("m", 1024))
            .await
            .unwrap();
        assert_eq!(summary, "Goal: add a flag");
        assert_eq!(provider.seen.lock().unwrap().as_slice(), &[(4, 0)]);
    }

    #[tokio::test]
    async fn empty_summary_is_an_error() {
        let provider = RecordingProvider {
            response: json!({}),
            seen: Mutex::new(Vec::new()),
        };
        let result = summarize_history(&provider, &TextAdapter, &history(), &SendOptions::new("m", 1024)).await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn rebuild_keeps_system_and_yields_three_messages() {
        let rebuilt = rebuild_from_summary(&history(), "Goal: add a flag");
        assert_eq!(rebuilt.len(), 3);
        assert_eq!(rebuilt[0], Message::system("sys"));
        assert!(rebuilt[1].is_user());
        assert!(rebuilt[1].text().contains("Goal: add a flag"));
        assert!(rebuilt[2].is_assistant());
    }

    #[test]
    fn rebuild_without_system() {
        let rebuilt = rebuild_from_summary(&[Message::user("hi")], "s");
        assert_eq!(rebuilt.len(), 2);
        assert!(rebuilt[0].is_user());
    }
}
