//! End-to-end integration tests for the Shellwright agent.
//!
//! These tests exercise the full pipeline from a user request to the final
//! answer: provider dialects, the permission gate, the real built-in tools
//! on a temporary project, compaction, and summarization.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use shellwright_agent::{
    AgentEvent, AgentExecutor, ContextManager, DOOM_LOOP_MESSAGE, EventSink, PermissionPrompt,
    RunOutcome, RunRequest, StaticPrompt, StopReason, rebuild_from_summary, summarize_history,
};
use shellwright_config::{AppConfig, ContextConfig};
use shellwright_core::{
    Message, PermissionDecision, PermissionLevel, Provider, ProviderAdapter, ProviderError,
    SendOptions, ToolCall, ToolContext, ToolResult,
};
use shellwright_providers::{AnthropicAdapter, OpenAiAdapter};
use shellwright_security::{PermissionGate, PermissionRule};
use shellwright_tools::default_registry;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted raw responses in sequence and
/// records every conversation it was sent.
struct ScriptedProvider {
    responses: std::sync::Mutex<Vec<Value>>,
    requests: std::sync::Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses),
            requests: std::sync::Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn send_with_tools(
        &self,
        messages: &[Message],
        _tools: &[Value],
        _options: &SendOptions,
    ) -> Result<Value, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                index,
                responses.len()
            );
        }
        requests.push(messages.to_vec());
        Ok(responses[index].clone())
    }
}

// ── Wire-shape helpers ───────────────────────────────────────────────────

fn anthropic_text(text: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
}

fn anthropic_tool(id: &str, name: &str, input: Value) -> Value {
    json!({
        "content": [{"type": "tool_use", "id": id, "name": name, "input": input}],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 20, "output_tokens": 8}
    })
}

fn openai_text(text: &str) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4}
    })
}

fn openai_tool(id: &str, name: &str, arguments: &str) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": arguments}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 30, "completion_tokens": 9}
    })
}

// ── Harness ──────────────────────────────────────────────────────────────

/// Answers every approval request with the same decision and counts them.
struct FixedPrompt {
    decision: PermissionDecision,
    asked: AtomicUsize,
}

impl FixedPrompt {
    fn new(decision: PermissionDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            asked: AtomicUsize::new(0),
        })
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PermissionPrompt for FixedPrompt {
    async fn request(&self, _call: &ToolCall) -> PermissionDecision {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}

fn executor(
    provider: Arc<ScriptedProvider>,
    adapter: Arc<dyn ProviderAdapter>,
    root: &std::path::Path,
    rules: &[PermissionRule],
) -> AgentExecutor {
    let registry = default_registry();
    let mut gate = PermissionGate::with_rules(rules).unwrap();
    gate.seed_from_registry(&registry);

    AgentExecutor::new(
        provider,
        adapter,
        Arc::new(registry),
        Arc::new(gate),
        ContextManager::default(),
    )
    .with_prompt_builder(Arc::new(StaticPrompt("You are a test agent.".into())))
    .with_workspace(ToolContext::new(root))
    .with_model("e2e-model")
}

fn tool_results(outcome: &RunOutcome) -> Vec<(String, ToolResult)> {
    outcome
        .messages
        .iter()
        .filter_map(|m| match m {
            Message::ToolResult {
                tool_name, result, ..
            } => Some((tool_name.clone(), result.clone())),
            _ => None,
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 1: Anthropic dialect — write, read back, answer
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_anthropic_write_then_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        anthropic_tool(
            "t1",
            "file_write",
            json!({"path": "notes/todo.txt", "content": "ship it"}),
        ),
        anthropic_tool("t2", "file_read", json!({"path": "notes/todo.txt"})),
        anthropic_text("The file says: ship it"),
    ]);
    let prompt = FixedPrompt::new(PermissionDecision::Approve);
    let agent = executor(provider.clone(), Arc::new(AnthropicAdapter), dir.path(), &[]);

    let outcome = agent
        .execute(RunRequest::new("write a todo and read it back").with_permission_prompt(prompt.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::Completed);
    assert_eq!(outcome.final_response, "The file says: ship it");
    assert_eq!(outcome.usage.turns, 3);
    assert_eq!(outcome.usage.total_input_tokens, 50);
    assert_eq!(provider.calls(), 3);

    // file_write asks, file_read is allowed by default
    assert_eq!(prompt.asked(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes/todo.txt")).unwrap(),
        "ship it"
    );

    let results = tool_results(&outcome);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "file_write");
    assert!(results[0].1.is_success());
    assert_eq!(results[1], ("file_read".to_string(), ToolResult::success("ship it")));

    // The second model call sees the first tool result
    let second = provider.request(1);
    assert!(matches!(second.last(), Some(Message::ToolResult { tool_call_id, .. }) if tool_call_id == "t1"));
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 2: OpenAI dialect — JSON-string arguments, list a directory
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_openai_list_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();

    let provider = ScriptedProvider::new(vec![
        openai_tool("call_1", "list_dir", "{\"path\": \".\"}"),
        openai_text("There is a Cargo.toml and a src directory."),
    ]);
    let agent = executor(provider.clone(), Arc::new(OpenAiAdapter), dir.path(), &[]);

    let outcome = agent.execute(RunRequest::new("what is here?")).await.unwrap();

    assert_eq!(outcome.stop, StopReason::Completed);
    assert_eq!(
        tool_results(&outcome),
        vec![("list_dir".to_string(), ToolResult::success("Cargo.toml\nsrc/"))]
    );
    assert_eq!(outcome.usage.total_input_tokens, 42);
    assert_eq!(outcome.usage.total_output_tokens, 13);
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 3: Deny rule blocks the shell before anything runs
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_deny_rule_blocks_shell() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("keep.txt"), "data").unwrap();

    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "shell", json!({"command": "rm keep.txt"})),
        anthropic_text("I was not allowed to delete it."),
    ]);
    let prompt = FixedPrompt::new(PermissionDecision::Approve);
    let rules = [PermissionRule::new("rm *", PermissionLevel::Deny)];
    let agent = executor(provider, Arc::new(AnthropicAdapter), dir.path(), &rules);

    let outcome = agent
        .execute(RunRequest::new("delete keep.txt").with_permission_prompt(prompt.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::Completed);
    assert_eq!(prompt.asked(), 0);
    assert!(dir.path().join("keep.txt").exists());

    let results = tool_results(&outcome);
    assert_eq!(results[0].1.status(), "denied");
    assert!(results[0].1.payload().contains("rule 'rm *'"));
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 4: File tools cannot escape the project root
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_path_escape_is_rejected() {
    let outer = tempfile::tempdir().unwrap();
    std::fs::write(outer.path().join("secret.txt"), "hunter2").unwrap();
    let project = outer.path().join("project");
    std::fs::create_dir(&project).unwrap();

    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "file_read", json!({"path": "../secret.txt"})),
        anthropic_text("I can't read files outside the project."),
    ]);
    let agent = executor(provider, Arc::new(AnthropicAdapter), &project, &[]);

    let outcome = agent.execute(RunRequest::new("read ../secret.txt")).await.unwrap();

    let results = tool_results(&outcome);
    assert_eq!(results[0].1.status(), "error");
    assert!(!results[0].1.payload().contains("hunter2"));
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 5: Session approval is asked once per tool
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_session_approval_skips_later_prompts() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "file_write", json!({"path": "a.txt", "content": "a"})),
        anthropic_tool("t2", "file_write", json!({"path": "b.txt", "content": "b"})),
        anthropic_text("Both written."),
    ]);
    let prompt = FixedPrompt::new(PermissionDecision::Session);
    let agent = executor(provider, Arc::new(AnthropicAdapter), dir.path(), &[]);

    let outcome = agent
        .execute(RunRequest::new("write two files").with_permission_prompt(prompt.clone()))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::Completed);
    assert_eq!(prompt.asked(), 1);
    assert!(agent.gate().is_session_approved("file_write"));
    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 6: Declined approval is fed back to the model
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_declined_write_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "file_write", json!({"path": "a.txt", "content": "a"})),
        anthropic_text("Okay, I won't write it."),
    ]);
    let prompt = FixedPrompt::new(PermissionDecision::Deny);
    let agent = executor(provider, Arc::new(AnthropicAdapter), dir.path(), &[]);

    let outcome = agent
        .execute(RunRequest::new("write a file").with_permission_prompt(prompt))
        .await
        .unwrap();

    assert!(!dir.path().join("a.txt").exists());
    assert_eq!(tool_results(&outcome)[0].1.status(), "denied");
    assert_eq!(outcome.final_response, "Okay, I won't write it.");
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 7: Without a prompt, approval-gated tools proceed
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_non_interactive_ask_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "file_write", json!({"path": "out.txt", "content": "hello"})),
        anthropic_text("Written."),
    ]);
    let agent = executor(provider, Arc::new(AnthropicAdapter), dir.path(), &[]);

    let outcome = agent.execute(RunRequest::new("write out.txt")).await.unwrap();

    assert_eq!(outcome.stop, StopReason::Completed);
    assert_eq!(std::fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hello");
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 8: Shell tool through an allow rule
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(unix)]
#[tokio::test]
async fn e2e_shell_allowed_by_rule() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "shell", json!({"command": "echo hello"})),
        anthropic_text("It printed hello."),
    ]);
    let prompt = FixedPrompt::new(PermissionDecision::Deny);
    let rules = [PermissionRule::new("echo *", PermissionLevel::Allow)];
    let agent = executor(provider, Arc::new(AnthropicAdapter), dir.path(), &rules);

    let outcome = agent
        .execute(RunRequest::new("say hello").with_permission_prompt(prompt.clone()))
        .await
        .unwrap();

    assert_eq!(prompt.asked(), 0);
    let results = tool_results(&outcome);
    assert!(results[0].1.is_success());
    assert_eq!(results[0].1.payload().trim(), "hello");
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 9: Repeating the same call stops the run
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_doom_loop_with_real_tool() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![
        anthropic_tool("t1", "list_dir", json!({"path": "."})),
        anthropic_tool("t2", "list_dir", json!({"path": "."})),
        anthropic_tool("t3", "list_dir", json!({"path": "."})),
    ]);
    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = {
        let events = Arc::clone(&events);
        EventSink::new(move |e| events.lock().unwrap().push(e))
    };
    let agent = executor(provider.clone(), Arc::new(AnthropicAdapter), dir.path(), &[]);

    let outcome = agent
        .execute(RunRequest::new("look around").with_events(sink))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::DoomLoop);
    assert_eq!(outcome.final_response, DOOM_LOOP_MESSAGE);
    assert_eq!(provider.calls(), 3);
    assert!(
        events
            .lock()
            .unwrap()
            .contains(&AgentEvent::DoomLoop { tool_name: "list_dir".into() })
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 10: An oversized history is compacted before the model call
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_compaction_before_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(vec![anthropic_text("Continuing.")]);

    let mut history = vec![
        Message::system("You are a test agent."),
        Message::user("start the refactor"),
    ];
    for i in 0..6 {
        history.push(Message::assistant(format!("step {i}: {}", "x".repeat(400))));
        history.push(Message::user(format!("keep going {i}")));
    }
    let original_len = history.len();

    let context = ContextManager::new(ContextConfig {
        token_limit: 1_000,
        output_reserve_tokens: 100,
        compaction_ratio: 0.5,
    });
    let registry = default_registry();
    let mut gate = PermissionGate::new();
    gate.seed_from_registry(&registry);
    let agent = AgentExecutor::new(
        provider.clone(),
        Arc::new(AnthropicAdapter),
        Arc::new(registry),
        Arc::new(gate),
        context,
    )
    .with_workspace(ToolContext::new(dir.path()))
    .with_model("e2e-model");

    let outcome = agent
        .execute(RunRequest::new("next").with_history(history))
        .await
        .unwrap();

    assert_eq!(outcome.stop, StopReason::Completed);
    let sent = provider.request(0);
    assert!(sent.len() < original_len + 1);
    assert!(sent[0].is_system());
    assert_eq!(sent[1].text(), "start the refactor");
    assert!(sent[2].text().starts_with("[Earlier conversation compacted"));
    assert_eq!(sent.last().unwrap().text(), "next");
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 11: Deep summarization rebuilds a resumable history
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_summarize_and_resume() {
    let provider = ScriptedProvider::new(vec![
        openai_text("1. Primary Request: rename the crate"),
        openai_text("Picking up where we left off."),
    ]);
    let history = vec![
        Message::system("You are a test agent."),
        Message::user("rename the crate"),
        Message::assistant("Working on it."),
    ];

    let options = SendOptions::new("e2e-model", 1024);
    let summary = summarize_history(provider.as_ref(), &OpenAiAdapter, &history, &options)
        .await
        .unwrap();
    let rebuilt = rebuild_from_summary(&history, &summary);

    assert_eq!(rebuilt.len(), 3);
    assert!(rebuilt[1].text().contains("rename the crate"));

    let dir = tempfile::tempdir().unwrap();
    let agent = executor(provider.clone(), Arc::new(OpenAiAdapter), dir.path(), &[]);
    let outcome = agent
        .execute(RunRequest::new("continue").with_history(rebuilt))
        .await
        .unwrap();

    assert_eq!(outcome.final_response, "Picking up where we left off.");
    assert_eq!(provider.request(1).len(), 4);
}

// ═══════════════════════════════════════════════════════════════════════════
// E2E Test 12: Default config wires into a working gate
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn e2e_config_defaults_and_validation() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());

    let registry = default_registry();
    let mut gate = PermissionGate::with_rules(&config.permissions.rules)
        .unwrap()
        .with_shell_tool(config.permissions.shell_tool.clone());
    gate.seed_from_registry(&registry);

    assert_eq!(gate.check("shell", &json!({"command": "ls"})), PermissionLevel::Ask);
    assert_eq!(gate.check("list_dir", &json!({})), PermissionLevel::Allow);

    let toml_str = AppConfig::default_toml();
    let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed.agent.max_turns, config.agent.max_turns);
}
