//! The agent executor — the turn loop.
//!
//! One [`AgentExecutor::execute`] call is one run:
//!
//! 1. **Seed** the conversation (system prompt + query, or extend a history)
//! 2. **Compact** when the context manager says the log is too big
//! 3. **Call** the provider with the full log and the tool declarations
//! 4. **If tool calls**: gate, dispatch and record each one in order, loop
//! 5. **If text only**: that is the final answer
//!
//! A run ends in exactly one of four ways: normal completion, cancellation,
//! a doom-loop stop, or turn-budget exhaustion (which makes one more
//! tool-less call to get a progress summary).

use crate::context::ContextManager;
use crate::doom_loop::{DEFAULT_DOOM_LOOP_THRESHOLD, DoomLoopDetector};
use crate::error::{AgentError, Result};
use crate::event::{AgentEvent, EventSink};
use crate::prompt::{DefaultPromptBuilder, SystemPromptBuilder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shellwright_core::tool::run_tool;
use shellwright_core::{
    CancellationToken, Message, PermissionDecision, PermissionLevel, PromptEnvironment, Provider,
    ProviderAdapter, ProviderError, SendOptions, TokenUsage, ToolCall, ToolContext, ToolRegistry,
    ToolResult,
};
use shellwright_security::PermissionGate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turn budget when neither the run nor the executor sets one.
pub const DEFAULT_MAX_TURNS: u32 = 25;

/// Output token budget per model call.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Final response of a run stopped by the doom-loop detector.
pub const DOOM_LOOP_MESSAGE: &str = "Stopped: repeated identical tool call detected.";

/// Final response when the turn budget ran out and no summary came back.
pub const MAX_STEPS_MESSAGE: &str =
    "Maximum steps reached. The task may be incomplete; ask me to continue where I left off.";

const MAX_TURNS_INSTRUCTION: &str = "[SYSTEM] You have reached the maximum number of steps for this request. \
Do not call any more tools. Summarize what you accomplished, what is still unfinished, \
and what the user should do next.";

/// Asks the user whether a tool call that requires approval may run.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    async fn request(&self, call: &ToolCall) -> PermissionDecision;
}

/// Per-run limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Overrides the executor's turn budget
    pub max_turns: Option<u32>,

    /// Output token budget per model call
    pub max_output_tokens: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

/// Everything one run needs from its caller.
pub struct RunRequest {
    pub query: String,
    pub config: RunConfig,
    pub cancel: CancellationToken,
    pub events: EventSink,
    /// Prior conversation to extend; a fresh one is seeded when absent
    pub history: Option<Vec<Message>>,
    /// Interactive approval for `ask` tools; without one they run
    pub permission_prompt: Option<Arc<dyn PermissionPrompt>>,
}

impl RunRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            config: RunConfig::default(),
            cancel: CancellationToken::new(),
            events: EventSink::noop(),
            history: None,
            permission_prompt: None,
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_permission_prompt(mut self, prompt: Arc<dyn PermissionPrompt>) -> Self {
        self.permission_prompt = Some(prompt);
        self
    }
}

/// Token and turn counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeUsage {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Provider calls made, including the max-turns summary call
    pub turns: u32,
}

impl CumulativeUsage {
    /// Fold in one provider call.
    pub fn record(&mut self, usage: TokenUsage) {
        self.total_input_tokens += usage.input_tokens;
        self.total_output_tokens += usage.output_tokens;
        self.turns += 1;
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model answered without requesting tools
    Completed,
    /// The cancellation token fired
    Aborted,
    /// The same tool call repeated too many times
    DoomLoop,
    /// The turn budget ran out
    MaxTurns,
}

/// Result of a run. The conversation is handed back for the caller to keep.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub final_response: String,
    pub usage: CumulativeUsage,
    pub stop: StopReason,
    pub messages: Vec<Message>,
}

enum Dispatch {
    Finished(ToolResult),
    Aborted,
}

/// Drives a provider through tool-calling turns.
pub struct AgentExecutor {
    provider: Arc<dyn Provider>,
    adapter: Arc<dyn ProviderAdapter>,
    registry: Arc<ToolRegistry>,
    gate: Arc<PermissionGate>,
    context: ContextManager,
    prompt_builder: Arc<dyn SystemPromptBuilder>,
    workspace: ToolContext,
    doom_loop_threshold: usize,
    max_turns: u32,
    model: String,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn Provider>,
        adapter: Arc<dyn ProviderAdapter>,
        registry: Arc<ToolRegistry>,
        gate: Arc<PermissionGate>,
        context: ContextManager,
    ) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        Self {
            provider,
            adapter,
            registry,
            gate,
            context,
            prompt_builder: Arc::new(DefaultPromptBuilder::new()),
            workspace: ToolContext::new(cwd),
            doom_loop_threshold: DEFAULT_DOOM_LOOP_THRESHOLD,
            max_turns: DEFAULT_MAX_TURNS,
            model: String::new(),
        }
    }

    pub fn with_prompt_builder(mut self, builder: Arc<dyn SystemPromptBuilder>) -> Self {
        self.prompt_builder = builder;
        self
    }

    /// Project root, working directory and shell handed to every tool.
    /// The context's own cancellation token is replaced per run.
    pub fn with_workspace(mut self, workspace: ToolContext) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_doom_loop_threshold(mut self, threshold: usize) -> Self {
        self.doom_loop_threshold = threshold;
        self
    }

    /// Turn budget for runs whose config does not set one.
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The system prompt a fresh run starts with.
    pub fn system_prompt(&self) -> String {
        let env = PromptEnvironment::new(
            self.workspace.shell.clone(),
            self.workspace.cwd.clone(),
            self.model.clone(),
            self.provider.name(),
        );
        self.prompt_builder.build(&env)
    }

    /// Run one query to a terminal outcome.
    ///
    /// Fails only when a model call inside the loop fails; everything else
    /// (tool errors, denials, doom loops, budget exhaustion, cancellation)
    /// ends in an `Ok` outcome.
    pub async fn execute(&self, request: RunRequest) -> Result<RunOutcome> {
        let RunRequest {
            query,
            config,
            cancel,
            events,
            history,
            permission_prompt,
        } = request;

        let mut messages = match history {
            Some(mut history) => {
                if history.iter().skip(1).any(Message::is_system) {
                    return Err(AgentError::InvalidHistory(
                        "system message must be the first message".into(),
                    ));
                }
                history.push(Message::user(query));
                history
            }
            None => vec![Message::system(self.system_prompt()), Message::user(query)],
        };

        let tools = self.adapter.format_tools(&self.registry.to_provider_schema());
        let tool_ctx = self.workspace.clone().with_cancel(cancel.clone());
        let options = SendOptions::new(&self.model, config.max_output_tokens).with_cancel(cancel.clone());
        let max_turns = config.max_turns.unwrap_or(self.max_turns).max(1);
        let prompt = permission_prompt.as_deref();

        let mut usage = CumulativeUsage::default();
        let mut doom = DoomLoopDetector::new(self.doom_loop_threshold);

        info!(
            provider = %self.provider.name(),
            model = %self.model,
            max_turns,
            tools = tools.len(),
            "Starting run"
        );

        for _ in 0..max_turns {
            if cancel.is_cancelled() {
                return Ok(aborted(&events, usage, messages));
            }

            if self.context.should_compact(&messages) {
                messages = self.context.compact(&messages);
            }

            debug!(turn = usage.turns + 1, messages = messages.len(), "Agent turn");

            let response = match self.provider.send_with_tools(&messages, &tools, &options).await {
                Ok(response) => response,
                Err(ProviderError::Cancelled) if cancel.is_cancelled() => {
                    return Ok(aborted(&events, usage, messages));
                }
                Err(e) => {
                    warn!(error = %e, "Provider call failed");
                    events.emit(AgentEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

            usage.record(self.adapter.extract_token_usage(&response));
            let turn = usage.turns;

            let text = self.adapter.extract_text_content(&response);
            if !text.is_empty() {
                events.emit(AgentEvent::TextDelta { text: text.clone() });
            }

            if !self.adapter.is_tool_call_response(&response) {
                events.emit(AgentEvent::TurnComplete { turn });
                if !text.is_empty() {
                    messages.push(Message::assistant(text.clone()));
                }
                info!(turns = usage.turns, "Run completed");
                return Ok(RunOutcome {
                    final_response: text,
                    usage,
                    stop: StopReason::Completed,
                    messages,
                });
            }

            let calls = self.adapter.parse_tool_calls(&response);
            debug!(turn, tool_count = calls.len(), "Executing tool calls");
            messages.push(Message::assistant_with_tools(text, calls.clone()));

            for call in &calls {
                if cancel.is_cancelled() {
                    return Ok(aborted(&events, usage, messages));
                }

                if doom.record(call) {
                    warn!(tool = %call.name, threshold = doom.threshold(), "Doom loop detected, stopping run");
                    events.emit(AgentEvent::DoomLoop {
                        tool_name: call.name.clone(),
                    });
                    return Ok(RunOutcome {
                        final_response: DOOM_LOOP_MESSAGE.to_string(),
                        usage,
                        stop: StopReason::DoomLoop,
                        messages,
                    });
                }

                events.emit(AgentEvent::ToolStart { call: call.clone() });

                let result = match self.dispatch(call, &tool_ctx, prompt, &cancel).await {
                    Dispatch::Finished(result) => result,
                    Dispatch::Aborted => return Ok(aborted(&events, usage, messages)),
                };

                events.emit(AgentEvent::ToolResult {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    result: result.clone(),
                });
                messages.push(Message::tool_result(&call.id, &call.name, result));
            }

            events.emit(AgentEvent::TurnComplete { turn });
        }

        if cancel.is_cancelled() {
            return Ok(aborted(&events, usage, messages));
        }

        Ok(self
            .summarize_exhausted_run(messages, usage, &options, &events, max_turns)
            .await)
    }

    /// Gate and run one tool call.
    async fn dispatch(
        &self,
        call: &ToolCall,
        ctx: &ToolContext,
        prompt: Option<&dyn PermissionPrompt>,
        cancel: &CancellationToken,
    ) -> Dispatch {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return Dispatch::Finished(ToolResult::error(format!("Unknown tool: {}", call.name)));
        };

        let level = self.gate.check(&call.name, &call.input);
        debug!(tool = %call.name, permission = level.as_str(), "Tool permission");

        match level {
            PermissionLevel::Allow => {}
            PermissionLevel::Deny => {
                let reason = self.gate.denial_reason(&call.name, &call.input);
                info!(tool = %call.name, reason = %reason, "Tool call denied by policy");
                return Dispatch::Finished(ToolResult::denied(reason));
            }
            PermissionLevel::Ask => match prompt {
                Some(prompt) => {
                    let decision = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Dispatch::Aborted,
                        decision = prompt.request(call) => decision,
                    };
                    match decision {
                        PermissionDecision::Approve => {}
                        PermissionDecision::Session => self.gate.approve_for_session(&call.name),
                        PermissionDecision::Deny => {
                            info!(tool = %call.name, "Tool call declined by user");
                            return Dispatch::Finished(ToolResult::denied(format!(
                                "User declined to run {}",
                                call.name
                            )));
                        }
                    }
                }
                None => {
                    warn!(tool = %call.name, "No permission prompt attached; running tool that requires approval");
                }
            },
        }

        let result = run_tool(tool, &call.input, ctx).await;
        debug!(tool = %call.name, status = result.status(), "Tool finished");
        Dispatch::Finished(result)
    }

    /// One last tool-less call asking the model to report progress.
    async fn summarize_exhausted_run(
        &self,
        mut messages: Vec<Message>,
        mut usage: CumulativeUsage,
        options: &SendOptions,
        events: &EventSink,
        max_turns: u32,
    ) -> RunOutcome {
        warn!(max_turns, "Turn budget exhausted, requesting progress summary");
        // Sent with this call only, never kept in the conversation
        let mut request = messages.clone();
        request.push(Message::user(MAX_TURNS_INSTRUCTION));

        let final_response = match self.provider.send_with_tools(&request, &[], options).await {
            Ok(response) => {
                usage.record(self.adapter.extract_token_usage(&response));
                let text = self.adapter.extract_text_content(&response);
                if text.trim().is_empty() {
                    MAX_STEPS_MESSAGE.to_string()
                } else {
                    messages.push(Message::assistant(text.clone()));
                    text
                }
            }
            Err(e) => {
                usage.turns += 1;
                warn!(error = %e, "Progress summary call failed");
                events.emit(AgentEvent::Error {
                    message: e.to_string(),
                });
                MAX_STEPS_MESSAGE.to_string()
            }
        };

        RunOutcome {
            final_response,
            usage,
            stop: StopReason::MaxTurns,
            messages,
        }
    }
}

fn aborted(events: &EventSink, usage: CumulativeUsage, messages: Vec<Message>) -> RunOutcome {
    info!(turns = usage.turns, "Run aborted");
    events.emit(AgentEvent::Aborted);
    RunOutcome {
        final_response: String::new(),
        usage,
        stop: StopReason::Aborted,
        messages,
    }
}
