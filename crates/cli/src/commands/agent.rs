//! `shellwright agent` — interactive session or single-shot mode.

use async_trait::async_trait;
use shellwright_agent::{
    AgentError, AgentEvent, AgentExecutor, ContextManager, DefaultPromptBuilder, EventSink,
    PermissionPrompt, RunConfig, RunOutcome, RunRequest, StopReason, rebuild_from_summary,
    summarize_history,
};
use shellwright_config::AppConfig;
use shellwright_core::{
    CancellationToken, Message, PermissionDecision, ProviderError, SendOptions, ShellFlavor,
    ToolCall, ToolContext, ToolRegistry,
};
use shellwright_providers::router::{ProviderBinding, build_from_config, is_local};
use shellwright_security::{GateError, PermissionGate, assess_command_risk};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, info};

type StdinLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
}

pub async fn run(
    message: Option<String>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(provider) = &overrides.provider {
        config.default_provider = provider.clone();
    }

    // Check for API key early — give a clear error
    if !config.has_api_key() && !is_local(&config.default_provider) {
        print_missing_key_help(&config.default_provider);
        return Err("No API key found. See above for setup instructions.".into());
    }

    let mut session = Session::from_config(&config, &overrides)?;

    match message {
        Some(msg) => single_shot(&mut session, &msg).await,
        None => interactive(&mut session).await,
    }
}

fn print_missing_key_help(provider: &str) {
    eprintln!();
    eprintln!("  ERROR: No API key configured for provider '{provider}'!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    ANTHROPIC_API_KEY   = 'sk-ant-...'   (for Anthropic)");
    eprintln!("    OPENAI_API_KEY      = 'sk-...'       (for OpenAI)");
    eprintln!("    OPENROUTER_API_KEY  = 'sk-or-v1-...' (for OpenRouter)");
    eprintln!("    SHELLWRIGHT_API_KEY = '...'          (shared fallback)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}

/// One conversation: the executor, the binding it talks to, and the
/// history carried from one request to the next.
pub struct Session {
    executor: AgentExecutor,
    binding: ProviderBinding,
    run_config: RunConfig,
    history: Vec<Message>,
}

impl Session {
    pub fn new(executor: AgentExecutor, binding: ProviderBinding, run_config: RunConfig) -> Self {
        Self {
            executor,
            binding,
            run_config,
            history: Vec::new(),
        }
    }

    /// Wire the default tools, the configured permission policy and the
    /// default provider into a ready session.
    pub fn from_config(
        config: &AppConfig,
        overrides: &Overrides,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let router = build_from_config(config);
        let mut binding = router
            .default_binding()
            .cloned()
            .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;
        if let Some(model) = &overrides.model {
            binding.model = model.clone();
        }

        let registry = shellwright_tools::default_registry();
        let gate = build_gate(config, &registry)?;

        let project_root = config.project_root();
        let cwd = std::env::current_dir().unwrap_or_else(|_| project_root.clone());
        let workspace = ToolContext::new(project_root.clone())
            .with_cwd(cwd)
            .with_shell(ShellFlavor::detect());

        let executor = AgentExecutor::new(
            Arc::clone(&binding.provider),
            Arc::clone(&binding.adapter),
            Arc::new(registry),
            Arc::new(gate),
            ContextManager::new(config.context.clone()),
        )
        .with_prompt_builder(Arc::new(
            DefaultPromptBuilder::new().with_project_root(project_root),
        ))
        .with_workspace(workspace)
        .with_doom_loop_threshold(config.agent.doom_loop_threshold)
        .with_max_turns(config.agent.max_turns)
        .with_model(binding.model.clone());

        let run_config = RunConfig {
            max_turns: overrides.max_turns,
            max_output_tokens: config.max_output_tokens,
        };

        info!(
            provider = %binding.provider.name(),
            model = %binding.model,
            "Session ready"
        );
        Ok(Self::new(executor, binding, run_config))
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn shell_tool(&self) -> &str {
        self.executor.gate().shell_tool()
    }

    /// Run one request on top of the current history.
    ///
    /// Aborted and doom-loop runs leave the history as it was, so the next
    /// request never starts from a half-finished tool exchange.
    pub async fn submit(
        &mut self,
        query: &str,
        events: EventSink,
        prompt: Option<Arc<dyn PermissionPrompt>>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, AgentError> {
        let mut request = RunRequest::new(query)
            .with_config(self.run_config)
            .with_cancel(cancel)
            .with_events(events);
        if !self.history.is_empty() {
            request = request.with_history(self.history.clone());
        }
        if let Some(prompt) = prompt {
            request = request.with_permission_prompt(prompt);
        }

        let outcome = self.executor.execute(request).await?;
        if matches!(outcome.stop, StopReason::Completed | StopReason::MaxTurns) {
            self.history = outcome.messages.clone();
        }
        Ok(outcome)
    }

    /// Replace the history with a model-written summary. Returns the
    /// number of messages that were summarized, `None` when there is
    /// nothing to summarize yet.
    pub async fn compact(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<Option<usize>, ProviderError> {
        if !self.history.iter().any(Message::is_user) {
            return Ok(None);
        }

        let options = SendOptions::new(&self.binding.model, self.run_config.max_output_tokens)
            .with_cancel(cancel);
        let summary = summarize_history(
            self.binding.provider.as_ref(),
            self.binding.adapter.as_ref(),
            &self.history,
            &options,
        )
        .await?;

        let before = self.history.len();
        self.history = rebuild_from_summary(&self.history, &summary);
        Ok(Some(before))
    }

    /// Start over: empty history and no session approvals.
    pub fn clear(&mut self) {
        self.history.clear();
        self.executor.gate().reset();
    }
}

/// Permission gate from `[permissions]`: rules first, then each tool's own
/// default, then per-tool overrides from the config.
pub fn build_gate(config: &AppConfig, registry: &ToolRegistry) -> Result<PermissionGate, GateError> {
    let permissions = &config.permissions;
    let mut gate =
        PermissionGate::with_rules(&permissions.rules)?.with_shell_tool(permissions.shell_tool.clone());
    gate.seed_from_registry(registry);
    for (tool, level) in &permissions.defaults {
        gate.register_default(tool.clone(), *level);
    }
    Ok(gate)
}

async fn single_shot(session: &mut Session, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let result = session.submit(message, event_printer(), None, cancel).await;
    watcher.abort();

    let outcome = result?;
    if outcome.stop == StopReason::Aborted {
        return Err("Cancelled".into());
    }
    println!("{}", outcome.final_response);
    log_usage(&outcome);
    Ok(())
}

async fn interactive(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║      Shellwright Agent — Interactive Mode      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", session.binding.provider.name());
    println!("  Model:     {}", session.binding.model);
    println!("  Shell:     {}", ShellFlavor::detect().description());
    println!();
    println!("  Type your request and press Enter.");
    println!("  /compact summarizes the conversation, /clear starts over.");
    println!("  Ctrl+C cancels a running request. Type 'exit' to quit.");
    println!();

    let input: StdinLines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let prompt: Arc<dyn PermissionPrompt> =
        Arc::new(StdinPrompt::new(Arc::clone(&input), session.shell_tool()));

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = read_line(&input) => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match line.trim() {
            "" => continue,
            "exit" | "quit" | "/exit" => break,
            "/compact" => {
                let cancel = CancellationToken::new();
                let watcher = cancel_on_ctrl_c(cancel.clone());
                match session.compact(cancel).await {
                    Ok(Some(before)) => println!("  [Compacted {before} messages into a summary]"),
                    Ok(None) => println!("  [Nothing to compact yet]"),
                    Err(ProviderError::Cancelled) => println!("  [Compaction cancelled]"),
                    Err(e) => eprintln!("  [Error] {e}"),
                }
                watcher.abort();
                println!();
            }
            "/clear" => {
                let dropped = session.history().len();
                session.clear();
                println!("  [Cleared {dropped} messages]");
                println!();
            }
            query => {
                let cancel = CancellationToken::new();
                let watcher = cancel_on_ctrl_c(cancel.clone());
                let result = session
                    .submit(query, event_printer(), Some(Arc::clone(&prompt)), cancel)
                    .await;
                watcher.abort();

                match result {
                    Ok(outcome) => {
                        println!();
                        for line in outcome.final_response.lines() {
                            println!("  Assistant > {line}");
                        }
                        println!();
                        log_usage(&outcome);
                    }
                    Err(e) => {
                        eprintln!("  [Error] {e}");
                        println!();
                    }
                }
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

async fn read_line(input: &StdinLines) -> std::io::Result<Option<String>> {
    input.lock().await.next_line().await
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    })
}

fn log_usage(outcome: &RunOutcome) {
    debug!(
        turns = outcome.usage.turns,
        input_tokens = outcome.usage.total_input_tokens,
        output_tokens = outcome.usage.total_output_tokens,
        stop = ?outcome.stop,
        "Request finished"
    );
}

/// Renders tool activity on stderr while a request runs.
fn event_printer() -> EventSink {
    EventSink::new(|event| match event {
        AgentEvent::ToolStart { call } => {
            eprintln!("  > {} {}", call.name, preview(&call.input.to_string(), 120));
        }
        AgentEvent::ToolResult {
            tool_name, result, ..
        } => {
            if result.is_success() {
                eprintln!("    {tool_name}: ok");
            } else {
                let first = result.payload().lines().next().unwrap_or_default();
                eprintln!("    {tool_name}: {} ({})", result.status(), preview(first, 120));
            }
        }
        AgentEvent::Error { message } => eprintln!("  [Error] {message}"),
        AgentEvent::DoomLoop { tool_name } => {
            eprintln!("  [Stopped] '{tool_name}' kept repeating the same call");
        }
        AgentEvent::Aborted => eprintln!("  [Cancelled]"),
        _ => {}
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

/// Asks on the terminal before a tool that requires approval runs.
pub struct StdinPrompt {
    input: StdinLines,
    shell_tool: String,
}

impl StdinPrompt {
    fn new(input: StdinLines, shell_tool: &str) -> Self {
        Self {
            input,
            shell_tool: shell_tool.to_string(),
        }
    }

    fn describe(&self, call: &ToolCall) {
        let command = (call.name == self.shell_tool)
            .then(|| call.input.get("command").and_then(|c| c.as_str()))
            .flatten();

        match command {
            Some(command) => {
                eprintln!("  '{}' wants to run:", call.name);
                eprintln!("    $ {command}");
                let risk = assess_command_risk(command);
                if let Some(warning) = risk.warning() {
                    eprintln!("    ! {warning}");
                }
                if risk.destructive {
                    eprintln!("    ! may delete or overwrite data");
                }
            }
            None => {
                eprintln!("  '{}' wants to run with:", call.name);
                eprintln!("    {}", preview(&call.input.to_string(), 400));
            }
        }
    }
}

#[async_trait]
impl PermissionPrompt for StdinPrompt {
    async fn request(&self, call: &ToolCall) -> PermissionDecision {
        eprintln!();
        self.describe(call);
        eprint!("  Allow? [y]es / [n]o / [s]ession > ");
        let _ = std::io::stderr().flush();

        match read_line(&self.input).await {
            Ok(Some(answer)) => parse_decision(&answer),
            _ => PermissionDecision::Deny,
        }
    }
}

fn parse_decision(answer: &str) -> PermissionDecision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => PermissionDecision::Approve,
        "s" | "session" | "always" => PermissionDecision::Session,
        _ => PermissionDecision::Deny,
    }
}
