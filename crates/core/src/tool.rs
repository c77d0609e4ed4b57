//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! execute shell commands, read/write files, search the project, etc.
//! Every call goes through [`ToolRegistry::execute`], which validates the
//! raw input against the tool's schema and turns every failure mode into a
//! [`ToolResult::Error`] so nothing escapes into the turn loop.

use crate::environment::ShellFlavor;
use crate::error::ToolError;
use crate::message::{ToolCall, ToolResult};
use crate::permission::PermissionLevel;
use crate::schema::{InputSchema, ValidatedInput};
use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Per-invocation configuration handed to a tool. Advisory and read-only.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Root of the project the agent works in
    pub project_root: PathBuf,

    /// Directory relative paths resolve against
    pub cwd: PathBuf,

    /// Shell used for command execution
    pub shell: ShellFlavor,

    /// Fires when the run is cancelled; long operations should stop early
    pub cancel: CancellationToken,
}

impl ToolContext {
    /// A context rooted at `project_root`, with `cwd` set to the same path.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            cwd: project_root.clone(),
            project_root,
            shell: ShellFlavor::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn with_shell(mut self, shell: ShellFlavor) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve a tool-supplied path against the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = PathBuf::from(path);
        if candidate.is_absolute() {
            candidate
        } else {
            self.cwd.join(candidate)
        }
    }
}

/// A tool description in neutral form, ready for an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// `{type: "object", properties: {...}, required: [...]}`
    pub parameters: serde_json::Value,
}

/// The core Tool trait.
///
/// Each tool (shell, file_read, file_write, list_dir, ...) implements this
/// trait and is registered once at startup.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "shell", "file_read").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// Declared input fields.
    fn input_schema(&self) -> InputSchema;

    /// Permission level used when no rule or session approval applies.
    fn default_permission(&self) -> PermissionLevel {
        PermissionLevel::Ask
    }

    /// Execute the tool with an input that already passed `input_schema`.
    async fn execute(
        &self,
        input: ValidatedInput,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a neutral schema for the model.
    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema().to_provider_schema(),
        }
    }
}

/// A registry of available tools, keyed by name, in registration order.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name,
    /// keeping the original registration slot.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => self.tools[slot] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&slot| self.tools[slot].as_ref())
    }

    /// All tools in registration order.
    pub fn list(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    /// All tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Neutral schemas for every tool (for handing to an adapter).
    pub fn to_provider_schema(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.to_schema()).collect()
    }

    /// Execute a tool call. Never fails: unknown tools, invalid input,
    /// tool errors and panics all come back as `ToolResult::Error`.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        match self.get(&call.name) {
            Some(tool) => run_tool(tool, &call.input, ctx).await,
            None => ToolResult::error(format!("Unknown tool: {}", call.name)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate, run, and normalize a single tool invocation.
pub async fn run_tool(tool: &dyn Tool, raw: &serde_json::Value, ctx: &ToolContext) -> ToolResult {
    let input = match tool.input_schema().validate(raw) {
        Ok(input) => input,
        Err(e) => {
            return ToolResult::error(format!("Invalid input for tool '{}': {e}", tool.name()));
        }
    };

    match AssertUnwindSafe(tool.execute(input, ctx)).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => ToolResult::error(e.to_string()),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(tool = %tool.name(), error = %message, "Tool panicked");
            ToolResult::error(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked with a non-string payload".to_string()
    }
}
