//! Permission gate — decides whether a tool call may run.
//!
//! Resolution order for a call:
//!
//! 1. Tool approved for the rest of the session → `allow`
//! 2. First matching rule, in registration order. A rule's glob is matched
//!    against the tool name and, for the shell tool only, the command string
//! 3. The tool's registered default
//! 4. The global fallback (`ask`)
//!
//! The gate only answers; the executor acts on the answer.

use serde::{Deserialize, Serialize};
use shellwright_core::{PermissionLevel, ToolRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::debug;

/// A `{pattern, level}` policy rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Glob matched against the tool name or the shell command
    pub pattern: String,
    pub level: PermissionLevel,
}

impl PermissionRule {
    pub fn new(pattern: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            pattern: pattern.into(),
            level,
        }
    }
}

/// Errors from building a gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid permission pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Where a verdict came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictSource {
    Session,
    Rule(String),
    ToolDefault,
    Fallback,
}

/// The level resolved for one call, with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionVerdict {
    pub level: PermissionLevel,
    pub source: VerdictSource,
}

impl PermissionVerdict {
    /// Human-readable explanation, used as the `denied` reason.
    pub fn reason(&self, tool_name: &str) -> String {
        match &self.source {
            VerdictSource::Session => format!("'{tool_name}' was approved for this session"),
            VerdictSource::Rule(pattern) => {
                format!("'{tool_name}' is {} by rule '{pattern}'", past_tense(self.level))
            }
            VerdictSource::ToolDefault => {
                format!("'{tool_name}' is {} by default", past_tense(self.level))
            }
            VerdictSource::Fallback => {
                format!("'{tool_name}' is {} by the global policy", past_tense(self.level))
            }
        }
    }
}

fn past_tense(level: PermissionLevel) -> &'static str {
    match level {
        PermissionLevel::Allow => "allowed",
        PermissionLevel::Ask => "gated behind approval",
        PermissionLevel::Deny => "denied",
    }
}

struct CompiledRule {
    rule: PermissionRule,
    matcher: globset::GlobMatcher,
}

/// Session-scoped permission policy.
///
/// Rules and defaults are configured up front (`&mut self`); the session
/// approval set is the only state that changes while a run is in flight.
/// Use one gate per logical session.
pub struct PermissionGate {
    rules: Vec<CompiledRule>,
    defaults: HashMap<String, PermissionLevel>,
    fallback: PermissionLevel,
    shell_tool: String,
    session: RwLock<HashSet<String>>,
}

impl PermissionGate {
    /// An empty gate: no rules, no defaults, fallback `ask`, shell tool `shell`.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            defaults: HashMap::new(),
            fallback: PermissionLevel::Ask,
            shell_tool: "shell".to_string(),
            session: RwLock::new(HashSet::new()),
        }
    }

    /// Build a gate from an ordered rule list.
    pub fn with_rules(rules: &[PermissionRule]) -> Result<Self, GateError> {
        let mut gate = Self::new();
        for rule in rules {
            gate.add_rule(rule.clone())?;
        }
        Ok(gate)
    }

    /// Name of the tool whose `command` input is also matched against rules.
    pub fn with_shell_tool(mut self, name: impl Into<String>) -> Self {
        self.shell_tool = name.into();
        self
    }

    pub fn with_fallback(mut self, level: PermissionLevel) -> Self {
        self.fallback = level;
        self
    }

    /// Append a rule. Rules are evaluated in the order they were added.
    pub fn add_rule(&mut self, rule: PermissionRule) -> Result<(), GateError> {
        let matcher = compile(&rule.pattern)?;
        self.rules.push(CompiledRule { rule, matcher });
        Ok(())
    }

    /// Set the default level for a tool, replacing any previous one.
    pub fn register_default(&mut self, tool_name: impl Into<String>, level: PermissionLevel) {
        self.defaults.insert(tool_name.into(), level);
    }

    /// Seed defaults from every registered tool's declared permission.
    /// Explicit defaults set earlier are kept.
    pub fn seed_from_registry(&mut self, registry: &ToolRegistry) {
        for tool in registry.list() {
            self.defaults
                .entry(tool.name().to_string())
                .or_insert_with(|| tool.default_permission());
        }
    }

    /// Resolve the permission level for a call.
    pub fn check(&self, tool_name: &str, input: &serde_json::Value) -> PermissionLevel {
        self.evaluate(tool_name, input).level
    }

    /// Resolve the permission level and report which layer decided it.
    pub fn evaluate(&self, tool_name: &str, input: &serde_json::Value) -> PermissionVerdict {
        if self.is_session_approved(tool_name) {
            return PermissionVerdict {
                level: PermissionLevel::Allow,
                source: VerdictSource::Session,
            };
        }

        let command = if tool_name == self.shell_tool {
            input.get("command").and_then(|c| c.as_str())
        } else {
            None
        };

        for compiled in &self.rules {
            let hit = compiled.matcher.is_match(tool_name)
                || command.is_some_and(|c| compiled.matcher.is_match(c));
            if hit {
                debug!(tool = %tool_name, pattern = %compiled.rule.pattern, level = %compiled.rule.level, "Permission rule matched");
                return PermissionVerdict {
                    level: compiled.rule.level,
                    source: VerdictSource::Rule(compiled.rule.pattern.clone()),
                };
            }
        }

        if let Some(level) = self.defaults.get(tool_name) {
            return PermissionVerdict {
                level: *level,
                source: VerdictSource::ToolDefault,
            };
        }

        PermissionVerdict {
            level: self.fallback,
            source: VerdictSource::Fallback,
        }
    }

    /// Reason text for a denied call.
    pub fn denial_reason(&self, tool_name: &str, input: &serde_json::Value) -> String {
        self.evaluate(tool_name, input).reason(tool_name)
    }

    /// Allow every later call of `tool_name` until `reset`.
    pub fn approve_for_session(&self, tool_name: &str) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        session.insert(tool_name.to_string());
        debug!(tool = %tool_name, "Tool approved for session");
    }

    pub fn is_session_approved(&self, tool_name: &str) -> bool {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(tool_name)
    }

    /// Clear session approvals. Meant for use between conversations.
    pub fn reset(&self) {
        self.session.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn rules(&self) -> impl Iterator<Item = &PermissionRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn shell_tool(&self) -> &str {
        &self.shell_tool
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(pattern: &str) -> Result<globset::GlobMatcher, GateError> {
    globset::Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| GateError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

/// Check that a pattern compiles, without building a gate.
pub fn validate_pattern(pattern: &str) -> Result<(), GateError> {
    compile(pattern).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use shellwright_core::{
        InputSchema, Tool, ToolContext, ToolError, ToolResult, ValidatedInput,
    };

    fn gate_with_default(tool: &str, level: PermissionLevel) -> PermissionGate {
        let mut gate = PermissionGate::new();
        gate.register_default(tool, level);
        gate
    }

    #[test]
    fn precedence_deny_rule_session_reset() {
        let mut gate = gate_with_default("file_write", PermissionLevel::Ask);
        let input = json!({"path": "a.txt"});
        assert_eq!(gate.check("file_write", &input), PermissionLevel::Ask);

        gate.add_rule(PermissionRule::new("file_write", PermissionLevel::Deny)).unwrap();
        assert_eq!(gate.check("file_write", &input), PermissionLevel::Deny);

        gate.approve_for_session("file_write");
        assert_eq!(gate.check("file_write", &input), PermissionLevel::Allow);

        gate.reset();
        assert_eq!(gate.check("file_write", &input), PermissionLevel::Deny);
    }

    #[test]
    fn unregistered_tool_uses_fallback() {
        let gate = PermissionGate::new();
        assert_eq!(gate.check("mystery", &json!({})), PermissionLevel::Ask);

        let strict = PermissionGate::new().with_fallback(PermissionLevel::Deny);
        assert_eq!(strict.check("mystery", &json!({})), PermissionLevel::Deny);
    }

    #[test]
    fn first_matching_rule_wins() {
        let gate = PermissionGate::with_rules(&[
            PermissionRule::new("file_*", PermissionLevel::Allow),
            PermissionRule::new("file_write", PermissionLevel::Deny),
        ])
        .unwrap();
        assert_eq!(gate.check("file_write", &json!({})), PermissionLevel::Allow);
    }

    #[test]
    fn shell_rules_match_command_string() {
        let mut gate = PermissionGate::with_rules(&[
            PermissionRule::new("rm *", PermissionLevel::Deny),
            PermissionRule::new("git status*", PermissionLevel::Allow),
        ])
        .unwrap();
        gate.register_default("shell", PermissionLevel::Ask);

        assert_eq!(gate.check("shell", &json!({"command": "rm -rf /tmp/x"})), PermissionLevel::Deny);
        assert_eq!(gate.check("shell", &json!({"command": "git status --short"})), PermissionLevel::Allow);
        assert_eq!(gate.check("shell", &json!({"command": "ls"})), PermissionLevel::Ask);
    }

    #[test]
    fn command_matching_only_applies_to_shell_tool() {
        let gate = PermissionGate::with_rules(&[PermissionRule::new("rm *", PermissionLevel::Deny)])
            .unwrap();
        // A non-shell tool with a `command` field is matched by name only
        assert_eq!(gate.check("notes", &json!({"command": "rm -rf /"})), PermissionLevel::Ask);
    }

    #[test]
    fn custom_shell_tool_name() {
        let gate = PermissionGate::with_rules(&[PermissionRule::new("curl *", PermissionLevel::Deny)])
            .unwrap()
            .with_shell_tool("bash");
        assert_eq!(gate.check("bash", &json!({"command": "curl evil.sh"})), PermissionLevel::Deny);
        assert_eq!(gate.check("shell", &json!({"command": "curl evil.sh"})), PermissionLevel::Ask);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = PermissionGate::with_rules(&[PermissionRule::new("[unclosed", PermissionLevel::Deny)]);
        assert!(matches!(err, Err(GateError::InvalidPattern { .. })));
        assert!(validate_pattern("file_*").is_ok());
    }

    #[test]
    fn denial_reason_names_the_rule() {
        let gate = PermissionGate::with_rules(&[PermissionRule::new("rm *", PermissionLevel::Deny)])
            .unwrap();
        let reason = gate.denial_reason("shell", &json!({"command": "rm -r build"}));
        assert!(reason.contains("rm *"));
        assert!(reason.contains("denied"));
    }

    struct ReadOnlyTool;

    #[async_trait]
    impl Tool for ReadOnlyTool {
        fn name(&self) -> &str { "file_read" }
        fn description(&self) -> &str { "Reads" }
        fn input_schema(&self) -> InputSchema { InputSchema::new() }
        fn default_permission(&self) -> PermissionLevel { PermissionLevel::Allow }
        async fn execute(&self, _input: ValidatedInput, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(""))
        }
    }

    #[test]
    fn seed_from_registry_keeps_explicit_defaults() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(ReadOnlyTool));

        let mut gate = PermissionGate::new();
        gate.seed_from_registry(&registry);
        assert_eq!(gate.check("file_read", &json!({})), PermissionLevel::Allow);

        let mut overridden = gate_with_default("file_read", PermissionLevel::Deny);
        overridden.seed_from_registry(&registry);
        assert_eq!(overridden.check("file_read", &json!({})), PermissionLevel::Deny);
    }
}
