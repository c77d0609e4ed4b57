//! Configuration loading, validation, and management for Shellwright.
//!
//! Loads configuration from `~/.shellwright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use shellwright_core::PermissionLevel;
use shellwright_security::{PermissionRule, validate_pattern};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.shellwright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key used when a provider has none of its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model; each provider falls back to its own when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Max tokens per model response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Turn loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Context window budget
    #[serde(default)]
    pub context: ContextConfig,

    /// Tool permission policy
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Project the agent works in
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_max_output_tokens() -> u32 {
    8192
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("agent", &self.agent)
            .field("context", &self.context)
            .field("permissions", &self.permissions)
            .field("providers", &self.providers)
            .field("workspace", &self.workspace)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Turn budget per run
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Identical consecutive tool calls that stop the run
    #[serde(default = "default_doom_loop_threshold")]
    pub doom_loop_threshold: usize,
}

fn default_max_turns() -> u32 {
    25
}
fn default_doom_loop_threshold() -> usize {
    3
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            doom_loop_threshold: default_doom_loop_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Model context window, in tokens
    #[serde(default = "default_token_limit")]
    pub token_limit: u64,

    /// Tokens held back for the model's answer
    #[serde(default = "default_output_reserve_tokens")]
    pub output_reserve_tokens: u64,

    /// Fraction of the usable window that triggers compaction
    #[serde(default = "default_compaction_ratio")]
    pub compaction_ratio: f64,
}

fn default_token_limit() -> u64 {
    200_000
}
fn default_output_reserve_tokens() -> u64 {
    8192
}
fn default_compaction_ratio() -> f64 {
    0.8
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_limit: default_token_limit(),
            output_reserve_tokens: default_output_reserve_tokens(),
            compaction_ratio: default_compaction_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Tool whose `command` input is matched against rules
    #[serde(default = "default_shell_tool")]
    pub shell_tool: String,

    /// Ordered rules; first match wins
    #[serde(default)]
    pub rules: Vec<PermissionRule>,

    /// Per-tool default overrides
    #[serde(default)]
    pub defaults: HashMap<String, PermissionLevel>,
}

fn default_shell_tool() -> String {
    "shell".into()
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            shell_tool: default_shell_tool(),
            rules: Vec::new(),
            defaults: HashMap::new(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Project root; the current directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
}

/// Vendor-specific API key variables, filled into `[providers.<name>]`.
const VENDOR_KEY_VARS: &[(&str, &str)] = &[
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
];

impl AppConfig {
    /// Load configuration from the default path (~/.shellwright/config.toml).
    ///
    /// Environment variables override the file:
    /// - `SHELLWRIGHT_API_KEY` (shared key, when the file sets none)
    /// - `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, `OPENROUTER_API_KEY`
    ///   (per-provider keys, when the provider entry sets none)
    /// - `SHELLWRIGHT_PROVIDER`, `SHELLWRIGHT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through an injected lookup.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = env("SHELLWRIGHT_API_KEY");
        }

        for (provider, var) in VENDOR_KEY_VARS {
            if let Some(key) = env(var) {
                let entry = self.providers.entry((*provider).to_string()).or_default();
                if entry.api_key.is_none() {
                    entry.api_key = Some(key);
                }
            }
        }

        if let Some(provider) = env("SHELLWRIGHT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = env("SHELLWRIGHT_MODEL") {
            self.default_model = Some(model);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".shellwright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ctx = &self.context;
        if !(ctx.compaction_ratio > 0.0 && ctx.compaction_ratio <= 1.0) {
            return Err(ConfigError::ValidationError(
                "context.compaction_ratio must be in (0, 1]".into(),
            ));
        }

        if ctx.output_reserve_tokens >= ctx.token_limit {
            return Err(ConfigError::ValidationError(
                "context.output_reserve_tokens must be less than context.token_limit".into(),
            ));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".into(),
            ));
        }

        if self.agent.doom_loop_threshold < 2 {
            return Err(ConfigError::ValidationError(
                "agent.doom_loop_threshold must be at least 2".into(),
            ));
        }

        for rule in &self.permissions.rules {
            validate_pattern(&rule.pattern)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }

    /// API key for a provider: its own entry first, then the shared key.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Model for a provider: its own entry first, then the global default.
    pub fn model_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.default_model.clone())
            .or_else(|| self.default_model.clone())
    }

    /// Check if an API key is available for the default provider.
    pub fn has_api_key(&self) -> bool {
        self.api_key_for(&self.default_provider).is_some()
    }

    /// The project root, falling back to the current directory.
    pub fn project_root(&self) -> PathBuf {
        self.workspace
            .project_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: None,
            max_output_tokens: default_max_output_tokens(),
            agent: AgentConfig::default(),
            context: ContextConfig::default(),
            permissions: PermissionsConfig::default(),
            providers: HashMap::new(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
