//! System prompt construction.
//!
//! The executor treats the prompt as an opaque string. The default builder
//! assembles it from sections wrapped in XML-style tags:
//!
//! 1. **Role** — built-in instructions for a coding/command assistant
//! 2. **Environment** — shell, working directory, platform, model, provider
//! 3. **Project instructions** — `.shellwright/AGENTS.md` under the project root
//! 4. **Project rules** — `.shellwright/RULES.md` under the project root
//!
//! Project files are optional; missing or empty ones are skipped.

use shellwright_core::PromptEnvironment;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project-local directory holding context files.
pub const PROJECT_DIR: &str = ".shellwright";
pub const AGENTS_FILE: &str = "AGENTS.md";
pub const RULES_FILE: &str = "RULES.md";

/// Produces the initial system message for a run.
pub trait SystemPromptBuilder: Send + Sync {
    fn build(&self, env: &PromptEnvironment) -> String;
}

/// Built-in role text plus environment plus optional project files.
#[derive(Debug, Clone, Default)]
pub struct DefaultPromptBuilder {
    project_root: Option<PathBuf>,
}

impl DefaultPromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for project context files under `root/.shellwright/`.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    fn role() -> &'static str {
        concat!(
            "You are Shellwright, an AI assistant that works in the user's terminal. ",
            "You turn requests into shell commands and file edits and carry them out with your tools.\n",
            "- Inspect before you change: read files and list directories first.\n",
            "- Prefer small, reversible steps and explain destructive commands before running them.\n",
            "- You may request several independent tool calls in one response; they run in order.\n",
            "- When the task is done, reply with a short summary and no tool calls.",
        )
    }

    fn environment(env: &PromptEnvironment) -> String {
        format!(
            "Shell: {}\nWorking directory: {}\nPlatform: {}\nModel: {} ({})",
            env.shell.description(),
            env.cwd.display(),
            env.platform,
            env.model,
            env.provider,
        )
    }

    fn project_section(root: &Path, file: &str) -> Option<String> {
        let path = root.join(PROJECT_DIR).join(file);
        let content = std::fs::read_to_string(&path).ok()?;
        if content.trim().is_empty() {
            return None;
        }
        debug!(file = %path.display(), "Loaded project context file");
        Some(content)
    }
}

impl SystemPromptBuilder for DefaultPromptBuilder {
    fn build(&self, env: &PromptEnvironment) -> String {
        let mut sections: Vec<(&str, String)> = vec![
            ("role", Self::role().to_string()),
            ("environment", Self::environment(env)),
        ];

        if let Some(root) = &self.project_root {
            if let Some(agents) = Self::project_section(root, AGENTS_FILE) {
                sections.push(("project_instructions", agents));
            }
            if let Some(rules) = Self::project_section(root, RULES_FILE) {
                sections.push(("project_rules", rules));
            }
        }

        sections
            .iter()
            .map(|(tag, content)| format!("<{tag}>\n{}\n</{tag}>\n", content.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A fixed prompt, handy for tests and for callers that bring their own.
#[derive(Debug, Clone)]
pub struct StaticPrompt(pub String);

impl SystemPromptBuilder for StaticPrompt {
    fn build(&self, _env: &PromptEnvironment) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellwright_core::ShellFlavor;

    fn env() -> PromptEnvironment {
        PromptEnvironment::new(ShellFlavor::Cmd, "/work", "gpt-4o", "openai")
    }

    #[test]
    fn includes_environment() {
        let prompt = DefaultPromptBuilder::new().build(&env());
        assert!(prompt.starts_with("<role>\n"));
        assert!(prompt.contains("<environment>"));
        assert!(prompt.contains("Shell: Windows CMD"));
        assert!(prompt.contains("Model: gpt-4o (openai)"));
        assert!(!prompt.contains("<project_instructions>"));
    }

    #[test]
    fn loads_project_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(dir.path().join(PROJECT_DIR).join(AGENTS_FILE), "Run `make check` before finishing.").unwrap();
        std::fs::write(dir.path().join(PROJECT_DIR).join(RULES_FILE), "   \n").unwrap();

        let prompt = DefaultPromptBuilder::new().with_project_root(dir.path()).build(&env());
        assert!(prompt.contains("<project_instructions>\nRun `make check` before finishing.\n</project_instructions>"));
        assert!(!prompt.contains("<project_rules>"));
    }

    #[test]
    fn static_prompt_is_verbatim() {
        assert_eq!(StaticPrompt("sys".into()).build(&env()), "sys");
    }
}
