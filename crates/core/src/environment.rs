//! Host shell detection and the environment snapshot handed to prompt builders.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The shell that command-executing tools run under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShellFlavor {
    /// POSIX shell on Linux/macOS/BSD, with the distribution id when known
    Unix {
        program: String,
        distro: Option<String>,
    },
    /// Windows Subsystem for Linux
    Wsl { distro: String },
    /// MSYS2 environment (MINGW64, UCRT64, ...)
    Msys { system: String },
    Cygwin,
    PowerShell,
    /// Plain Windows command prompt
    Cmd,
}

impl Default for ShellFlavor {
    fn default() -> Self {
        Self::Unix {
            program: "sh".to_string(),
            distro: None,
        }
    }
}

impl ShellFlavor {
    /// Detect the flavor of the current process environment.
    pub fn detect() -> Self {
        let os_release = if cfg!(windows) {
            None
        } else {
            std::fs::read_to_string("/etc/os-release").ok()
        };
        Self::detect_from(cfg!(windows), |key| std::env::var(key).ok(), os_release.as_deref())
    }

    /// Detection with injected inputs. `env` looks up environment variables,
    /// `os_release` is the contents of `/etc/os-release` if readable.
    pub fn detect_from(
        windows: bool,
        env: impl Fn(&str) -> Option<String>,
        os_release: Option<&str>,
    ) -> Self {
        if !windows {
            return Self::Unix {
                program: posix_program(env("SHELL").as_deref()),
                distro: os_release.and_then(distro_id),
            };
        }
        if let Some(distro) = env("WSL_DISTRO_NAME") {
            return Self::Wsl { distro };
        }
        if let Some(system) = env("MSYSTEM") {
            return Self::Msys { system };
        }
        if env("CYGWIN").is_some() {
            return Self::Cygwin;
        }
        if env("PSModulePath").is_some() {
            return Self::PowerShell;
        }
        Self::Cmd
    }

    /// Human-readable label, used in prompts and the CLI banner.
    pub fn description(&self) -> String {
        match self {
            Self::Unix { program, distro: Some(d) } => format!("Linux {d} ({program})"),
            Self::Unix { program, distro: None } => format!("Unix Shell ({program})"),
            Self::Wsl { distro } => format!("WSL {distro}"),
            Self::Msys { system } => format!("MSYS2 {system}"),
            Self::Cygwin => "Cygwin".to_string(),
            Self::PowerShell => "PowerShell".to_string(),
            Self::Cmd => "Windows CMD".to_string(),
        }
    }

    /// Program and arguments that run `command` under this shell.
    pub fn command_line(&self, command: &str) -> (String, Vec<String>) {
        let (program, args): (&str, Vec<&str>) = match self {
            Self::Unix { program, .. } => (program.as_str(), vec!["-c", command]),
            Self::Wsl { .. } => ("wsl", vec!["sh", "-c", command]),
            Self::Msys { .. } | Self::Cygwin => ("bash", vec!["-c", command]),
            Self::PowerShell => ("powershell", vec!["-NoProfile", "-Command", command]),
            Self::Cmd => ("cmd", vec!["/C", command]),
        };
        (program.to_string(), args.into_iter().map(String::from).collect())
    }
}

impl std::fmt::Display for ShellFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

/// Basename of `$SHELL` when it is a shell we know how to drive, else `sh`.
fn posix_program(shell: Option<&str>) -> String {
    let name = shell
        .and_then(|s| s.rsplit('/').next())
        .unwrap_or("sh");
    match name {
        "bash" | "zsh" | "fish" => name.to_string(),
        _ => "sh".to_string(),
    }
}

/// `ID=ubuntu` → `Ubuntu`.
fn distro_id(os_release: &str) -> Option<String> {
    let raw = os_release
        .lines()
        .find_map(|line| line.strip_prefix("ID="))?
        .trim()
        .trim_matches('"');
    let mut chars = raw.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.map(|c| c.to_ascii_lowercase())).collect())
}

/// What a system prompt builder may know about where the agent runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEnvironment {
    pub shell: ShellFlavor,
    pub cwd: PathBuf,
    /// `os/arch`, e.g. `linux/x86_64`
    pub platform: String,
    pub model: String,
    pub provider: String,
}

impl PromptEnvironment {
    pub fn new(
        shell: ShellFlavor,
        cwd: impl Into<PathBuf>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            shell,
            cwd: cwd.into(),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            model: model.into(),
            provider: provider.into(),
        }
    }
}
