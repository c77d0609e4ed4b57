//! Shell command risk assessment.
//!
//! A coarse, pattern-based classifier shown to the user next to an approval
//! prompt. It never blocks anything by itself; blocking is the permission
//! gate's job.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk assessment for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRisk {
    pub level: RiskLevel,
    /// The command may destroy or overwrite data
    pub destructive: bool,
}

impl CommandRisk {
    /// One-line warning for display, `None` for low-risk commands.
    pub fn warning(&self) -> Option<&'static str> {
        match self.level {
            RiskLevel::High => Some("HIGH RISK - this command may cause data loss"),
            RiskLevel::Medium => Some("MEDIUM RISK - use with caution"),
            RiskLevel::Low => None,
        }
    }
}

static HIGH_RISK: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\brm\s+.*-r",
        r"\bdd\s+",
        r"\bmkfs\.",
        r"\bformat\b",
        r"\bfdisk\b",
        r"\bshred\b",
        r"\bchmod\s+777",
        r"\bchown\s+.*root",
        r">\s*/dev/",
        r"\bcrontab\s+-r",
        r"\biptables\s+-F",
    ])
});

static DESTRUCTIVE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"\brm\s+.*/",
        r"\bmv\s+.*\s+/dev/null",
        r"\btruncate\s+",
        // plain `>` redirect that overwrites a file
        r">\s*[^|&;]*$",
    ])
});

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
        .collect()
}

/// Classify a shell command.
///
/// High-risk patterns win over destructive ones; `sudo` alone raises an
/// otherwise harmless command to medium without marking it destructive.
pub fn assess_command_risk(command: &str) -> CommandRisk {
    if HIGH_RISK.iter().any(|re| re.is_match(command)) {
        return CommandRisk {
            level: RiskLevel::High,
            destructive: true,
        };
    }
    if DESTRUCTIVE.iter().any(|re| re.is_match(command)) {
        return CommandRisk {
            level: RiskLevel::Medium,
            destructive: true,
        };
    }
    if command.to_lowercase().contains("sudo") {
        return CommandRisk {
            level: RiskLevel::Medium,
            destructive: false,
        };
    }
    CommandRisk {
        level: RiskLevel::Low,
        destructive: false,
    }
}
