//! Permission levels and interactive approval decisions.
//!
//! The policy that resolves a level for a concrete call lives in
//! `shellwright-security`; these are the shared vocabulary types.

use serde::{Deserialize, Serialize};

/// Whether a tool call may run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Run without asking
    Allow,
    /// Ask the user first (default)
    #[default]
    Ask,
    /// Never run
    Deny,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Ask => "ask",
            Self::Deny => "deny",
        }
    }
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "ask" => Ok(Self::Ask),
            "deny" => Ok(Self::Deny),
            other => Err(format!("unknown permission level '{other}'")),
        }
    }
}

/// The user's answer to an interactive approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Run this call once
    Approve,
    /// Refuse this call
    Deny,
    /// Run this call and every later call of the same tool this session
    Session,
}
