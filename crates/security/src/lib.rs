//! Security module for Shellwright — permission policy, command risk, and path validation.
//!
//! Provides:
//! - **Permission gate**: resolves allow/ask/deny for each tool call from
//!   session approvals, glob rules, and per-tool defaults
//! - **Command risk**: flags destructive shell commands before the user approves them
//! - **Path validation**: keeps file tools inside the project root

pub mod path;
pub mod permission;
pub mod risk;

pub use path::{PathValidationError, validate_path};
pub use permission::{
    GateError, PermissionGate, PermissionRule, PermissionVerdict, VerdictSource, validate_pattern,
};
pub use risk::{CommandRisk, RiskLevel, assess_command_risk};
