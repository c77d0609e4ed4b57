//! Errors that escape a run.
//!
//! Tool failures never show up here: the registry turns them into
//! `ToolResult::Error`. Only a failed model call mid-run, or a history the
//! executor cannot extend, ends `execute` with an error.

use shellwright_core::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Invalid history: {0}")]
    InvalidHistory(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
