//! # Shellwright Core
//!
//! Domain types, traits, and error definitions for the Shellwright coding
//! assistant. This crate defines the domain model that all other crates
//! implement against: messages, tool calls and results, the tool contract,
//! the provider and adapter contracts, and permission levels.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here. Implementations live in their respective
//! crates. This enables:
//! - Swapping model vendors without touching the turn loop
//! - Easy testing with scripted providers and stub tools
//! - Clean dependency graph (all crates depend inward on core)

pub mod adapter;
pub mod environment;
pub mod error;
pub mod message;
pub mod permission;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use adapter::{ProviderAdapter, ToolResultEnvelope};
pub use environment::{PromptEnvironment, ShellFlavor};
pub use error::{ProviderError, ToolError, ValidationError};
pub use message::{Message, ToolCall, ToolResult};
pub use permission::{PermissionDecision, PermissionLevel};
pub use provider::{Provider, SendOptions, TokenUsage};
pub use schema::{FieldKind, FieldSpec, InputSchema, ValidatedInput};
pub use tool::{Tool, ToolContext, ToolRegistry, ToolSchema};
pub use tokio_util::sync::CancellationToken;
