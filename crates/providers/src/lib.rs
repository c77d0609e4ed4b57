//! Model provider implementations for Shellwright.
//!
//! Two halves per vendor:
//! - an **adapter** (`shellwright_core::ProviderAdapter`) that reads and
//!   writes the vendor's tool-calling dialect
//! - a **provider** (`shellwright_core::Provider`) that ships a conversation
//!   over HTTP and returns the raw response body
//!
//! The router pairs them up based on configuration.

pub mod anthropic;
pub mod anthropic_adapter;
pub mod gateway;
mod http;
pub mod openai_adapter;
pub mod openai_compat;
pub mod router;
mod wire;

pub use anthropic::AnthropicProvider;
pub use anthropic_adapter::AnthropicAdapter;
pub use gateway::GatewayAdapter;
pub use openai_adapter::OpenAiAdapter;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderBinding, ProviderRouter, build_from_config};
