//! Provider router — pairs each configured provider with its adapter.
//!
//! Handles provider creation and lookup by name. A provider is useless
//! without the adapter that reads its responses, so they travel together
//! as a [`ProviderBinding`].

use crate::anthropic::AnthropicProvider;
use crate::anthropic_adapter::AnthropicAdapter;
use crate::gateway::GatewayAdapter;
use crate::openai_adapter::OpenAiAdapter;
use crate::openai_compat::OpenAiCompatProvider;
use shellwright_config::AppConfig;
use shellwright_core::{Provider, ProviderAdapter};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A provider, the adapter for its dialect, and the model to ask for.
#[derive(Clone)]
pub struct ProviderBinding {
    pub provider: Arc<dyn Provider>,
    pub adapter: Arc<dyn ProviderAdapter>,
    pub model: String,
}

impl std::fmt::Debug for ProviderBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBinding")
            .field("provider", &self.provider.name())
            .field("adapter", &self.adapter.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Routes requests to the correct provider binding.
pub struct ProviderRouter {
    bindings: BTreeMap<String, ProviderBinding>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            bindings: BTreeMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a binding.
    pub fn register(&mut self, name: impl Into<String>, binding: ProviderBinding) {
        self.bindings.insert(name.into(), binding);
    }

    /// Get the default binding.
    pub fn default_binding(&self) -> Option<&ProviderBinding> {
        self.bindings.get(&self.default_provider)
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Get a specific binding by provider name.
    pub fn get(&self, name: &str) -> Option<&ProviderBinding> {
        self.bindings.get(name)
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.bindings.keys().map(|s| s.as_str()).collect()
    }
}

/// Build bindings for every configured provider plus the default one.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    let mut names: Vec<&str> = config.providers.keys().map(|s| s.as_str()).collect();
    if !names.contains(&config.default_provider.as_str()) {
        names.push(&config.default_provider);
    }

    for name in names {
        router.register(name, bind(name, config));
    }

    router
}

fn bind(name: &str, config: &AppConfig) -> ProviderBinding {
    let api_key = config.api_key_for(name).unwrap_or_default();
    let api_url = config.providers.get(name).and_then(|p| p.api_url.clone());
    let model = config
        .model_for(name)
        .unwrap_or_else(|| default_model(name).to_string());

    let (provider, adapter): (Arc<dyn Provider>, Arc<dyn ProviderAdapter>) = match name {
        "anthropic" => {
            let mut p = AnthropicProvider::new(api_key);
            if let Some(url) = api_url {
                p = p.with_base_url(url);
            }
            (
                Arc::new(p) as Arc<dyn Provider>,
                Arc::new(AnthropicAdapter) as Arc<dyn ProviderAdapter>,
            )
        }
        "openai" => {
            let url = api_url.unwrap_or_else(|| default_base_url(name));
            (
                Arc::new(OpenAiCompatProvider::new(name, url, api_key)) as Arc<dyn Provider>,
                Arc::new(OpenAiAdapter) as Arc<dyn ProviderAdapter>,
            )
        }
        _ => {
            let url = api_url.unwrap_or_else(|| default_base_url(name));
            // Local servers accept any key
            let key = if api_key.is_empty() && is_local(name) {
                name.to_string()
            } else {
                api_key
            };
            (
                Arc::new(OpenAiCompatProvider::new(name, url, key)) as Arc<dyn Provider>,
                Arc::new(GatewayAdapter::new(name)) as Arc<dyn ProviderAdapter>,
            )
        }
    };

    ProviderBinding {
        provider,
        adapter,
        model,
    }
}

/// Local inference servers that need no API key.
pub fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

/// Model used when neither the provider entry nor the config names one.
pub fn default_model(provider_name: &str) -> &'static str {
    match provider_name {
        "anthropic" => "claude-sonnet-4-20250514",
        "openai" => "gpt-4o",
        "openrouter" => "anthropic/claude-sonnet-4",
        "ollama" => "llama3.1",
        "deepseek" => "deepseek-chat",
        _ => "gpt-4o-mini",
    }
}
