//! `shellwright providers` — List supported LLM providers.

use shellwright_providers::router::default_model;

/// Built-in providers: name, endpoint, wire dialect.
const PROVIDERS: &[(&str, &str, &str)] = &[
    ("anthropic", "api.anthropic.com/v1", "anthropic"),
    ("openai", "api.openai.com/v1", "openai"),
    ("openrouter", "openrouter.ai/api/v1", "gateway"),
    ("ollama", "localhost:11434/v1", "gateway"),
    ("deepseek", "api.deepseek.com/v1", "gateway"),
    ("groq", "api.groq.com/openai/v1", "gateway"),
    ("together", "api.together.xyz/v1", "gateway"),
    ("fireworks", "api.fireworks.ai/inference/v1", "gateway"),
    ("vllm", "localhost:8000/v1", "gateway"),
    ("llamacpp", "localhost:8080/v1", "gateway"),
];

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Supported LLM Providers");
    println!("=======================");
    println!();
    println!("  {:<12} {:<32} {:<10} Default model", "Provider", "Base URL", "Dialect");
    println!("  {}", "-".repeat(84));
    for (name, url, dialect) in PROVIDERS {
        println!("  {name:<12} {url:<32} {dialect:<10} {}", default_model(name));
    }
    println!();
    println!("  Custom endpoints:");
    println!("    Any OpenAI-compatible API works through the gateway dialect:");
    println!("    default_provider = \"myhost\"");
    println!("    [providers.myhost]");
    println!("    api_url = \"https://your-custom-endpoint.com/v1\"");
    println!("    api_key = \"your-key\"");
    println!();
    println!("  Environment variables:");
    println!("    ANTHROPIC_API_KEY, OPENAI_API_KEY, OPENROUTER_API_KEY, SHELLWRIGHT_API_KEY");
    println!("    SHELLWRIGHT_PROVIDER, SHELLWRIGHT_MODEL");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_provider_builds() {
        let mut config = shellwright_config::AppConfig::default();
        for (name, _, _) in PROVIDERS {
            config.default_provider = (*name).to_string();
            let router = shellwright_providers::build_from_config(&config);
            let binding = router.default_binding().unwrap();
            assert_eq!(binding.provider.name(), *name);
        }
    }
}
