//! `shellwright config` — Configuration management commands.

use shellwright_config::AppConfig;
use shellwright_providers::router::is_local;

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let dir = AppConfig::config_dir();
    let config_path = dir.join("config.toml");

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&dir)?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote default config to {}", config_path.display());
    println!("Set an API key (e.g. ANTHROPIC_API_KEY) or add one under [providers.<name>].");
    Ok(())
}

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   [ok] Config parsed and validated");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   [ok] All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   [warn] {w}");
                }
            }

            println!();
            println!("   Provider:     {}", config.default_provider);
            println!(
                "   Model:        {}",
                config.model_for(&config.default_provider).as_deref().unwrap_or("(provider default)")
            );
            println!("   Max turns:    {}", config.agent.max_turns);
            println!("   Token limit:  {}", config.context.token_limit);
            println!("   Rules:        {}", config.permissions.rules.len());
        }
        Err(e) => {
            println!("   [error] {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

/// Non-fatal problems worth pointing out.
fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.has_api_key() && !is_local(&config.default_provider) {
        warnings.push(format!(
            "No API key for '{}' (set it in the config or via environment)",
            config.default_provider
        ));
    }

    if let Some(root) = &config.workspace.project_root {
        if !root.is_dir() {
            warnings.push(format!("workspace.project_root {} is not a directory", root.display()));
        }
    }

    for tool in config.permissions.defaults.keys() {
        if !KNOWN_TOOLS.contains(&tool.as_str()) {
            warnings.push(format!("permissions.defaults names unknown tool '{tool}'"));
        }
    }

    warnings
}

const KNOWN_TOOLS: &[&str] = &["shell", "file_read", "file_write", "list_dir"];

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Never echo secrets
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }

    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellwright_config::ProviderConfig;
    use shellwright_core::PermissionLevel;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn known_tools_match_default_registry() {
        let registry = shellwright_tools::default_registry();
        assert_eq!(registry.names(), KNOWN_TOOLS);
    }

    #[test]
    fn warns_about_missing_key_and_unknown_tool() {
        let mut config = AppConfig::default();
        config
            .permissions
            .defaults
            .insert("web_search".into(), PermissionLevel::Deny);

        let warnings = warnings(&config);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("No API key for 'anthropic'"));
        assert!(warnings[1].contains("web_search"));
    }

    #[test]
    fn local_provider_needs_no_key() {
        let mut config = AppConfig::default();
        config.default_provider = "ollama".into();
        config.providers.insert("ollama".into(), ProviderConfig::default());
        assert!(warnings(&config).is_empty());
    }
}
