use crate::config::Config;
use crate::providers::OpenAIProvider;
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use std::sync::Arc;

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or("openai");

    match provider_name.to_lowercase().as_str() {
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "BOTLINK_OPENAI_API_KEY"],
                &config.api_key,
            )?;
            let mut provider = OpenAIProvider::new(api_key).with_model(config.model.clone());
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        "openrouter" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENROUTER_API_KEY", "BOTLINK_OPENROUTER_API_KEY"],
                &config.api_key,
            )?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string());
            Ok(Arc::new(
                OpenAIProvider::new(api_key)
                    .with_model(config.model.clone())
                    .with_base_url(base_url),
            ))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: openai, openrouter",
            provider_name
        )),
    }
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = std::env::var(var_name)
            && !key.trim().is_empty()
        {
            return Ok(key.trim().to_string());
        }
    }

    if config_key.trim().is_empty() {
        return Err(anyhow!(
            "No API key configured; set {} or api_key in the config file",
            env_vars[0]
        ));
    }
    Ok(config_key.trim().to_string())
}
