use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const BOTLINK_DIR: &str = ".botlink";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// Address of the game process bridge.
    pub addr: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_secs: u64,
    /// How many recent game events to retain for query_state.
    pub event_buffer: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8765".to_string(),
            reconnect_secs: 5,
            event_buffer: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub max_rounds: usize,
    pub link: LinkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "gpt-4o".to_string(),
            max_rounds: 20,
            link: LinkConfig::default(),
        }
    }
}

pub fn get_botlink_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(BOTLINK_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_botlink_dir().join("config.toml")
}

pub fn ensure_botlink_dir() -> Result<PathBuf> {
    let botlink_dir = get_botlink_dir();

    if !botlink_dir.exists() {
        std::fs::create_dir_all(&botlink_dir).with_context(|| {
            format!(
                "Failed to create botlink directory at {}",
                botlink_dir.display()
            )
        })?;
    }

    Ok(botlink_dir)
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        if config_exists() {
            load_config()
        } else {
            Ok(Config::default())
        }
    }
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;

    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_botlink_dir()?;
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let config = Config {
            provider: Some("openrouter".to_string()),
            model: "gpt-4o-mini".to_string(),
            link: LinkConfig {
                addr: "10.0.0.5:4000".to_string(),
                ..LinkConfig::default()
            },
            ..Config::default()
        };

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.provider.as_deref(), Some("openrouter"));
        assert_eq!(loaded.model, "gpt-4o-mini");
        assert_eq!(loaded.link.addr, "10.0.0.5:4000");
        assert_eq!(loaded.link.reconnect_secs, 5);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "model = \"local-llm\"\n").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.model, "local-llm");
        assert_eq!(loaded.max_rounds, 20);
        assert_eq!(loaded.link, LinkConfig::default());
    }
}
