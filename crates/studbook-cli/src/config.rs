//! CLI configuration
//!
//! Stored as `studbook.toml` in the platform config directory. A missing or
//! unreadable file falls back to defaults.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use studbook_core::DEFAULT_GENERATIONS;

/// Overrides the config file location
pub const CONFIG_ENV: &str = "STUDBOOK_CONFIG";

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studbook")
}

/// Location of the config file
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studbook")
        .join("studbook.toml")
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub default_generations: u32,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_generations: DEFAULT_GENERATIONS,
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Keys accepted by `get` and `set`
    pub fn keys() -> &'static [&'static str] {
        &["data_dir", "default_generations", "bind_addr"]
    }

    /// Load the config file, or defaults if there is none
    pub fn load() -> Self {
        let path = config_file_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("Cannot read config {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content).with_context(|| format!("Cannot write {}", path.display()))?;
        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_dir" => Some(self.data_dir.display().to_string()),
            "default_generations" => Some(self.default_generations.to_string()),
            "bind_addr" => Some(self.bind_addr.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "default_generations" => {
                let generations: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid number of generations: {}", value))?;
                if generations < 1 {
                    anyhow::bail!("Number of generations must be at least 1");
                }
                self.default_generations = generations;
            }
            "bind_addr" => self.bind_addr = value.to_string(),
            _ => anyhow::bail!(
                "Unknown config key: {} (available: {})",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let mut config = Config::default();
        assert_eq!(config.get("default_generations"), Some("5".to_string()));

        config.set("default_generations", "8").unwrap();
        config.set("bind_addr", "0.0.0.0:9000").unwrap();
        assert_eq!(config.default_generations, 8);
        assert_eq!(config.get("bind_addr"), Some("0.0.0.0:9000".to_string()));

        assert!(config.set("default_generations", "0").is_err());
        assert!(config.set("default_generations", "many").is_err());
        assert!(config.set("colour", "blue").is_err());
        assert_eq!(config.get("colour"), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("bind_addr = \"127.0.0.1:9999\"").unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9999");
        assert_eq!(config.default_generations, DEFAULT_GENERATIONS);
    }
}
