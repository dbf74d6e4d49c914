use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Base address of the Lexica backend. Resolved once at startup; there is
    /// no other way to point the client somewhere else mid-session.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. The backend has none of its own.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Default result count when the user does not pass `--top-k`.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> u32 {
    10
}

impl Config {
    /// Built-in defaults for running against a local backend without a
    /// config file.
    pub fn minimal() -> Self {
        Config::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let url = config.service.base_url.trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!(
            "service.base_url must start with http:// or https://, got '{}'",
            config.service.base_url
        );
    }

    if config.service.timeout_secs == 0 {
        anyhow::bail!("service.timeout_secs must be > 0");
    }

    if !(1..=100).contains(&config.search.top_k) {
        anyhow::bail!("search.top_k must be in [1, 100]");
    }

    Ok(())
}
