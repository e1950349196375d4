use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Process-wide configuration, resolved once at startup and held for the
/// process lifetime. Precedence: environment > config file > defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub port: u16,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub spool_dir: String,
}

/// On-disk shape. Every field is optional; missing values fall back to
/// env vars and defaults.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_key: Option<String>,
    port: Option<u16>,
    model: Option<String>,
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    spool_dir: Option<String>,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config file {}", p.display()))?;
                toml::from_str::<FileConfig>(&raw)
                    .with_context(|| format!("invalid config file {}", p.display()))?
            }
            None => FileConfig::default(),
        };

        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or(file.api_key)
            .context("GEMINI_API_KEY is not set (env var or `api_key` in the config file)")?;

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            api_key,
            port,
            model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: file.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            spool_dir: file
                .spool_dir
                .unwrap_or_else(|| std::env::temp_dir().join("gemini-relay").display().to_string()),
        })
    }
}
