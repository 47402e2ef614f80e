// Centralized configuration for the ambient bot

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};

/// Default location of the persisted config document
pub const DEFAULT_CONFIG_PATH: &str = "data/ambient.json";

/// OpenAI-compatible chat completion endpoint
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.1-8b-instruct";

/// Scheduled posts run once a day
pub const DEFAULT_INTERVAL_HOURS: u64 = 24;

/// Delay before the first scheduled cycle after startup
pub const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Character budget for a generated ambient message
pub const MESSAGE_BUDGET: usize = 220;

/// Discord embed colors
pub mod colors {
    pub const PRIMARY: u32 = 0x6a5acd;
    pub const SUCCESS: u32 = 0x2ecc71;
    pub const WARNING: u32 = 0xffa500;
    pub const INFO: u32 = 0x3498db;
}

/// Process settings read from the environment (and `.env`)
#[derive(Clone)]
pub struct Settings {
    pub discord_token: String,
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub config_path: PathBuf,
    pub interval: Duration,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("discord_token", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("config_path", &self.config_path)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        let discord_token = required("DISCORD_TOKEN")?;
        let api_key = required("OPENROUTER_API_KEY")?;

        let config_path = lookup("AMBIENT_CONFIG_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let api_url = lookup("AMBIENT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let model = lookup("AMBIENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let hours = match lookup("AMBIENT_INTERVAL_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("AMBIENT_INTERVAL_HOURS is not a number: {}", raw))?,
            None => DEFAULT_INTERVAL_HOURS,
        };
        if hours == 0 {
            bail!("AMBIENT_INTERVAL_HOURS must be at least 1");
        }

        Ok(Self {
            discord_token,
            api_key,
            api_url,
            model,
            config_path,
            interval: Duration::from_secs(hours * 60 * 60),
        })
    }
}
