use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

pub struct Config {
    pub gateway_url: String,
    pub gateway_key: Option<String>,
    pub ai_url: String,
    pub ai_key: Option<String>,
    pub ai_model: String,
    pub description_language: String,
    pub data_dir: PathBuf,
    pub query_retries: u32,
}

impl Config {
    /// Read `.env` if present, then the process environment.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            info!("No .env file loaded: {e}");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            gateway_url: try_load(&lookup, "HOTEL_HUB_GATEWAY_URL", "http://localhost:8080")?,
            gateway_key: secret(&lookup, "HOTEL_HUB_GATEWAY_KEY"),
            ai_url: try_load(&lookup, "HOTEL_HUB_AI_URL", "https://api.openai.com/v1")?,
            ai_key: secret(&lookup, "HOTEL_HUB_AI_KEY"),
            ai_model: try_load(&lookup, "HOTEL_HUB_AI_MODEL", "gpt-4o-mini")?,
            description_language: try_load(&lookup, "HOTEL_HUB_DESCRIPTION_LANGUAGE", "Spanish")?,
            data_dir: try_load(&lookup, "HOTEL_HUB_DATA_DIR", ".hotel-hub")?,
            query_retries: try_load(&lookup, "HOTEL_HUB_QUERY_RETRIES", "1")?,
        })
    }
}

fn try_load<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
}

fn secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    let value = lookup(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if value.is_none() {
        warn!("{key} not set, requests go out without it");
    }
    value
}
