use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr};
use validator::{Validate, ValidationError};

/// About 24h of Ethereum mainnet blocks at ~13s per block.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 6500;
/// OpenSea calls allowed per second, spread uniformly.
pub const DEFAULT_OPENSEA_RATE_LIMIT: u32 = 5;

pub const DEFAULT_OPENSEA_API_URL: &str = "https://api.opensea.io/api/v1";
pub const DEFAULT_LOOKSRARE_API_URL: &str = "https://api.looksrare.org/api/v1";
pub const DEFAULT_COLLECTIONS_PATH: &str = "collections.json";
pub const DEFAULT_REPORT_PATH: &str = "data.txt";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Env {
    // Node provider, the URL carries the provider key
    #[validate(custom = "validate_ws_url")]
    pub wss_url: String,

    // Marketplace APIs
    #[validate(length(min = 1))]
    pub opensea_api_key: String,
    #[validate(custom = "validate_http_url")]
    pub opensea_base_url: String,
    #[validate(custom = "validate_http_url")]
    pub looksrare_base_url: String,

    // Files
    #[validate(length(min = 1))]
    pub collections_path: String,
    #[validate(length(min = 1))]
    pub report_path: String,

    // Tuning
    #[validate(range(min = 1))]
    pub lookback_blocks: u64,
    #[validate(range(min = 1, max = 1000))]
    pub opensea_rate_limit: u32,
    pub log_level: String,
}

impl Env {
    /// Reads the configuration from the process environment. Call
    /// `dotenv::dotenv()` first to pick up a local `.env` file.
    pub fn new() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow!("Missing environment variable {}", key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let env = Self {
            wss_url: required("WSS_URL")?,
            opensea_api_key: required("OPENSEA_API_KEY")?,
            opensea_base_url: or_default("OPENSEA_API_URL", DEFAULT_OPENSEA_API_URL),
            looksrare_base_url: or_default("LOOKSRARE_API_URL", DEFAULT_LOOKSRARE_API_URL),
            collections_path: or_default("COLLECTIONS_PATH", DEFAULT_COLLECTIONS_PATH),
            report_path: or_default("REPORT_PATH", DEFAULT_REPORT_PATH),
            lookback_blocks: parse_or(lookup("LOOKBACK_BLOCKS"), DEFAULT_LOOKBACK_BLOCKS)
                .context("LOOKBACK_BLOCKS")?,
            opensea_rate_limit: parse_or(lookup("OPENSEA_RATE_LIMIT"), DEFAULT_OPENSEA_RATE_LIMIT)
                .context("OPENSEA_RATE_LIMIT")?,
            log_level: or_default("LOG_LEVEL", "info"),
        };
        env.validate_all()?;
        Ok(env)
    }

    pub fn validate_all(&self) -> Result<()> {
        if let Err(e) = self.validate() {
            return Err(anyhow!("Configuration validation failed: {:?}", e));
        }
        self.level_filter()?;
        Ok(())
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow!("Invalid LOG_LEVEL: {}", self.log_level))
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => Ok(raw.trim().parse::<T>()?),
        None => Ok(default),
    }
}

fn validate_ws_url(url: &str) -> Result<(), ValidationError> {
    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(ValidationError::new("invalid_ws_url"));
    }
    Ok(())
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ValidationError::new("invalid_http_url"));
    }
    Ok(())
}
