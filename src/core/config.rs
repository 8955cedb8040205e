//! Configuration - Type-safe, validated config
//!
//! Built once at startup, either from a TOML file or from the environment
//! (after `.env` is loaded), then passed by reference to adapter constructors.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::core::{Error, Result};

pub const KRAKEN_API_URL: &str = "https://api.kraken.com";
pub const UPHOLD_API_URL: &str = "https://api.uphold.com/v0";

/// Selectable venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Venue {
    Kraken,
    Uphold,
    Paper,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Kraken => "kraken",
            Venue::Uphold => "uphold",
            Venue::Paper => "paper",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kraken" => Ok(Venue::Kraken),
            "uphold" => Ok(Venue::Uphold),
            "paper" => Ok(Venue::Paper),
            other => Err(Error::Config(format!(
                "unknown exchange {other:?} (expected kraken, uphold or paper)"
            ))),
        }
    }
}

impl TryFrom<String> for Venue {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Venue that serves every call
    pub exchange: Venue,

    /// Simulate order placement instead of sending it
    pub dry_run: bool,

    /// Paper ledger funding currency
    pub base_currency: String,

    pub kraken: KrakenConfig,

    pub uphold: UpholdConfig,

    pub http: HttpConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct KrakenConfig {
    pub api_key: Option<String>,
    /// Base64-encoded private key
    pub api_secret: Option<String>,
    pub base_url: String,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct UpholdConfig {
    pub api_token: Option<String>,
    pub base_url: String,
}

/// Per-attempt timeout and retry bounds for venue HTTP calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exchange: Venue::Kraken,
            dry_run: true,
            base_currency: "USD".to_string(),
            kraken: KrakenConfig::default(),
            uphold: UpholdConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: KRAKEN_API_URL.to_string(),
        }
    }
}

impl Default for UpholdConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: UPHOLD_API_URL.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 5_000,
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for KrakenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrakenConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for UpholdConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpholdConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validated()
    }

    /// Load from process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(exchange) = non_empty("EXCHANGE") {
            config.exchange = exchange.parse()?;
        }
        if let Some(flag) = lookup("DRY_RUN") {
            config.dry_run = parse_bool(&flag);
        }
        if let Some(base) = non_empty("BASE_CURRENCY") {
            config.base_currency = base;
        }

        config.kraken.api_key = non_empty("KRAKEN_API_KEY");
        config.kraken.api_secret = non_empty("KRAKEN_API_SECRET");
        if let Some(url) = non_empty("KRAKEN_BASE_URL") {
            config.kraken.base_url = url;
        }

        config.uphold.api_token = non_empty("UPHOLD_API_TOKEN");
        if let Some(url) = non_empty("UPHOLD_BASE_URL") {
            config.uphold.base_url = url;
        }

        config.validated()
    }

    fn validated(mut self) -> Result<Self> {
        self.base_currency = self.base_currency.trim().to_ascii_uppercase();
        if self.base_currency.is_empty()
            || !self.base_currency.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::Config(format!(
                "invalid base currency {:?}",
                self.base_currency
            )));
        }
        if self.http.max_attempts == 0 {
            return Err(Error::Config("http.max_attempts must be at least 1".to_string()));
        }
        Ok(self)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
