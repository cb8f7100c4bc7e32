use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Where the currency converter gets its exchange rates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSourceKind {
    /// Built-in fixed table. Deterministic and offline.
    Fixed,
    /// Live quotes fetched from Open Exchange Rates on every conversion.
    Live,
}

impl RateSourceKind {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "fixed" | "static" | "mock" => Ok(Self::Fixed),
            "live" | "openexchangerates" => Ok(Self::Live),
            other => anyhow::bail!("Unknown RATE_SOURCE '{}', expected 'fixed' or 'live'", other),
        }
    }
}

/// Settings for the hosted completion provider.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL of an OpenAI-compatible API, without trailing slash.
    pub api_base: String,
    pub timeout: Duration,
}

/// Settings for the exchange rate source.
#[derive(Debug, Clone)]
pub struct RateSourceConfig {
    pub kind: RateSourceKind,
    /// Open Exchange Rates app id. Required when `kind` is `Live`.
    pub app_id: Option<String>,
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub completion: CompletionConfig,
    pub rates: RateSourceConfig,
    /// Path to the CSV product catalog.
    pub catalog_path: PathBuf,
    /// Keep the parsed catalog in memory after the first successful load.
    pub catalog_cache: bool,
    /// Upper bound for answering one query, both provider phases included.
    pub request_timeout_secs: u64,
    pub shutdown_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// `OPENAI_API_KEY` is mandatory. `RATE_SOURCE=live` additionally requires
    /// `OPEN_EXCHANGE_RATES_APP_ID`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .context("Missing or invalid environment variables: OPENAI_API_KEY")?;

        let provider_timeout: u64 = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("PROVIDER_TIMEOUT_SECS must be a number of seconds")?;

        let kind = RateSourceKind::parse(&env::var("RATE_SOURCE").unwrap_or_default())?;
        let app_id = env::var("OPEN_EXCHANGE_RATES_APP_ID")
            .ok()
            .filter(|id| !id.trim().is_empty());
        if kind == RateSourceKind::Live && app_id.is_none() {
            anyhow::bail!(
                "Missing or invalid environment variables: OPEN_EXCHANGE_RATES_APP_ID (required for RATE_SOURCE=live)"
            );
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            completion: CompletionConfig {
                api_key,
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                timeout: Duration::from_secs(provider_timeout),
            },
            rates: RateSourceConfig {
                kind,
                app_id,
                url: env::var("OPEN_EXCHANGE_RATES_URL").unwrap_or_else(|_| {
                    "https://openexchangerates.org/api/latest.json".to_string()
                }),
                timeout: Duration::from_secs(provider_timeout),
            },
            catalog_path: PathBuf::from(
                env::var("CATALOG_PATH").unwrap_or_else(|_| "./products/products.csv".to_string()),
            ),
            catalog_cache: env::var("CATALOG_CACHE")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .context("CATALOG_CACHE must be 'true' or 'false'")?,
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("SHUTDOWN_TIMEOUT must be a number of seconds")?,
        })
    }
}
