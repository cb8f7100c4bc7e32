//! Currency conversion over a pluggable rate source.
//!
//! Rates are expressed per unit of a common base currency. The cross rate for
//! `from -> to` is `rate(to) / rate(from)`; codes missing from the table count
//! as the base currency (rate 1) instead of failing the conversion.

use crate::config::{RateSourceConfig, RateSourceKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateError {
    #[error("Exchange rate request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Exchange rate service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Exchange rate source misconfigured: {0}")]
    Config(String),
}

/// Exchange rates relative to `base`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Build a table; codes are uppercased, unusable rates are dropped.
    pub fn new(base: impl Into<String>, rates: impl IntoIterator<Item = (String, f64)>) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
            .map(|(code, rate)| (code.trim().to_uppercase(), rate))
            .collect();

        Self {
            base: base.into().trim().to_uppercase(),
            rates,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Rate for `code` (already uppercase), 1.0 when unknown.
    pub fn rate_for(&self, code: &str) -> f64 {
        self.rates.get(code).copied().unwrap_or(1.0)
    }
}

/// Supplies the current rate table.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn rates(&self) -> Result<RateTable, RateError>;
}

/// Offline fixed table, USD based.
pub struct FixedRates {
    table: RateTable,
}

impl FixedRates {
    pub fn new(table: RateTable) -> Self {
        Self { table }
    }
}

impl Default for FixedRates {
    fn default() -> Self {
        Self::new(RateTable::new(
            "USD",
            [
                ("USD".to_string(), 1.0),
                ("EUR".to_string(), 0.85),
                ("GBP".to_string(), 0.73),
                ("JPY".to_string(), 110.0),
            ],
        ))
    }
}

#[async_trait]
impl RateSource for FixedRates {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn rates(&self) -> Result<RateTable, RateError> {
        Ok(self.table.clone())
    }
}

/// Live quotes from an Open Exchange Rates style `latest.json` endpoint.
pub struct LiveRates {
    client: reqwest::Client,
    url: String,
    app_id: String,
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    base: String,
    rates: HashMap<String, f64>,
}

impl LiveRates {
    pub fn new(config: &RateSourceConfig) -> Result<Self, RateError> {
        let app_id = config
            .app_id
            .clone()
            .ok_or_else(|| RateError::Config("OPEN_EXCHANGE_RATES_APP_ID is not set".into()))?;

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            app_id,
        })
    }
}

#[async_trait]
impl RateSource for LiveRates {
    fn name(&self) -> &str {
        "live"
    }

    async fn rates(&self) -> Result<RateTable, RateError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("app_id", self.app_id.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let latest: LatestRates = response.json().await?;
        tracing::debug!(base = %latest.base, currencies = latest.rates.len(), "Fetched live rates");

        Ok(RateTable::new(latest.base, latest.rates))
    }
}

/// Build the rate source selected by configuration.
pub fn rate_source_from_config(config: &RateSourceConfig) -> Result<Arc<dyn RateSource>, RateError> {
    let source: Arc<dyn RateSource> = match config.kind {
        RateSourceKind::Fixed => Arc::new(FixedRates::default()),
        RateSourceKind::Live => Arc::new(LiveRates::new(config)?),
    };
    tracing::info!(source = source.name(), "Exchange rate source configured");
    Ok(source)
}

/// Arguments of the `convertCurrencies` tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversionRequest {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub amount: f64,
    pub from: String,
    pub to: String,
    /// Converted amount, rounded to 2 decimals
    pub result: f64,
    /// Applied cross rate, rounded to 4 decimals
    pub rate: f64,
}

/// Convert with an already fetched table.
pub fn convert(table: &RateTable, request: &ConversionRequest) -> ConversionResult {
    let from = request.from.trim().to_uppercase();
    let to = request.to.trim().to_uppercase();

    let rate = table.rate_for(&to) / table.rate_for(&from);
    // Round only for presentation, after multiplying.
    let result = request.amount * rate;

    ConversionResult {
        amount: request.amount,
        from,
        to,
        result: round_to(result, 2),
        rate: round_to(rate, 4),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// The `convertCurrencies` tool: fetches rates, then converts.
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self { source }
    }

    pub async fn convert(&self, request: &ConversionRequest) -> Result<ConversionResult, RateError> {
        let table = self.source.rates().await?;
        let result = convert(&table, request);

        tracing::debug!(
            source = self.source.name(),
            from = %result.from,
            to = %result.to,
            rate = result.rate,
            "Currency converted"
        );

        Ok(result)
    }
}
