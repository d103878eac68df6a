//! API configuration
//!
//! Read from `API_*` environment variables (after `.env` is loaded by the
//! binary). Every field has a default, so an empty environment yields a
//! working local setup.

use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use core_kernel::Currency;
use domain_payables::SettlementConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Seconds between scheduled-payment sweeps
    pub scheduler_interval_secs: u64,
    /// Webhook endpoint; webhooks are disabled when unset
    pub webhook_url: Option<String>,
    pub webhook_timeout_ms: u64,
    pub approval_threshold: Decimal,
    pub base_currency: String,
    pub price_tolerance_pct: Decimal,
    pub max_settlement_retries: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let settlement = SettlementConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/settlement".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            scheduler_interval_secs: 60,
            webhook_url: None,
            webhook_timeout_ms: 5000,
            approval_threshold: settlement.approval_threshold,
            base_currency: settlement.currency.code().to_string(),
            price_tolerance_pct: settlement.price_tolerance_pct,
            max_settlement_retries: settlement.max_settlement_retries,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = ApiConfig::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", defaults.port as i64)?
            .set_default("database_url", defaults.database_url)?
            .set_default("log_level", defaults.log_level)?
            .set_default("log_json", defaults.log_json)?
            .set_default("scheduler_interval_secs", defaults.scheduler_interval_secs as i64)?
            .set_default("webhook_timeout_ms", defaults.webhook_timeout_ms as i64)?
            .set_default("approval_threshold", defaults.approval_threshold.to_string())?
            .set_default("base_currency", defaults.base_currency)?
            .set_default("price_tolerance_pct", defaults.price_tolerance_pct.to_string())?
            .set_default("max_settlement_retries", defaults.max_settlement_retries as i64)?
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs.max(1))
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_millis(self.webhook_timeout_ms)
    }

    /// The domain-level settings handed to the settlement services
    pub fn settlement(&self) -> Result<SettlementConfig, config::ConfigError> {
        let currency = Currency::from_str(&self.base_currency)
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(SettlementConfig {
            approval_threshold: self.approval_threshold,
            currency,
            price_tolerance_pct: self.price_tolerance_pct,
            max_settlement_retries: self.max_settlement_retries,
        })
    }
}
