//! Configuration management for the risk engine

use crate::model::ForestParams;
use crate::types::alert::RiskLevelThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub stablecoin: StablecoinConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relative weight of each channel in the combined score. Absent channels
/// have their weight redistributed proportionally, so the values need not
/// sum to 1 — only be positive.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelWeights {
    pub fiat: f64,
    pub crypto: f64,
    pub stablecoin: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            fiat: 0.4,
            crypto: 0.4,
            stablecoin: 0.2,
        }
    }
}

/// Scoring and model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ChannelWeights,

    /// Risk tier boundaries on the 0-100 scale
    #[serde(default)]
    pub risk_levels: RiskLevelThresholds,

    /// Fiat amount above which the large-amount rule fires
    #[serde(default = "default_large_amount_threshold")]
    pub large_amount_threshold: f64,

    /// Anomaly-model hyperparameters
    #[serde(default)]
    pub model: ForestParams,
}

fn default_large_amount_threshold() -> f64 {
    10_000.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ChannelWeights::default(),
            risk_levels: RiskLevelThresholds::default(),
            large_amount_threshold: default_large_amount_threshold(),
            model: ForestParams::default(),
        }
    }
}

/// Ledger-explorer API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Explorer endpoint
    #[serde(default = "default_ledger_api_url")]
    pub api_url: String,

    /// Explorer API key
    #[serde(default)]
    pub api_key: String,

    /// Minimum-interval throttle across all external calls
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,

    /// Per-request HTTP timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Per-analysis budget for history fetches in milliseconds; on expiry
    /// the analysis degrades to no-history semantics
    #[serde(default = "default_analysis_budget_ms")]
    pub analysis_budget_ms: u64,
}

fn default_ledger_api_url() -> String {
    "https://api.etherscan.io/api".to_string()
}

fn default_requests_per_second() -> f64 {
    5.0
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_analysis_budget_ms() -> u64 {
    1_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            api_url: default_ledger_api_url(),
            api_key: String::new(),
            requests_per_second: default_requests_per_second(),
            request_timeout_ms: default_request_timeout_ms(),
            analysis_budget_ms: default_analysis_budget_ms(),
        }
    }
}

/// The stablecoin channel's token binding
#[derive(Debug, Clone, Deserialize)]
pub struct StablecoinConfig {
    #[serde(default = "default_stablecoin_symbol")]
    pub symbol: String,

    /// Token contract address on the ledger
    #[serde(default = "default_stablecoin_contract")]
    pub contract: String,
}

fn default_stablecoin_symbol() -> String {
    "USDC".to_string()
}

fn default_stablecoin_contract() -> String {
    "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string()
}

impl Default for StablecoinConfig {
    fn default() -> Self {
        Self {
            symbol: default_stablecoin_symbol(),
            contract: default_stablecoin_contract(),
        }
    }
}

/// Geo-IP resolution service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_geo_api_url")]
    pub api_url: String,

    #[serde(default = "default_geo_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_geo_api_url() -> String {
    "https://ipinfo.io".to_string()
}

fn default_geo_timeout_ms() -> u64 {
    3_000
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            api_url: default_geo_api_url(),
            request_timeout_ms: default_geo_timeout_ms(),
        }
    }
}

/// Optional file overrides for the built-in risk lists
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryConfig {
    pub addresses_file: Option<String>,
    pub jurisdictions_file: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ledger.api_url, "https://api.etherscan.io/api");
        assert_eq!(config.ledger.requests_per_second, 5.0);
        assert_eq!(config.scoring.large_amount_threshold, 10_000.0);
        assert_eq!(config.scoring.model.contamination, 0.05);
        assert_eq!(config.scoring.model.seed, 42);
        assert_eq!(config.stablecoin.symbol, "USDC");
        assert_eq!(config.scoring.risk_levels.low, 30.0);
    }

    #[test]
    fn test_default_weights() {
        let weights = ChannelWeights::default();
        assert!((weights.fiat + weights.crypto + weights.stablecoin - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
[ledger]
api_key = "test-key"
requests_per_second = 2.0

[scoring.weights]
fiat = 0.5
crypto = 0.3
stablecoin = 0.2
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.ledger.api_key, "test-key");
        assert_eq!(config.ledger.requests_per_second, 2.0);
        // untouched sections keep their defaults
        assert_eq!(config.ledger.api_url, "https://api.etherscan.io/api");
        assert_eq!(config.scoring.weights.fiat, 0.5);
        assert_eq!(config.stablecoin.symbol, "USDC");
        assert_eq!(config.logging.level, "info");
    }
}
