//! Fraud Risk Engine - Demo Entry Point
//!
//! Loads configuration and the static risk lists, optionally trains the
//! fiat anomaly model from a historical-data file, scores one event from a
//! JSON file, and prints the combined result.

use anyhow::{Context, Result};
use fraud_risk_engine::{
    config::AppConfig, geo::IpinfoResolver, ledger::EtherscanApi,
    ledger::RateLimitedLedgerClient, metrics::ScoringMetrics, registry::AddressRiskRegistry,
    types::event::{FiatLeg, RiskEvent}, RiskCombiner,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration; a missing file falls back to built-in defaults
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config/config.toml not loaded ({e:#}), using defaults");
            AppConfig::default()
        }
    };

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("fraud_risk_engine={}", config.logging.level).parse()?);
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Fraud Risk Engine");

    let mut args = std::env::args().skip(1);
    let event_path = args
        .next()
        .context("usage: fraud-risk-engine <event.json> [historical-fiat.json]")?;
    let training_path = args.next();

    // The static lists are the only fatal load in the engine
    let registry = Arc::new(AddressRiskRegistry::from_config(&config.registry)?);

    let api = Arc::new(EtherscanApi::new(&config.ledger)?);
    let ledger = Arc::new(RateLimitedLedgerClient::new(
        api,
        config.ledger.requests_per_second,
    ));
    let geo = Arc::new(IpinfoResolver::new(&config.geo)?);

    let combiner = RiskCombiner::new(&config, registry, ledger, geo);
    let metrics = ScoringMetrics::new();

    // Train from historical data when a file is given
    match training_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read training data {path}"))?;
            let historical: Vec<FiatLeg> = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse training data {path}"))?;
            combiner.train(&historical);
        }
        None => warn!("no training data given, fiat channel runs rule-only"),
    }

    let raw = std::fs::read_to_string(&event_path)
        .with_context(|| format!("failed to read event {event_path}"))?;
    let event: RiskEvent =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse event {event_path}"))?;

    let result = combiner.analyze(&event).await?;
    metrics.record(&result);

    info!(
        risk_score = result.risk_score,
        risk_level = ?result.risk_level,
        "event scored"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    metrics.log_summary();
    Ok(())
}
