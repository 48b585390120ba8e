//! Ledger-explorer API access.
//!
//! The explorer is a fallible collaborator: any transport error, non-2xx
//! status or non-"1" API status becomes [`LedgerError::Unavailable`], which
//! callers treat as "no history", never as a hard failure.

use crate::config::LedgerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Base units per display unit for 18-decimal assets.
const BASE_UNITS_PER_UNIT: f64 = 1e18;

/// The external explorer could not produce data.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("ledger explorer unavailable: {0}")]
    Unavailable(String),
}

/// Explorer query kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    /// Normal transaction list
    TxList,
    /// Internal (contract-initiated) transaction list
    TxListInternal,
    /// ERC-20 token transfer log, restricted to one contract
    TokenTx,
}

impl LedgerAction {
    fn as_param(&self) -> &'static str {
        match self {
            LedgerAction::TxList => "txlist",
            LedgerAction::TxListInternal => "txlistinternal",
            LedgerAction::TokenTx => "tokentx",
        }
    }
}

/// One explorer request.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    pub action: LedgerAction,
    pub address: String,
    /// Token contract filter, only meaningful for [`LedgerAction::TokenTx`]
    pub contract: Option<String>,
}

/// A ledger record as the explorer reports it. Numeric fields stay wire
/// strings: transfer values routinely exceed 64-bit range and individual
/// records may be malformed, so conversion is per-record and fallible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,

    /// Transfer value as a base-unit decimal string
    #[serde(default)]
    pub value: String,

    /// Unix timestamp in seconds, as a decimal string
    #[serde(rename = "timeStamp", default)]
    pub time_stamp: String,
}

impl LedgerTransaction {
    /// Transfer value in base units.
    pub fn value_base_units(&self) -> Option<f64> {
        parse_base_units(&self.value)
    }

    /// Transfer value converted to display units (wei to ETH for 18-decimal
    /// assets).
    pub fn value_units(&self) -> Option<f64> {
        self.value_base_units().map(|v| v / BASE_UNITS_PER_UNIT)
    }

    /// Record timestamp, if the wire string parses.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let secs: i64 = self.time_stamp.trim().parse().ok()?;
        DateTime::from_timestamp(secs, 0)
    }
}

/// Parse a base-unit decimal string without overflowing: u128 covers every
/// realistic value and the f64 fallback tolerates anything larger.
pub fn parse_base_units(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(v) = raw.parse::<u128>() {
        return Some(v as f64);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Transport seam for the explorer, so tests can substitute stubs.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn fetch(&self, query: &LedgerQuery) -> Result<Vec<LedgerTransaction>, LedgerError>;
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// Etherscan-style explorer client.
pub struct EtherscanApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EtherscanApi {
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build ledger HTTP client")?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl LedgerApi for EtherscanApi {
    async fn fetch(&self, query: &LedgerQuery) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let action = query.action.as_param();
        let mut params: Vec<(&str, &str)> = vec![
            ("module", "account"),
            ("action", action),
            ("address", &query.address),
            ("startblock", "0"),
            ("endblock", "99999999"),
            ("sort", "desc"),
            ("apikey", &self.api_key),
        ];
        if let Some(contract) = &query.contract {
            params.push(("contractaddress", contract));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LedgerError::Unavailable(format!(
                "http status {}",
                response.status()
            )));
        }

        let body: ExplorerResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("malformed response: {e}")))?;

        if body.status != "1" {
            warn!(
                action = action,
                address = %query.address,
                message = %body.message,
                "explorer returned error status"
            );
            return Err(LedgerError::Unavailable(body.message));
        }

        serde_json::from_value(body.result)
            .map_err(|e| LedgerError::Unavailable(format!("malformed result list: {e}")))
    }
}
