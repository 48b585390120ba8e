//! Best-effort IP-to-country resolution.
//!
//! The geo lookup is a refinement, not a requirement: any failure is logged
//! and the caller falls back to comparing the raw geo signal.

use crate::config::GeoConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

/// Whether a geo signal is an IPv4 literal (as opposed to a country code).
pub fn is_ipv4_literal(signal: &str) -> bool {
    signal.parse::<Ipv4Addr>().is_ok()
}

/// Resolves an IP literal to a two-letter country code.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Best-effort lookup; `None` on any failure.
    async fn resolve_country(&self, ip: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct IpinfoRecord {
    country: Option<String>,
}

/// ipinfo.io-style resolver: `GET {base}/{ip}/json` returning
/// `{"country": "US", ...}`.
pub struct IpinfoResolver {
    client: reqwest::Client,
    base_url: String,
}

impl IpinfoResolver {
    pub fn new(config: &GeoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build geo HTTP client")?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoResolver for IpinfoResolver {
    async fn resolve_country(&self, ip: &str) -> Option<String> {
        let url = format!("{}/{}/json", self.base_url, ip);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(ip = %ip, error = %e, "geo lookup failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(ip = %ip, status = %response.status(), "geo lookup rejected");
            return None;
        }
        match response.json::<IpinfoRecord>().await {
            Ok(record) => record.country,
            Err(e) => {
                debug!(ip = %ip, error = %e, "geo lookup returned malformed body");
                None
            }
        }
    }
}
