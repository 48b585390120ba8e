//! Risk classification and analysis result structures

use serde::{Deserialize, Serialize};

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Classify a 0-100 score against ascending thresholds. Each boundary is
    /// inclusive on the tier above it: a score equal to `low` is Medium.
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score < thresholds.low {
            RiskLevel::Low
        } else if score < thresholds.medium {
            RiskLevel::Medium
        } else if score < thresholds.high {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Ascending tier boundaries on the 0-100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            low: 30.0,
            medium: 70.0,
            high: 90.0,
        }
    }
}

/// Score and explanation produced by one channel analyzer. Created fresh per
/// analyze call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResult {
    /// Channel risk score in [0, 1]
    pub score: f64,

    /// Human-readable alerts, in the order the rules fired
    pub alerts: Vec<String>,
}

impl ChannelResult {
    pub fn new(score: f64, alerts: Vec<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            alerts,
        }
    }
}

/// Merged cross-channel result returned per analyze call. Deterministic for
/// a fixed event, cache and model; the caller owns persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    /// Combined risk score on the 0-100 scale, rounded to 2 decimals
    pub risk_score: f64,

    /// Risk level classification
    pub risk_level: RiskLevel,

    /// All channel alerts, fiat then crypto then stablecoin, each prefixed
    /// with its channel name
    pub alerts: Vec<String>,

    pub fiat_channel: Option<ChannelResult>,
    pub crypto_channel: Option<ChannelResult>,
    pub stablecoin_channel: Option<ChannelResult>,
}
