//! Crypto transaction risk analysis.
//!
//! Three independent signal groups, merged by max: direct hits against the
//! static risky-address sets, mixer interaction across the address's ledger
//! history, and temporal/value patterns in that history. The direct-hit
//! check never touches the network, so a ledger outage cannot mask a listed
//! address.

use crate::ledger::{LedgerTransaction, RateLimitedLedgerClient};
use crate::registry::{AddressCategory, AddressRiskRegistry};
use crate::types::alert::ChannelResult;
use crate::types::event::CryptoLeg;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed fallback score for structurally invalid input.
const INVALID_INPUT_RISK: f64 = 0.8;

/// Moderate risk assigned when no history is available.
const NO_HISTORY_RISK: f64 = 0.4;

/// Moderate risk when malformed records prevented a full pattern analysis.
const PARTIAL_ANALYSIS_RISK: f64 = 0.3;

pub struct CryptoRiskAnalyzer {
    registry: Arc<AddressRiskRegistry>,
    ledger: Arc<RateLimitedLedgerClient>,
}

impl CryptoRiskAnalyzer {
    pub fn new(registry: Arc<AddressRiskRegistry>, ledger: Arc<RateLimitedLedgerClient>) -> Self {
        Self { registry, ledger }
    }

    /// Score one crypto leg within the given ledger budget. A timeout or
    /// explorer failure degrades to no-history semantics.
    pub async fn analyze(&self, leg: &CryptoLeg, budget: Duration) -> ChannelResult {
        if !leg.is_valid() {
            warn!("invalid crypto transaction data");
            return ChannelResult::new(
                INVALID_INPUT_RISK,
                vec!["Invalid crypto transaction data".to_string()],
            );
        }

        let mut score = 0.0f64;
        let mut alerts = Vec::new();

        if let Some(entry) = self.registry.lookup_address(&leg.address) {
            score = score.max(entry.base_risk);
            alerts.push(match entry.category {
                AddressCategory::Mixer => {
                    format!("Address is a known mixer: {}", leg.address)
                }
                AddressCategory::Darknet => {
                    format!("Address is associated with darknet markets: {}", leg.address)
                }
                AddressCategory::Scam => {
                    format!("Address is a known scam or fraud address: {}", leg.address)
                }
            });
        }

        let history =
            match tokio::time::timeout(budget, self.ledger.transaction_history(&leg.address, None))
                .await
            {
                Ok(Ok(transactions)) => Some(transactions),
                Ok(Err(e)) => {
                    warn!(address = %leg.address, error = %e, "ledger history unavailable");
                    None
                }
                Err(_) => {
                    warn!(address = %leg.address, budget_ms = budget.as_millis() as u64, "ledger history fetch timed out");
                    None
                }
            };

        match history.filter(|h| !h.is_empty()) {
            Some(transactions) => {
                let (mixer_risk, mixer_alerts) = self.mixer_interaction(&transactions);
                score = score.max(mixer_risk);
                alerts.extend(mixer_alerts);

                let (pattern_risk, pattern_alerts) = self.transaction_patterns(&transactions);
                score = score.max(pattern_risk);
                alerts.extend(pattern_alerts);
            }
            None => {
                if leg.currency != "ETH" {
                    alerts.push(format!(
                        "No Ethereum transaction history found for this {} address",
                        leg.currency
                    ));
                } else {
                    alerts.push("No Ethereum transaction history found".to_string());
                }
                score = score.max(NO_HISTORY_RISK);
            }
        }

        debug!(score = score, alerts = alerts.len(), "crypto analysis complete");
        ChannelResult::new(score, alerts)
    }

    /// Share of transferred value touching a known mixer, tiered into risk.
    fn mixer_interaction(&self, transactions: &[LedgerTransaction]) -> (f64, Vec<String>) {
        let mut mixer_count = 0usize;
        let mut mixer_value = 0.0;
        let mut total_value = 0.0;

        for tx in transactions {
            let touches_mixer = self.registry.is_mixer(&tx.from) || self.registry.is_mixer(&tx.to);
            let value = match tx.value_units() {
                Some(v) => v,
                None => {
                    warn!(raw = %tx.value, "unparseable transfer value, counting as zero");
                    0.0
                }
            };
            total_value += value;
            if touches_mixer {
                mixer_count += 1;
                mixer_value += value;
            }
        }

        if total_value > 0.0 {
            let percentage = mixer_value / total_value * 100.0;
            if percentage > 0.0 {
                let risk = if percentage > 50.0 {
                    1.0
                } else if percentage > 20.0 {
                    0.8
                } else if percentage > 5.0 {
                    0.6
                } else {
                    0.4
                };
                return (
                    risk,
                    vec![format!(
                        "{percentage:.1}% of value from/to known mixers ({mixer_count} transactions)"
                    )],
                );
            }
        }

        (0.0, Vec::new())
    }

    /// Temporal and value-shape heuristics over the history. Records that
    /// fail to parse are skipped and surface once as a moderate-risk alert
    /// so a single malformed record cannot deny a risk opinion.
    fn transaction_patterns(&self, transactions: &[LedgerTransaction]) -> (f64, Vec<String>) {
        let mut risk = 0.0f64;
        let mut alerts = Vec::new();

        let mut parse_failures = 0usize;
        let mut stamped: Vec<(i64, f64)> = Vec::with_capacity(transactions.len());
        for tx in transactions {
            match (tx.timestamp(), tx.value_base_units()) {
                (Some(ts), Some(value)) => stamped.push((ts.timestamp(), value)),
                _ => parse_failures += 1,
            }
        }

        if parse_failures > 0 {
            warn!(failures = parse_failures, "skipped malformed ledger records");
            risk = risk.max(PARTIAL_ANALYSIS_RISK);
            alerts.push(format!(
                "Could not fully analyze transaction history ({parse_failures} malformed records)"
            ));
        }

        if let (Some(oldest), Some(newest)) = (
            stamped.iter().map(|(ts, _)| *ts).min(),
            stamped.iter().map(|(ts, _)| *ts).max(),
        ) {
            let age_days = (newest - oldest) as f64 / 86_400.0;
            if age_days < 1.0 {
                risk = risk.max(0.7);
                alerts.push("New account: less than 1 day old".to_string());
            } else if age_days < 7.0 {
                risk = risk.max(0.4);
                alerts.push("New account: less than 7 days old".to_string());
            }
        }

        if transactions.len() == 1 {
            risk = risk.max(0.3);
            alerts.push("Single transaction history".to_string());
        }

        // Simplified peeling-chain heuristic: after sorting by time, more
        // than half of consecutive values strictly decrease.
        if stamped.len() >= 3 {
            stamped.sort_by_key(|(ts, _)| *ts);
            let decreasing = stamped.windows(2).filter(|w| w[0].1 > w[1].1).count();
            if decreasing >= 2 && decreasing as f64 > stamped.len() as f64 * 0.5 {
                risk = risk.max(0.6);
                alerts.push(
                    "Possible peeling chain detected (decreasing transaction values)".to_string(),
                );
            }
        }

        (risk, alerts)
    }
}
