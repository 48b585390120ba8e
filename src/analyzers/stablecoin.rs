//! Stablecoin transfer-log analysis.
//!
//! A narrower cousin of the crypto analyzer: scans one token's transfer log
//! and scores the share of transfers whose counterparty is a flagged
//! address. A simple ratio estimator with a 10% floor keeps typical wallets
//! from tripping on a stray flagged counterparty.

use crate::config::StablecoinConfig;
use crate::ledger::RateLimitedLedgerClient;
use crate::registry::AddressRiskRegistry;
use crate::types::alert::ChannelResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Minimum share of flagged counterparties, in percent, before the ratio
/// becomes the score.
const RISKY_SHARE_FLOOR: f64 = 10.0;

pub struct StablecoinTransferAnalyzer {
    registry: Arc<AddressRiskRegistry>,
    ledger: Arc<RateLimitedLedgerClient>,
    symbol: String,
    contract: String,
}

impl StablecoinTransferAnalyzer {
    pub fn new(
        registry: Arc<AddressRiskRegistry>,
        ledger: Arc<RateLimitedLedgerClient>,
        config: &StablecoinConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            symbol: config.symbol.clone(),
            contract: config.contract.clone(),
        }
    }

    /// Token symbol this analyzer is bound to.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Score an address by its token-transfer counterparties. Anything that
    /// prevents getting the transfer log (outage, timeout, empty log) scores
    /// zero: absence of evidence is not risk here.
    pub async fn analyze(&self, address: &str, budget: Duration) -> ChannelResult {
        let transfers = match tokio::time::timeout(
            budget,
            self.ledger.transaction_history(address, Some(&self.contract)),
        )
        .await
        {
            Ok(Ok(transfers)) => transfers,
            Ok(Err(e)) => {
                debug!(address = %address, token = %self.symbol, error = %e, "transfer log unavailable");
                return ChannelResult::new(0.0, Vec::new());
            }
            Err(_) => {
                debug!(address = %address, token = %self.symbol, "transfer log fetch timed out");
                return ChannelResult::new(0.0, Vec::new());
            }
        };

        if transfers.is_empty() {
            debug!(address = %address, token = %self.symbol, "no transfers found");
            return ChannelResult::new(0.0, Vec::new());
        }

        let total = transfers.len();
        let risky = transfers
            .iter()
            .filter(|tx| {
                self.registry.lookup_address(&tx.from).is_some()
                    || self.registry.lookup_address(&tx.to).is_some()
            })
            .count();

        let percentage = risky as f64 / total as f64 * 100.0;
        info!(
            token = %self.symbol,
            risky = risky,
            total = total,
            percentage = format!("{percentage:.2}"),
            "stablecoin counterparty scan"
        );

        if percentage > RISKY_SHARE_FLOOR {
            let score = (percentage / 100.0).min(1.0);
            ChannelResult::new(
                score,
                vec![format!(
                    "{percentage:.1}% of {} transfers involve flagged counterparties ({risky} of {total})",
                    self.symbol
                )],
            )
        } else {
            ChannelResult::new(0.0, Vec::new())
        }
    }
}
