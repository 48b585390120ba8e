//! Cross-channel risk combination.
//!
//! Fans an event out to the channel analyzers that apply to it, merges
//! their scores under configured weights, and classifies the merged score
//! into a risk tier. When a channel is absent its weight is redistributed
//! proportionally across the present channels, so a single-channel event's
//! combined score equals that channel's score exactly.

use crate::analyzers::{CryptoRiskAnalyzer, FiatAnomalyAnalyzer, StablecoinTransferAnalyzer};
use crate::config::{AppConfig, ChannelWeights};
use crate::error::RiskError;
use crate::geo::GeoResolver;
use crate::ledger::RateLimitedLedgerClient;
use crate::registry::AddressRiskRegistry;
use crate::types::alert::{ChannelResult, CombinedResult, RiskLevel, RiskLevelThresholds};
use crate::types::event::{FiatLeg, RiskEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct RiskCombiner {
    fiat: FiatAnomalyAnalyzer,
    crypto: CryptoRiskAnalyzer,
    stablecoin: StablecoinTransferAnalyzer,
    weights: ChannelWeights,
    thresholds: RiskLevelThresholds,
    default_budget: Duration,
}

impl RiskCombiner {
    pub fn new(
        config: &AppConfig,
        registry: Arc<AddressRiskRegistry>,
        ledger: Arc<RateLimitedLedgerClient>,
        geo: Arc<dyn GeoResolver>,
    ) -> Self {
        Self {
            fiat: FiatAnomalyAnalyzer::new(registry.clone(), geo, &config.scoring),
            crypto: CryptoRiskAnalyzer::new(registry.clone(), ledger.clone()),
            stablecoin: StablecoinTransferAnalyzer::new(registry, ledger, &config.stablecoin),
            weights: config.scoring.weights.clone(),
            thresholds: config.scoring.risk_levels.clone(),
            default_budget: Duration::from_millis(config.ledger.analysis_budget_ms),
        }
    }

    /// Train the fiat anomaly model on historical legs. Idempotent; the
    /// last call wins and empty input is a logged no-op.
    pub fn train(&self, historical: &[FiatLeg]) {
        self.fiat.train(historical);
    }

    /// Analyze an event under the configured ledger budget.
    pub async fn analyze(&self, event: &RiskEvent) -> Result<CombinedResult, RiskError> {
        self.analyze_with_budget(event, self.default_budget).await
    }

    /// Analyze an event under a caller-supplied ledger budget. The only
    /// error is an event with no legs; everything else degrades to a risk
    /// opinion.
    pub async fn analyze_with_budget(
        &self,
        event: &RiskEvent,
        budget: Duration,
    ) -> Result<CombinedResult, RiskError> {
        if !event.has_leg() {
            return Err(RiskError::EmptyEvent);
        }

        let fiat_task = async {
            match &event.fiat {
                Some(leg) => Some(self.fiat.analyze(leg).await),
                None => None,
            }
        };
        let crypto_task = async {
            match &event.crypto {
                Some(leg) => Some(self.crypto.analyze(leg, budget).await),
                None => None,
            }
        };
        let stablecoin_task = async {
            match &event.crypto {
                Some(leg) if leg.currency.eq_ignore_ascii_case(self.stablecoin.symbol()) => {
                    Some(self.stablecoin.analyze(&leg.address, budget).await)
                }
                _ => None,
            }
        };

        let (fiat_channel, crypto_channel, stablecoin_channel) =
            tokio::join!(fiat_task, crypto_task, stablecoin_task);

        let combined = Self::merge_scores([
            (fiat_channel.as_ref(), self.weights.fiat),
            (crypto_channel.as_ref(), self.weights.crypto),
            (stablecoin_channel.as_ref(), self.weights.stablecoin),
        ]);

        let risk_score = (combined * 100.0 * 100.0).round() / 100.0;
        let risk_level = RiskLevel::from_score(risk_score, &self.thresholds);

        let mut alerts = Vec::new();
        for (channel, prefix) in [
            (&fiat_channel, "Fiat"),
            (&crypto_channel, "Crypto"),
            (&stablecoin_channel, "Stablecoin"),
        ] {
            if let Some(result) = channel {
                alerts.extend(result.alerts.iter().map(|a| format!("{prefix}: {a}")));
            }
        }

        info!(
            risk_score = risk_score,
            risk_level = ?risk_level,
            alerts = alerts.len(),
            "risk analysis complete"
        );

        Ok(CombinedResult {
            risk_score,
            risk_level,
            alerts,
            fiat_channel,
            crypto_channel,
            stablecoin_channel,
        })
    }

    /// Weighted average over present channels, with absent channels' weight
    /// redistributed proportionally (present weights renormalized to 1).
    fn merge_scores(channels: [(Option<&ChannelResult>, f64); 3]) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for (channel, weight) in channels {
            if let Some(result) = channel {
                weighted_sum += result.score * weight;
                weight_total += weight;
            }
        }
        if weight_total > 0.0 {
            (weighted_sum / weight_total).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerApi, LedgerError, LedgerQuery, LedgerTransaction};
    use crate::types::event::CryptoLeg;
    use async_trait::async_trait;

    const CLEAN_ADDRESS: &str = "0x742d35cc6634c0532925a3b844bc454e4438f44e";
    const DARKNET_ADDRESS: &str = "0x3cbded43efdaf0fc77b9c55f6fc9988fcc9b757d";

    struct StubGeo;

    #[async_trait]
    impl GeoResolver for StubGeo {
        async fn resolve_country(&self, _ip: &str) -> Option<String> {
            None
        }
    }

    /// Explorer stub: an old, steady two-transaction history for every
    /// address, and an empty token-transfer log.
    struct SteadyHistoryApi;

    #[async_trait]
    impl LedgerApi for SteadyHistoryApi {
        async fn fetch(
            &self,
            query: &LedgerQuery,
        ) -> Result<Vec<LedgerTransaction>, LedgerError> {
            match query.action {
                crate::ledger::api::LedgerAction::TokenTx => Ok(Vec::new()),
                crate::ledger::api::LedgerAction::TxListInternal => Ok(Vec::new()),
                crate::ledger::api::LedgerAction::TxList => Ok(vec![
                    LedgerTransaction {
                        from: CLEAN_ADDRESS.to_string(),
                        to: "0x3333333333333333333333333333333333333333".to_string(),
                        value: "1000000000000000000".to_string(),
                        time_stamp: "1700000000".to_string(),
                    },
                    LedgerTransaction {
                        from: "0x3333333333333333333333333333333333333333".to_string(),
                        to: CLEAN_ADDRESS.to_string(),
                        value: "2000000000000000000".to_string(),
                        time_stamp: "1650000000".to_string(),
                    },
                ]),
            }
        }
    }

    fn combiner_with(api: Arc<dyn LedgerApi>) -> RiskCombiner {
        let config = AppConfig::default();
        let registry = Arc::new(AddressRiskRegistry::builtin());
        let ledger = Arc::new(RateLimitedLedgerClient::new(api, 10_000.0));
        RiskCombiner::new(&config, registry, ledger, Arc::new(StubGeo))
    }

    fn combiner() -> RiskCombiner {
        combiner_with(Arc::new(SteadyHistoryApi))
    }

    fn fiat_leg(amount: f64, currency: &str, card: &str, geo: &str) -> FiatLeg {
        FiatLeg {
            amount,
            currency: currency.to_string(),
            card_country: card.to_string(),
            geo_signal: geo.to_string(),
        }
    }

    fn crypto_leg(address: &str, currency: &str) -> CryptoLeg {
        CryptoLeg {
            address: address.to_string(),
            currency: currency.to_string(),
            amount: 0.1,
        }
    }

    #[tokio::test]
    async fn test_empty_event_is_the_only_error() {
        let combiner = combiner();
        let result = combiner.analyze(&RiskEvent::default()).await;
        assert!(matches!(result, Err(RiskError::EmptyEvent)));
    }

    #[tokio::test]
    async fn test_clean_two_leg_event_is_low() {
        let combiner = combiner();
        let event = RiskEvent {
            fiat: Some(fiat_leg(50.0, "EUR", "DE", "DE")),
            crypto: Some(crypto_leg(CLEAN_ADDRESS, "ETH")),
        };
        let result = combiner.analyze(&event).await.unwrap();
        assert!(result.risk_score < 30.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_single_channel_weight_collapses_to_one() {
        let combiner = combiner();
        let event = RiskEvent {
            fiat: Some(fiat_leg(5000.0, "USD", "US", "NG")),
            crypto: None,
        };
        let result = combiner.analyze(&event).await.unwrap();

        let fiat_score = result.fiat_channel.as_ref().unwrap().score;
        assert_eq!(result.risk_score, (fiat_score * 100.0 * 100.0).round() / 100.0);
        assert!(result.crypto_channel.is_none());
        assert!(result.stablecoin_channel.is_none());
    }

    #[tokio::test]
    async fn test_grey_list_scenario_is_critical() {
        // untrained model: rule-only 0.5 mismatch + 0.4 grey geo = 0.9
        let combiner = combiner();
        let event = RiskEvent {
            fiat: Some(fiat_leg(5000.0, "USD", "US", "NG")),
            crypto: None,
        };
        let result = combiner.analyze(&event).await.unwrap();
        assert!(result.risk_score >= 90.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn test_clean_fiat_only_event_is_low_with_no_alerts() {
        let combiner = combiner();
        let event = RiskEvent {
            fiat: Some(fiat_leg(50.0, "EUR", "DE", "DE")),
            crypto: None,
        };
        let result = combiner.analyze(&event).await.unwrap();
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_two_channel_weights_renormalize() {
        // fiat 0.9 (rules), crypto 1.0 (darknet): weights 0.4/0.4 -> 0.5/0.5
        let combiner = combiner();
        let event = RiskEvent {
            fiat: Some(fiat_leg(5000.0, "USD", "US", "NG")),
            crypto: Some(crypto_leg(DARKNET_ADDRESS, "ETH")),
        };
        let result = combiner.analyze(&event).await.unwrap();
        assert_eq!(result.fiat_channel.as_ref().unwrap().score, 0.9);
        assert_eq!(result.crypto_channel.as_ref().unwrap().score, 1.0);
        assert_eq!(result.risk_score, 95.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn test_stablecoin_channel_runs_only_for_matching_currency() {
        let combiner = combiner();

        let eth_event = RiskEvent {
            fiat: None,
            crypto: Some(crypto_leg(CLEAN_ADDRESS, "ETH")),
        };
        let result = combiner.analyze(&eth_event).await.unwrap();
        assert!(result.stablecoin_channel.is_none());

        let usdc_event = RiskEvent {
            fiat: None,
            crypto: Some(crypto_leg(CLEAN_ADDRESS, "USDC")),
        };
        let result = combiner.analyze(&usdc_event).await.unwrap();
        assert!(result.stablecoin_channel.is_some());
    }

    #[tokio::test]
    async fn test_alert_prefixes_and_order() {
        let combiner = combiner();
        let event = RiskEvent {
            fiat: Some(fiat_leg(5000.0, "USD", "US", "NG")),
            crypto: Some(crypto_leg(DARKNET_ADDRESS, "ETH")),
        };
        let result = combiner.analyze(&event).await.unwrap();

        let fiat_count = result.fiat_channel.as_ref().unwrap().alerts.len();
        assert!(fiat_count > 0);
        for alert in &result.alerts[..fiat_count] {
            assert!(alert.starts_with("Fiat: "), "unexpected prefix: {alert}");
        }
        for alert in &result.alerts[fiat_count..] {
            assert!(alert.starts_with("Crypto: "), "unexpected prefix: {alert}");
        }
    }

    #[tokio::test]
    async fn test_analyze_is_deterministic() {
        let combiner = combiner();
        combiner.train(&training_set());
        let event = RiskEvent {
            fiat: Some(fiat_leg(120.0, "USD", "US", "US")),
            crypto: Some(crypto_leg(CLEAN_ADDRESS, "ETH")),
        };

        let first = combiner.analyze(&event).await.unwrap();
        let second = combiner.analyze(&event).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_train_on_empty_history_keeps_rule_only_path() {
        let combiner = combiner();
        combiner.train(&[]);
        let event = RiskEvent {
            fiat: Some(fiat_leg(50.0, "EUR", "DE", "DE")),
            crypto: None,
        };
        let result = combiner.analyze(&event).await.unwrap();
        assert_eq!(result.risk_score, 0.0);
    }

    fn training_set() -> Vec<FiatLeg> {
        (0..100)
            .map(|i| fiat_leg(50.0 + (i % 40) as f64 * 2.0, "USD", "US", "US"))
            .collect()
    }
}
