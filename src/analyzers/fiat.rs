//! Fiat transaction anomaly analysis.
//!
//! Blends a trained isolation-forest score with deterministic rules. Until
//! `train` has been called the analyzer runs rule-only; afterwards the model
//! contributes 70% of the blended score. The trained model is swapped
//! atomically so concurrent analyze calls always see a complete model.

use crate::config::ScoringConfig;
use crate::geo::{is_ipv4_literal, GeoResolver};
use crate::model::{FeatureEncoder, ForestParams, IsolationForest, TrainedAnomalyModel};
use crate::registry::AddressRiskRegistry;
use crate::types::alert::ChannelResult;
use crate::types::event::FiatLeg;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fixed fallback score for structurally invalid input.
const INVALID_INPUT_RISK: f64 = 0.8;

/// Blend weights once the model is trained.
const MODEL_WEIGHT: f64 = 0.7;
const RULE_WEIGHT: f64 = 0.3;

/// Blended risk above which model-explanation alerts are emitted.
const EXPLANATION_THRESHOLD: f64 = 0.7;

/// Amount whose log1p marks an unusually large transaction for the model
/// explanation.
const UNUSUAL_AMOUNT: f64 = 5000.0;

pub struct FiatAnomalyAnalyzer {
    registry: Arc<AddressRiskRegistry>,
    geo: Arc<dyn GeoResolver>,
    model: ArcSwapOption<TrainedAnomalyModel>,
    params: ForestParams,
    large_amount_threshold: f64,
}

impl FiatAnomalyAnalyzer {
    pub fn new(
        registry: Arc<AddressRiskRegistry>,
        geo: Arc<dyn GeoResolver>,
        config: &ScoringConfig,
    ) -> Self {
        Self {
            registry,
            geo,
            model: ArcSwapOption::from(None),
            params: config.model.clone(),
            large_amount_threshold: config.large_amount_threshold,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.load().is_some()
    }

    /// Fit the anomaly model on historical legs and swap it in atomically.
    /// Empty input is a logged no-op; in-flight analyze calls keep the model
    /// snapshot they already loaded.
    pub fn train(&self, legs: &[FiatLeg]) {
        if legs.is_empty() {
            warn!("training data is empty, skipping training");
            return;
        }

        info!(samples = legs.len(), "training fiat anomaly model");
        let encoder = FeatureEncoder::fit(legs);
        let matrix = encoder.encode_matrix(legs);
        let forest = IsolationForest::fit(&matrix, &self.params);

        self.model
            .store(Some(Arc::new(TrainedAnomalyModel { encoder, forest })));
        info!(features = matrix[0].len(), "fiat anomaly model trained");
    }

    pub async fn analyze(&self, leg: &FiatLeg) -> ChannelResult {
        if !leg.is_valid() {
            warn!("invalid fiat transaction data");
            return ChannelResult::new(
                INVALID_INPUT_RISK,
                vec!["Invalid transaction data".to_string()],
            );
        }

        let (rule_score, mut alerts) = self.rule_based(leg).await;

        let model = self.model.load_full();
        let combined = match model.as_deref() {
            Some(model) => {
                let features = model.encoder.encode(leg);
                let decision = model.forest.decision_function(&features);
                // more anomalous -> lower decision -> higher risk
                let model_risk = (0.5 - decision / 2.0).clamp(0.0, 1.0);
                let combined = MODEL_WEIGHT * model_risk + RULE_WEIGHT * rule_score;

                if combined > EXPLANATION_THRESHOLD {
                    if model_risk > EXPLANATION_THRESHOLD {
                        alerts.push("Transaction flagged as anomalous by ML model".to_string());
                    }
                    if leg.card_country != leg.geo_signal {
                        alerts.push("Unusual geographic pattern detected".to_string());
                    }
                    if leg.amount.ln_1p() > UNUSUAL_AMOUNT.ln_1p() {
                        alerts.push("Unusual transaction amount".to_string());
                    }
                }
                combined
            }
            None => {
                debug!("model not trained, using rule-based analysis only");
                rule_score
            }
        };

        debug!(score = combined, alerts = alerts.len(), "fiat analysis complete");
        ChannelResult::new(combined, alerts)
    }

    async fn rule_based(&self, leg: &FiatLeg) -> (f64, Vec<String>) {
        let mut score: f64 = 0.0;
        let mut alerts = Vec::new();

        if leg.card_country != leg.geo_signal {
            if is_ipv4_literal(&leg.geo_signal) {
                match self.geo.resolve_country(&leg.geo_signal).await {
                    Some(country) if country == leg.card_country => {
                        // the IP resolves to the card's country: no mismatch
                    }
                    Some(country) => {
                        score += 0.5;
                        alerts.push(format!(
                            "Geo mismatch: {} IP vs {} card",
                            country, leg.card_country
                        ));
                    }
                    None => {
                        score += 0.5;
                        alerts.push(format!(
                            "Geo mismatch: {} vs {}",
                            leg.geo_signal, leg.card_country
                        ));
                    }
                }
            } else {
                score += 0.5;
                alerts.push(format!(
                    "Geo mismatch: {} vs {}",
                    leg.geo_signal, leg.card_country
                ));
            }
        }

        if leg.amount > self.large_amount_threshold {
            score += 0.3;
            alerts.push(format!(
                "Large transaction amount: {} {}",
                leg.amount, leg.currency
            ));
        }

        if let Some(entry) = self.registry.lookup_jurisdiction(&leg.card_country) {
            score += 0.4;
            alerts.push(format!(
                "Card from FATF {}-listed country: {}",
                entry.list_tier, leg.card_country
            ));
        }

        if let Some(entry) = self.registry.lookup_jurisdiction(&leg.geo_signal) {
            score += 0.4;
            alerts.push(format!(
                "IP from FATF {}-listed country: {}",
                entry.list_tier, leg.geo_signal
            ));
        }

        (score.min(1.0), alerts)
    }
}
