//! Feature encoding for the fiat anomaly model.
//!
//! Mirrors the preprocessing used at training time: one-hot encoding of the
//! categorical attributes, a binary geo-mismatch feature, and a log1p
//! transform of the amount. Serving-time vectors are aligned to the
//! training column set; unseen categories drop out and missing columns
//! stay zero.

use crate::types::event::FiatLeg;
use std::collections::{BTreeSet, HashMap};

const GEO_MISMATCH_COLUMN: &str = "geo_mismatch";
const LOG_AMOUNT_COLUMN: &str = "log_amount";

/// Column layout fitted on a training set.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureEncoder {
    /// Derive the column set from training data: sorted one-hot columns for
    /// every categorical value seen, then the two engineered features.
    pub fn fit(legs: &[FiatLeg]) -> Self {
        let mut dummies = BTreeSet::new();
        for leg in legs {
            dummies.insert(format!("currency_{}", leg.currency));
            dummies.insert(format!("card_{}", leg.card_country));
            dummies.insert(format!("geo_{}", leg.geo_signal));
        }

        let mut columns: Vec<String> = dummies.into_iter().collect();
        columns.push(GEO_MISMATCH_COLUMN.to_string());
        columns.push(LOG_AMOUNT_COLUMN.to_string());

        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Self { columns, index }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Encode one leg against the fitted column set.
    pub fn encode(&self, leg: &FiatLeg) -> Vec<f64> {
        let mut features = vec![0.0; self.columns.len()];

        for name in [
            format!("currency_{}", leg.currency),
            format!("card_{}", leg.card_country),
            format!("geo_{}", leg.geo_signal),
        ] {
            if let Some(&i) = self.index.get(&name) {
                features[i] = 1.0;
            }
        }

        if let Some(&i) = self.index.get(GEO_MISMATCH_COLUMN) {
            features[i] = if leg.card_country != leg.geo_signal {
                1.0
            } else {
                0.0
            };
        }
        if let Some(&i) = self.index.get(LOG_AMOUNT_COLUMN) {
            features[i] = leg.amount.ln_1p();
        }

        features
    }

    pub fn encode_matrix(&self, legs: &[FiatLeg]) -> Vec<Vec<f64>> {
        legs.iter().map(|leg| self.encode(leg)).collect()
    }
}
