//! Anomaly-model components: feature encoding and the isolation forest.

pub mod features;
pub mod forest;

pub use features::FeatureEncoder;
pub use forest::{ForestParams, IsolationForest};

/// A complete trained model: the column layout it was fitted with plus the
/// fitted forest. Replaced wholesale on retrain, never mutated in place.
pub struct TrainedAnomalyModel {
    pub encoder: FeatureEncoder,
    pub forest: IsolationForest,
}
