//! Fraud Risk Engine
//!
//! Cross-channel risk scoring for payment events carrying a fiat leg, a
//! crypto leg, or both. The engine exposes two entry points: `train`, which
//! fits the fiat anomaly model on historical data, and `analyze`, which
//! fans an event out to the applicable channel analyzers and merges their
//! scores into one normalized result with a risk tier and explanatory
//! alerts.

pub mod analyzers;
pub mod combiner;
pub mod config;
pub mod error;
pub mod geo;
pub mod ledger;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod types;

pub use combiner::RiskCombiner;
pub use config::AppConfig;
pub use error::RiskError;
pub use geo::{GeoResolver, IpinfoResolver};
pub use ledger::{EtherscanApi, RateLimitedLedgerClient};
pub use registry::AddressRiskRegistry;
pub use types::{ChannelResult, CombinedResult, CryptoLeg, FiatLeg, RiskEvent, RiskLevel};
