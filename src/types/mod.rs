//! Type definitions for the risk engine

pub mod alert;
pub mod event;

pub use alert::{ChannelResult, CombinedResult, RiskLevel, RiskLevelThresholds};
pub use event::{CryptoLeg, FiatLeg, RiskEvent};
