//! Per-channel risk analyzers

pub mod crypto;
pub mod fiat;
pub mod stablecoin;

pub use crypto::CryptoRiskAnalyzer;
pub use fiat::FiatAnomalyAnalyzer;
pub use stablecoin::StablecoinTransferAnalyzer;
