//! Payment event data structures for risk analysis

use serde::{Deserialize, Serialize};

/// Fiat card-payment attributes of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiatLeg {
    /// Transaction amount in the given currency
    pub amount: f64,

    /// Currency code (e.g. "USD", "EUR")
    pub currency: String,

    /// Two-letter issuing country of the card
    pub card_country: String,

    /// Where the payment came from: an IPv4 literal or a two-letter
    /// country code
    pub geo_signal: String,
}

impl FiatLeg {
    /// Boundary validation: all fields present and plausible.
    pub fn is_valid(&self) -> bool {
        self.amount.is_finite()
            && self.amount > 0.0
            && !self.currency.is_empty()
            && self.card_country.len() == 2
            && !self.geo_signal.is_empty()
    }
}

/// Crypto attributes of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoLeg {
    /// Ethereum-style address: `0x` followed by 40 hex characters
    pub address: String,

    /// Token symbol (e.g. "ETH", "USDC")
    pub currency: String,

    /// Transfer amount in display units
    pub amount: f64,
}

impl CryptoLeg {
    pub fn is_valid(&self) -> bool {
        is_valid_eth_address(&self.address) && self.amount.is_finite() && self.amount > 0.0
    }
}

/// Check the fixed `0x` + 40-hex-chars address shape.
pub fn is_valid_eth_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// A payment event to be scored. At least one leg must be present; the
/// combiner rejects an event with neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    #[serde(default)]
    pub fiat: Option<FiatLeg>,

    #[serde(default)]
    pub crypto: Option<CryptoLeg>,
}

impl RiskEvent {
    pub fn has_leg(&self) -> bool {
        self.fiat.is_some() || self.crypto.is_some()
    }
}
