//! Ledger-explorer integration: transport seam, wire types, and the shared
//! rate-limited cache.

pub mod api;
pub mod client;

pub use api::{EtherscanApi, LedgerApi, LedgerError, LedgerQuery, LedgerTransaction};
pub use client::RateLimitedLedgerClient;
