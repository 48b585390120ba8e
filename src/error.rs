//! Error taxonomy for the risk engine.
//!
//! Only two conditions surface as errors: an event with no legs at all, and
//! a registry list that fails to load at startup. Everything else degrades
//! to a risk opinion inside the channel analyzers.

use thiserror::Error;

/// Errors returned by the public engine surface.
#[derive(Debug, Error)]
pub enum RiskError {
    /// The event carried neither a fiat nor a crypto leg.
    #[error("event must carry at least one of a fiat or crypto leg")]
    EmptyEvent,

    /// A static risk list failed to load. Fatal at startup.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure to load the static address/jurisdiction lists.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read risk list {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse risk list {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
