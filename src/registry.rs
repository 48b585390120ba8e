//! Static address and jurisdiction risk lists.
//!
//! The built-in lists are examples and would be refreshed regularly in a
//! production deployment; a real system would connect to a specialized
//! provider. Either list can be replaced wholesale from a JSON file named in
//! the configuration. Loading happens once at startup and a malformed or
//! unreadable file is fatal.

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Category of a flagged blockchain address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressCategory {
    Mixer,
    Darknet,
    Scam,
}

impl AddressCategory {
    /// Base risk assigned to a direct hit of this category.
    pub fn base_risk(&self) -> f64 {
        match self {
            AddressCategory::Mixer => 0.9,
            AddressCategory::Darknet => 1.0,
            AddressCategory::Scam => 0.85,
        }
    }
}

/// A flagged address with its category and base risk. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRiskEntry {
    pub address: String,
    pub category: AddressCategory,
    pub base_risk: f64,
}

/// FATF-style jurisdiction list tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListTier {
    Grey,
    Black,
}

impl ListTier {
    pub fn risk_weight(&self) -> f64 {
        match self {
            ListTier::Grey => 0.7,
            ListTier::Black => 1.0,
        }
    }
}

impl fmt::Display for ListTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListTier::Grey => write!(f, "grey"),
            ListTier::Black => write!(f, "black"),
        }
    }
}

/// A listed country with its tier and risk weight. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionEntry {
    pub country_code: String,
    pub list_tier: ListTier,
    pub risk_weight: f64,
}

/// Wire shape of an address-list file entry: `{"address": ..., "category": ...}`.
#[derive(Debug, Deserialize)]
struct AddressListRecord {
    address: String,
    category: AddressCategory,
}

/// Wire shape of a jurisdiction-list file entry: `{"code": ..., "tier": ...}`.
#[derive(Debug, Deserialize)]
struct JurisdictionListRecord {
    code: String,
    tier: ListTier,
}

// Known mixer services (example addresses, for demonstration only)
const DEFAULT_MIXER_ADDRESSES: &[&str] = &[
    "0x8589427373d6d84e98730d7795d8f6f8731fda16",
    "0x722122df12d4e14e13ac3b6895a86e84145b6967",
    "0xd90e2f925da726b50c4ed8d0fb90ad053324f31b",
    "0xd96f2b1c14db8458374d9aca76e26c3d18364307",
    "0x4736dcf1b7a3d580672cce6e7c65cd5cc9cfba9d",
    "0x169ad27a470d064dede56a2d3ff727986b15d52b",
    "0x0836222f2b2b24a3f36f98668ed8f0b38d1a872f",
    "0xf67721a2d8f736e75a49fdd7fad2e31d8676542a",
    "0x9ad122c22b14202b4490edaf288fdb3c7cb3ff5e",
];

// Known darknet market addresses (examples for demonstration)
const DEFAULT_DARKNET_ADDRESSES: &[&str] = &[
    "0x3cbded43efdaf0fc77b9c55f6fc9988fcc9b757d",
    "0x2c7f66c0e2c62c6386a9b526a6cf546577d9d865",
    "0x33f4f55f3a427f2f1d1c2f11bbc2fd06a3ea9f46",
    "0xbc830d54ed5e9e26d3a30d71a1e8dc6d42860345",
    "0x67fa2c06c9c6d4332f330e14a66bdf1873ef3d2b",
    "0x9cb4b8297548f3be359f7ddf4302af6d2288e08f",
    "0x9cb4b8297548f3be359f7ddf4302af6d2288e09d",
];

// Known scam addresses (examples for demonstration)
const DEFAULT_SCAM_ADDRESSES: &[&str] = &[
    "0x1446d6a152245d26f79082202bcd8a8a34967f4b",
    "0x9e4c14403d7d9a499dc5d293f486926b7876b1a6",
    "0x3f17f1962b36e491b30a40b2405849e597ba5fb5",
    "0x4686a963fad842745afd3c45e622dfefd201a73a",
    "0x8c9b261faef3b3c2e64ab5e58e04615f8c788099",
];

// FATF grey list (jurisdictions under increased monitoring)
const DEFAULT_GREY_LIST: &[&str] = &[
    "AL", "BB", "BF", "BI", "BW", "CF", "DZ", "ES", "GH", "HT", "JM", "JO", "KH", "MA", "ML",
    "MU", "MZ", "NG", "PK", "PA", "SD", "SN", "SY", "TR", "UG", "YE", "ZW",
];

// FATF black list (call for action)
const DEFAULT_BLACK_LIST: &[&str] = &["KP", "IR"];

/// Loadable sets of flagged blockchain addresses and jurisdiction risk
/// lists. Lookup keys are normalized: addresses to lowercase, country codes
/// to uppercase.
pub struct AddressRiskRegistry {
    addresses: HashMap<String, AddressRiskEntry>,
    jurisdictions: HashMap<String, JurisdictionEntry>,
    mixers: HashSet<String>,
}

impl AddressRiskRegistry {
    /// Registry with the built-in example lists.
    pub fn builtin() -> Self {
        let mut addresses = Vec::new();
        for (list, category) in [
            (DEFAULT_MIXER_ADDRESSES, AddressCategory::Mixer),
            (DEFAULT_DARKNET_ADDRESSES, AddressCategory::Darknet),
            (DEFAULT_SCAM_ADDRESSES, AddressCategory::Scam),
        ] {
            for addr in list {
                addresses.push(AddressRiskEntry {
                    address: addr.to_string(),
                    category,
                    base_risk: category.base_risk(),
                });
            }
        }

        let mut jurisdictions = Vec::new();
        for (list, tier) in [
            (DEFAULT_GREY_LIST, ListTier::Grey),
            (DEFAULT_BLACK_LIST, ListTier::Black),
        ] {
            for code in list {
                jurisdictions.push(JurisdictionEntry {
                    country_code: code.to_string(),
                    list_tier: tier,
                    risk_weight: tier.risk_weight(),
                });
            }
        }

        Self::from_entries(addresses, jurisdictions)
    }

    /// Registry from config: built-in lists, with either list replaced from
    /// a JSON file when one is named. Fails on an unreadable or malformed
    /// file; this is the only fatal startup condition in the engine.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let addresses = match &config.addresses_file {
            Some(path) => load_address_file(path)?,
            None => Self::builtin().addresses.into_values().collect(),
        };
        let jurisdictions = match &config.jurisdictions_file {
            Some(path) => load_jurisdiction_file(path)?,
            None => Self::builtin().jurisdictions.into_values().collect(),
        };

        let registry = Self::from_entries(addresses, jurisdictions);
        info!(
            addresses = registry.addresses.len(),
            jurisdictions = registry.jurisdictions.len(),
            "risk registry loaded"
        );
        Ok(registry)
    }

    fn from_entries(
        addresses: Vec<AddressRiskEntry>,
        jurisdictions: Vec<JurisdictionEntry>,
    ) -> Self {
        let mut address_map = HashMap::new();
        let mut mixers = HashSet::new();
        for mut entry in addresses {
            entry.address = entry.address.to_ascii_lowercase();
            if entry.category == AddressCategory::Mixer {
                mixers.insert(entry.address.clone());
            }
            address_map.insert(entry.address.clone(), entry);
        }

        let mut jurisdiction_map = HashMap::new();
        for mut entry in jurisdictions {
            entry.country_code = entry.country_code.to_ascii_uppercase();
            jurisdiction_map.insert(entry.country_code.clone(), entry);
        }

        Self {
            addresses: address_map,
            jurisdictions: jurisdiction_map,
            mixers,
        }
    }

    /// Case-insensitive direct-hit lookup.
    pub fn lookup_address(&self, address: &str) -> Option<&AddressRiskEntry> {
        self.addresses.get(&address.to_ascii_lowercase())
    }

    /// Case-insensitive jurisdiction lookup.
    pub fn lookup_jurisdiction(&self, code: &str) -> Option<&JurisdictionEntry> {
        self.jurisdictions.get(&code.to_ascii_uppercase())
    }

    /// Whether an address belongs to the known-mixer set.
    pub fn is_mixer(&self, address: &str) -> bool {
        self.mixers.contains(&address.to_ascii_lowercase())
    }
}

fn load_address_file(path: &str) -> Result<Vec<AddressRiskEntry>, RegistryError> {
    let records: Vec<AddressListRecord> = load_json_list(path)?;
    Ok(records
        .into_iter()
        .map(|r| AddressRiskEntry {
            address: r.address,
            category: r.category,
            base_risk: r.category.base_risk(),
        })
        .collect())
}

fn load_jurisdiction_file(path: &str) -> Result<Vec<JurisdictionEntry>, RegistryError> {
    let records: Vec<JurisdictionListRecord> = load_json_list(path)?;
    Ok(records
        .into_iter()
        .map(|r| JurisdictionEntry {
            country_code: r.code,
            list_tier: r.tier,
            risk_weight: r.tier.risk_weight(),
        })
        .collect())
}

fn load_json_list<T: serde::de::DeserializeOwned>(path: &str) -> Result<Vec<T>, RegistryError> {
    let raw = std::fs::read_to_string(Path::new(path)).map_err(|source| RegistryError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RegistryError::Parse {
        path: path.to_string(),
        source,
    })
}
