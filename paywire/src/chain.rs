//! Blockchain identifiers used during payment negotiation.
//!
//! - [`ChainId`] - A CAIP-2 compliant chain identifier (e.g., `eip155:8453` for Base)
//! - [`NetworkFamily`] - The signing family a chain belongs to (EVM or Solana)

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// CAIP-2 namespace for EVM chains.
pub const EIP155_NAMESPACE: &str = "eip155";

/// CAIP-2 namespace for Solana clusters.
pub const SOLANA_NAMESPACE: &str = "solana";

/// A CAIP-2 compliant blockchain identifier.
///
/// The format is `namespace:reference` where:
///
/// - `namespace` identifies the blockchain family (e.g., `eip155`, `solana`)
/// - `reference` identifies the specific chain within that family
///
/// # Serialization
///
/// Serializes to/from a colon-separated string: `"eip155:8453"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Creates a new chain ID from namespace and reference components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// Returns the namespace component of the chain ID.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the reference component of the chain ID.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns the signing family of this chain, if it is one we can pay on.
    #[must_use]
    pub fn family(&self) -> Option<NetworkFamily> {
        NetworkFamily::from_namespace(&self.namespace)
    }

    /// Parses the reference of an `eip155` chain as a numeric chain ID.
    ///
    /// Returns `None` for other namespaces or non-numeric references.
    #[must_use]
    pub fn evm_chain_id(&self) -> Option<u64> {
        if self.namespace != EIP155_NAMESPACE {
            return None;
        }
        self.reference.parse().ok()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.to_string()
    }
}

/// Error returned when parsing an invalid chain ID string.
///
/// A valid chain ID must be in the format `namespace:reference` where both
/// components are non-empty strings.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain id format {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, reference) = s
            .split_once(':')
            .ok_or_else(|| ChainIdFormatError(s.into()))?;
        if namespace.is_empty() || reference.is_empty() {
            return Err(ChainIdFormatError(s.into()));
        }
        Ok(Self::new(namespace, reference))
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// The signing family of a chain.
///
/// Each family has exactly one signer implementation; a candidate is routed to
/// a signer by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    /// EIP-155 chains, paid with EIP-3009 authorizations.
    Evm,
    /// Solana clusters, paid with partially-signed SPL transfers.
    Solana,
}

impl NetworkFamily {
    /// Maps a CAIP-2 namespace to a family.
    #[must_use]
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            EIP155_NAMESPACE => Some(Self::Evm),
            SOLANA_NAMESPACE => Some(Self::Solana),
            _ => None,
        }
    }

    /// The CAIP-2 namespace for this family.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Evm => EIP155_NAMESPACE,
            Self::Solana => SOLANA_NAMESPACE,
        }
    }
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evm => f.write_str("evm"),
            Self::Solana => f.write_str("solana"),
        }
    }
}
