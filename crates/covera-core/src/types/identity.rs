//! Session identity

use crate::identifiers::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an identity's signing capability comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningCapability {
    /// An external wallet provider holds the key
    ExternalWallet,
    /// A locally generated or imported key held in memory
    LocalKey,
}

impl fmt::Display for SigningCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExternalWallet => "external wallet",
            Self::LocalKey => "local key",
        })
    }
}

/// The resolved signing entity of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Account address
    pub address: Address,
    /// Capability origin
    pub capability: SigningCapability,
}

impl Identity {
    /// Identity backed by an external wallet account
    pub fn external(address: Address) -> Self {
        Self {
            address,
            capability: SigningCapability::ExternalWallet,
        }
    }

    /// Identity backed by a local key
    pub fn local(address: Address) -> Self {
        Self {
            address,
            capability: SigningCapability::LocalKey,
        }
    }

    /// True for local-key identities
    pub fn is_local(&self) -> bool {
        self.capability == SigningCapability::LocalKey
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address.short(), self.capability)
    }
}
