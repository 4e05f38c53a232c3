//! Deterministic address derivation.
//!
//! A deployment is identified by a salt built from a human readable label and a
//! version number. Bumping the version produces a new salt and therefore a new
//! target address: this is a re-deployment, not an upgrade.

use std::fmt;

use alloy_core::primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Serialize};

/// The `(label, version)` pair a deployment salt is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaltSeed {
    /// Human readable label, usually the contract family name.
    pub label: String,
    /// Version number. Changing it moves the contract to a new address.
    pub version: u64,
}

impl SaltSeed {
    pub fn new(label: impl Into<String>, version: u64) -> Self {
        Self {
            label: label.into(),
            version,
        }
    }

    /// The salt for this seed, see [`make_salt`].
    pub fn salt(&self) -> B256 {
        make_salt(&self.label, self.version)
    }
}

impl fmt::Display for SaltSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.label, self.version)
    }
}

/// Build a salt as `keccak256(abi.encodePacked(string label, uint256 version))`.
pub fn make_salt(label: &str, version: u64) -> B256 {
    let mut packed = Vec::with_capacity(label.len() + 32);
    packed.extend_from_slice(label.as_bytes());
    packed.extend_from_slice(&U256::from(version).to_be_bytes::<32>());
    keccak256(packed)
}

/// Compute the CREATE2 address for `(deployer, salt, init_code)`.
///
/// `deployer` is the account executing CREATE2, i.e. the factory contract.
/// The result only depends on its inputs, so a contract lands on the same
/// address on every chain where deployer and salt are held constant.
pub fn derive(deployer: Address, salt: B256, init_code: &[u8]) -> Address {
    deployer.create2_from_code(salt, init_code)
}
