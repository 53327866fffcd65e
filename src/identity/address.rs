use crate::identity::{KeyError, PublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Domain prefix hashed with an application id to derive its custody account
const APP_ADDRESS_PREFIX: &[u8] = b"appID";

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Address is not a valid public key: {0}")]
    NotAPublicKey(#[from] KeyError),
}

/// A 32-byte account address
///
/// Externally owned accounts use their Ed25519 public key bytes directly.
/// Application custody accounts are derived from the application id and
/// have no signing key. The all-zero address means "not configured".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    /// Address of the account controlled by a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(*public_key.as_bytes())
    }

    /// Custody address of a deployed application
    pub fn for_application(app_id: u64) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(APP_ADDRESS_PREFIX);
        hasher.update(app_id.to_be_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse the base58 text form
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Public key that signs for this address
    pub fn public_key(&self) -> Result<PublicKey, AddressError> {
        Ok(PublicKey::from_bytes(&self.0)?)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
