// Ed25519 account keys and the signatures they produce

use crate::identity::Address;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const SECRET_LEN: usize = 32;
const PUBLIC_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Expected {expected} bytes, found {found}")]
    WrongLength { expected: usize, found: usize },

    #[error("Not a valid Ed25519 public key: {0}")]
    NotOnCurve(String),
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], KeyError> {
    bytes.try_into().map_err(|_| KeyError::WrongLength {
        expected: N,
        found: bytes.len(),
    })
}

/// Serde adapter writing fixed arrays as one length-prefixed byte string
mod byte_array {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"a fixed-size byte array"))
    }
}

// ============================================================================
// SIGNATURE
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "byte_array")] [u8; SIGNATURE_LEN]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        Ok(Self(fixed(bytes)?))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", hex::encode(&self.0[..8]))
    }
}

// ============================================================================
// PUBLIC KEY
// ============================================================================

/// Verifying half of an account key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let bytes = fixed::<PUBLIC_LEN>(bytes)?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|e| KeyError::NotOnCurve(e.to_string()))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_LEN] {
        self.0.as_bytes()
    }

    /// The account this key signs for
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
        self.0.verify(message, &signature).is_ok()
    }
}

// ============================================================================
// KEYPAIR
// ============================================================================

/// Signing key of an externally owned account
#[derive(Clone)]
pub struct Keypair {
    secret: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::generate(&mut OsRng),
        }
    }

    /// Restore from the 32 secret bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret = fixed::<SECRET_LEN>(bytes)?;
        Ok(Self {
            secret: SigningKey::from_bytes(&secret),
        })
    }

    /// The 32 secret bytes; handle with care
    pub fn to_bytes(&self) -> [u8; SECRET_LEN] {
        self.secret.to_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.secret.verifying_key())
    }

    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.secret.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address().to_string())
            .finish_non_exhaustive()
    }
}
