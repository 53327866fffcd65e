use crate::txn::{GroupError, SignedTransaction, TxnGroup};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode group: {0}")]
    EncodeError(String),

    #[error("Failed to decode group: {0}")]
    DecodeError(String),

    #[error("Decoded transactions do not form a valid group: {0}")]
    InvalidGroup(#[from] GroupError),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// Codec for moving signed groups between signer and submitter
pub struct TxnCodec;

impl TxnCodec {
    /// Encode a group to compact postcard bytes
    pub fn encode(group: &TxnGroup) -> Result<Vec<u8>, CodecError> {
        postcard::to_allocvec(group.transactions())
            .map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    /// Decode a group, re-checking its group ids
    pub fn decode(bytes: &[u8]) -> Result<TxnGroup, CodecError> {
        let txns: Vec<SignedTransaction> =
            postcard::from_bytes(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))?;
        Ok(TxnGroup::new(txns)?)
    }

    pub fn encode_hex(group: &TxnGroup) -> Result<String, CodecError> {
        Ok(hex::encode(Self::encode(group)?))
    }

    pub fn decode_hex(hex_str: &str) -> Result<TxnGroup, CodecError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// Encode to base64 string (URL-safe, no padding)
    pub fn encode_base64(group: &TxnGroup) -> Result<String, CodecError> {
        Ok(URL_SAFE_NO_PAD.encode(Self::encode(group)?))
    }

    pub fn decode_base64(b64_str: &str) -> Result<TxnGroup, CodecError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str.trim())
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}
