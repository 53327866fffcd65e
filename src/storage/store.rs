// MatchingStore - sled database behind the `matching` CLI
//
// Layout:
//   network:snapshot          postcard-encoded `Network`
//   account:key:<label>       32 secret key bytes

use crate::identity::{KeyError, Keypair};
use crate::ledger::Network;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;

const NETWORK_KEY: &[u8] = b"network:snapshot";
const ACCOUNT_PREFIX: &[u8] = b"account:key:";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Stored value is corrupt: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("Stored key for '{label}' is unusable: {source}")]
    BadKey {
        label: String,
        #[source]
        source: KeyError,
    },
}

/// Size of the database
#[derive(Clone, Copy, Debug)]
pub struct StorageStats {
    pub key_count: usize,
    /// As reported by sled, zero when unknown
    pub disk_size_bytes: u64,
}

pub struct MatchingStore {
    db: sled::Db,
}

impl MatchingStore {
    /// Open the database at `path`, creating it when missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Block until every write so far is on disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    fn put_encoded<T: Serialize>(&self, key: &[u8], value: &T) -> Result<(), StoreError> {
        self.db.insert(key, postcard::to_allocvec(value)?)?;
        Ok(())
    }

    fn get_decoded<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        self.db
            .get(key)?
            .map(|bytes| postcard::from_bytes(&bytes).map_err(StoreError::from))
            .transpose()
    }

    // ========================================================================
    // NETWORK
    // ========================================================================

    /// Replace the stored network with `network`
    pub fn save_network(&self, network: &Network) -> Result<(), StoreError> {
        self.put_encoded(NETWORK_KEY, network)
    }

    pub fn load_network(&self) -> Result<Option<Network>, StoreError> {
        self.get_decoded(NETWORK_KEY)
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    fn account_key(label: &str) -> Vec<u8> {
        [ACCOUNT_PREFIX, label.as_bytes()].concat()
    }

    /// Store a keypair under `label`, overwriting any previous one
    pub fn save_keypair(&self, label: &str, keypair: &Keypair) -> Result<(), StoreError> {
        self.db
            .insert(Self::account_key(label), keypair.to_bytes().as_slice())?;
        Ok(())
    }

    pub fn load_keypair(&self, label: &str) -> Result<Option<Keypair>, StoreError> {
        let Some(bytes) = self.db.get(Self::account_key(label))? else {
            return Ok(None);
        };
        Keypair::from_bytes(&bytes)
            .map(Some)
            .map_err(|source| StoreError::BadKey {
                label: label.to_string(),
                source,
            })
    }

    /// Labels of every stored keypair, in byte order
    pub fn keypair_labels(&self) -> Result<Vec<String>, StoreError> {
        self.db
            .scan_prefix(ACCOUNT_PREFIX)
            .keys()
            .map(|key| -> Result<String, StoreError> {
                let key = key?;
                Ok(String::from_utf8_lossy(&key[ACCOUNT_PREFIX.len()..]).into_owned())
            })
            .collect()
    }
}
