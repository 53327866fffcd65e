// Global key/value storage of an application instance
//
// The store enforces the slot counts the application reserved at creation.
// A missing integer key reads as zero.

use crate::txn::StateSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Global slots a round reserves: 7 integers, 2 byte strings
pub const ROUND_GLOBAL_SCHEMA: StateSchema = StateSchema {
    num_uints: 7,
    num_byte_slices: 2,
};

/// Rounds keep no per-account state
pub const ROUND_LOCAL_SCHEMA: StateSchema = StateSchema::EMPTY;

/// Maximum key length in bytes
pub const MAX_KEY_LEN: usize = 64;

/// Storage keys of a round
pub mod keys {
    pub const BENEFICIARY: &[u8] = b"beneficiary";
    pub const START_TIME: &[u8] = b"start";
    pub const END_TIME: &[u8] = b"end_time";
    /// Declared by the deployed schema; never read or written
    pub const RESERVE_AMOUNT: &[u8] = b"reserve_amount";
    pub const MIN_MATCH: &[u8] = b"min_match";
    pub const NUM_MATCHES: &[u8] = b"num_matches";
    pub const MATCH_GROWTH: &[u8] = b"match_growth_key";
    pub const BURN_ACCOUNT: &[u8] = b"burn_account";
    pub const TOTAL_MATCH_AMOUNT: &[u8] = b"match_amount";
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Integer slots exhausted: schema allows {0}")]
    UintSlotsExhausted(u64),

    #[error("Byte-string slots exhausted: schema allows {0}")]
    ByteSlotsExhausted(u64),

    #[error("Key too long: {0} bytes")]
    KeyTooLong(usize),

    #[error("Key {key} holds {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Key {0} is not set")]
    MissingKey(String),
}

/// A stored value
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl StateValue {
    fn type_name(&self) -> &'static str {
        match self {
            StateValue::Uint(_) => "uint",
            StateValue::Bytes(_) => "bytes",
        }
    }
}

/// Global key/value state of one application
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    schema: StateSchema,
    entries: BTreeMap<Vec<u8>, StateValue>,
}

impl GlobalState {
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            entries: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&StateValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &StateValue)> {
        self.entries.iter()
    }

    /// Read an integer, treating a missing key as zero
    pub fn get_uint(&self, key: &[u8]) -> Result<u64, SchemaError> {
        match self.entries.get(key) {
            None => Ok(0),
            Some(StateValue::Uint(value)) => Ok(*value),
            Some(other) => Err(SchemaError::TypeMismatch {
                key: String::from_utf8_lossy(key).into_owned(),
                expected: "uint",
                found: other.type_name(),
            }),
        }
    }

    /// Read a byte string that must be present
    pub fn get_bytes(&self, key: &[u8]) -> Result<&[u8], SchemaError> {
        match self.entries.get(key) {
            None => Err(SchemaError::MissingKey(String::from_utf8_lossy(key).into_owned())),
            Some(StateValue::Bytes(value)) => Ok(value),
            Some(other) => Err(SchemaError::TypeMismatch {
                key: String::from_utf8_lossy(key).into_owned(),
                expected: "bytes",
                found: other.type_name(),
            }),
        }
    }

    /// Write a value; rejected if it would exceed the reserved slots
    pub fn put(&mut self, key: &[u8], value: StateValue) -> Result<(), SchemaError> {
        if key.len() > MAX_KEY_LEN {
            return Err(SchemaError::KeyTooLong(key.len()));
        }

        let previous = self.entries.get(key);
        let (mut uints, mut byte_slices) = self.counts();
        match previous {
            Some(StateValue::Uint(_)) => uints -= 1,
            Some(StateValue::Bytes(_)) => byte_slices -= 1,
            None => {}
        }
        match value {
            StateValue::Uint(_) => uints += 1,
            StateValue::Bytes(_) => byte_slices += 1,
        }

        if uints > self.schema.num_uints {
            return Err(SchemaError::UintSlotsExhausted(self.schema.num_uints));
        }
        if byte_slices > self.schema.num_byte_slices {
            return Err(SchemaError::ByteSlotsExhausted(self.schema.num_byte_slices));
        }

        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    pub fn put_uint(&mut self, key: &[u8], value: u64) -> Result<(), SchemaError> {
        self.put(key, StateValue::Uint(value))
    }

    pub fn put_bytes(&mut self, key: &[u8], value: &[u8]) -> Result<(), SchemaError> {
        self.put(key, StateValue::Bytes(value.to_vec()))
    }

    pub fn delete(&mut self, key: &[u8]) -> Option<StateValue> {
        self.entries.remove(key)
    }

    /// Slots in use: (integers, byte strings)
    pub fn counts(&self) -> (u64, u64) {
        self.entries
            .values()
            .fold((0, 0), |(uints, bytes), value| match value {
                StateValue::Uint(_) => (uints + 1, bytes),
                StateValue::Bytes(_) => (uints, bytes + 1),
            })
    }
}
