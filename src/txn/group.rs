// Atomic transaction groups
//
// Every member of a multi-transaction group carries the same group id,
// computed over the ids of the members without their group field. The host
// applies a group all-or-nothing.

use crate::txn::{SignedTransaction, Transaction, TxnId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Maximum number of transactions in one atomic group
pub const MAX_GROUP_SIZE: usize = 16;

const GROUP_DOMAIN: &[u8] = b"TG";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GroupError {
    #[error("Empty group")]
    Empty,

    #[error("Group too large: {size} transactions, at most {max} allowed")]
    TooLarge { size: usize, max: usize },

    #[error("Transaction {0} has no group id")]
    MissingGroupId(usize),

    #[error("Transaction {0} carries a group id that does not match the group")]
    GroupIdMismatch(usize),
}

/// Identifier binding the members of an atomic group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId([u8; 32]);

impl GroupId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Compute the group id of a list of transactions
pub fn compute_group_id<'a, I>(txns: I) -> GroupId
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut hasher = Sha256::new();
    hasher.update(GROUP_DOMAIN);
    for txn in txns {
        let mut bare = txn.clone();
        bare.set_group(None);
        hasher.update(bare.id().as_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    GroupId(bytes)
}

/// Stamp a shared group id on every transaction
pub fn assign_group_id(mut txns: Vec<Transaction>) -> Result<Vec<Transaction>, GroupError> {
    check_size(txns.len())?;
    let group_id = compute_group_id(&txns);
    for txn in txns.iter_mut() {
        txn.set_group(Some(group_id));
    }
    Ok(txns)
}

fn check_size(size: usize) -> Result<(), GroupError> {
    if size == 0 {
        return Err(GroupError::Empty);
    }
    if size > MAX_GROUP_SIZE {
        return Err(GroupError::TooLarge {
            size,
            max: MAX_GROUP_SIZE,
        });
    }
    Ok(())
}

/// A validated atomic group of signed transactions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxnGroup {
    txns: Vec<SignedTransaction>,
}

impl TxnGroup {
    /// Build a group, checking size and group id consistency
    ///
    /// A lone transaction may omit its group id.
    pub fn new(txns: Vec<SignedTransaction>) -> Result<Self, GroupError> {
        check_size(txns.len())?;

        let expected = compute_group_id(txns.iter().map(|s| s.txn()));
        let lone = txns.len() == 1;
        for (index, signed) in txns.iter().enumerate() {
            match signed.txn().group() {
                Some(group) if *group == expected => {}
                Some(_) => return Err(GroupError::GroupIdMismatch(index)),
                None if lone => {}
                None => return Err(GroupError::MissingGroupId(index)),
            }
        }

        Ok(Self { txns })
    }

    /// A group holding one ungrouped transaction
    pub fn single(txn: SignedTransaction) -> Result<Self, GroupError> {
        Self::new(vec![txn])
    }

    pub fn len(&self) -> usize {
        self.txns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SignedTransaction> {
        self.txns.get(index)
    }

    pub fn transactions(&self) -> &[SignedTransaction] {
        &self.txns
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignedTransaction> {
        self.txns.iter()
    }

    pub fn ids(&self) -> Vec<TxnId> {
        self.txns.iter().map(|s| s.id()).collect()
    }

    /// Id of the last transaction, the one clients wait on
    pub fn last_id(&self) -> Option<TxnId> {
        self.txns.last().map(|s| s.id())
    }

    pub fn into_inner(self) -> Vec<SignedTransaction> {
        self.txns
    }
}
