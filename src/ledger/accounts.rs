// Native-unit balances of every account on the network

use crate::identity::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when moving funds
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance in {address}: available {available}, required {required}")]
    InsufficientBalance {
        address: Address,
        available: u64,
        required: u64,
    },

    #[error("Balance would overflow")]
    BalanceOverflow,
}

/// Balances keyed by address
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounts {
    balances: BTreeMap<Address, u64>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account (zero if it does not exist)
    pub fn balance(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.balances.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &u64)> {
        self.balances.iter()
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u64 {
        self.balances.values().fold(0u64, |acc, b| acc.saturating_add(*b))
    }

    pub fn credit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self.balances.entry(*address).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(())
    }

    pub fn debit(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        let available = self.balance(address);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                address: *address,
                available,
                required: amount,
            });
        }
        if amount > 0 {
            self.balances.insert(*address, available - amount);
        }
        Ok(())
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, amount: u64) -> Result<(), LedgerError> {
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    /// Move the whole balance of `from` to `to` and remove `from`
    ///
    /// Returns the amount moved.
    pub fn close_out(&mut self, from: &Address, to: &Address) -> Result<u64, LedgerError> {
        let amount = self.balances.remove(from).unwrap_or(0);
        if from != to {
            self.credit(to, amount)?;
        } else if amount > 0 {
            self.balances.insert(*from, amount);
        }
        Ok(amount)
    }

    /// Drop an account whose balance reached zero
    pub fn remove_if_empty(&mut self, address: &Address) {
        if self.balances.get(address) == Some(&0) {
            self.balances.remove(address);
        }
    }
}
