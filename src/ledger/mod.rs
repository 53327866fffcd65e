// Ledger module - THE NETWORK HOST
// Native balances, deployed rounds, and atomic execution of transaction groups

mod accounts;
mod network;

pub use accounts::{Accounts, LedgerError};
pub use network::{AppInstance, Confirmation, ExecutionError, GroupReceipt, Network, NetworkConfig};
