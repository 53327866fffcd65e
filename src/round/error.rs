use crate::identity::{Address, AddressError};
use crate::round::SchemaError;
use crate::txn::OnCompletion;
use thiserror::Error;

/// Reasons the round program rejects a call
///
/// Any of these fails the whole transaction group.
#[derive(Error, Debug)]
pub enum RoundError {
    #[error("Global state error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Missing creation argument {index} ({name})")]
    MissingArgument { index: usize, name: &'static str },

    #[error("Integer argument {name} is {len} bytes, at most 8 allowed")]
    ArgumentTooLong { name: &'static str, len: usize },

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Group has no transaction at index {0}")]
    CallNotInGroup(usize),

    #[error("No method argument on application call")]
    MissingMethod,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Completion {0:?} is not supported by this program")]
    UnsupportedCompletion(OnCompletion),

    #[error("Outside the matching window: now {now}, window [{start}, {end})")]
    OutsideWindow { now: u64, start: u64, end: u64 },

    #[error("Match call has no preceding transfer in its group")]
    MissingTransfer,

    #[error("Paired transaction is not a plain payment")]
    TransferNotPayment,

    #[error("Paired transfer was sent by {transfer_sender}, call by {call_sender}")]
    TransferSenderMismatch {
        transfer_sender: Address,
        call_sender: Address,
    },

    #[error("Paired transfer pays {receiver}, not the round custody account")]
    TransferReceiverMismatch { receiver: Address },

    #[error("Paired transfer of {amount} is below the minimum fee {min_fee}")]
    TransferBelowFee { amount: u64, min_fee: u64 },

    #[error("Pledge of {amount} is below the minimum match {min_match}")]
    Underfunded { amount: u64, min_match: u64 },

    #[error("Arithmetic overflow in round counters")]
    Overflow,

    #[error("{caller} may not cancel the round before it starts")]
    Unauthorized { caller: Address },

    #[error("Round is active until {end_time}, cannot close at {now}")]
    RoundActive { now: u64, end_time: u64 },

    #[error("Match total {total} cannot cover the settlement fee {min_fee}")]
    PayoutBelowFee { total: u64, min_fee: u64 },

    #[error("Custody balance {balance} cannot cover payout of {required}")]
    InsufficientCustody { balance: u64, required: u64 },
}
