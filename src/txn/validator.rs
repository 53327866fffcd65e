use crate::txn::{OnCompletion, SignedTransaction, TxnKind};
use thiserror::Error;

/// Errors that can occur when validating a signed transaction
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid signature: not signed by the sender's key")]
    InvalidSignature,

    #[error("Fee too low: {fee}, minimum {min}")]
    FeeTooLow { fee: u64, min: u64 },

    #[error("Clear state calls cannot carry arguments")]
    ClearStateWithArgs,
}

/// Stateless checks a host runs before applying a transaction
pub struct TxnValidator;

impl TxnValidator {
    /// Validate signature and fee
    pub fn validate(signed: &SignedTransaction, min_fee: u64) -> Result<(), ValidationError> {
        let txn = signed.txn();

        if !signed.verify() {
            return Err(ValidationError::InvalidSignature);
        }

        if txn.fee() < min_fee {
            return Err(ValidationError::FeeTooLow {
                fee: txn.fee(),
                min: min_fee,
            });
        }

        if let TxnKind::AppCall {
            on_completion: OnCompletion::ClearState,
            args,
            ..
        } = txn.kind()
        {
            if !args.is_empty() {
                return Err(ValidationError::ClearStateWithArgs);
            }
        }

        Ok(())
    }
}
