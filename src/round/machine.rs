// Round Machine - the transitions of a matching round
//
// Pending --match--> Active --match--> Active
// Pending --cancel (beneficiary/creator)--> Closed
// Ended   --settle (anyone)--> Closed
//
// Transitions are pure: they take the current round and the host
// environment and return the next round or the disposal payments. The host
// commits the result only if the whole transaction group succeeds.

use crate::identity::Address;
use crate::round::{Phase, Round, RoundError, RoundParams};
use crate::txn::{Transaction, TxnGroup, TxnType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Host facts visible to the round program during one call
#[derive(Clone, Debug)]
pub struct Environment {
    /// Latest committed block timestamp
    pub now: u64,
    /// Network minimum transaction fee
    pub min_fee: u64,
    /// Custody account of this instance
    pub app_address: Address,
    /// Account that deployed this instance
    pub creator: Address,
    /// Custody balance at the time of the call
    pub custody_balance: u64,
}

/// A match call together with the transfer that funds it
///
/// Both legs are validated as one unit; neither is accepted alone.
#[derive(Clone, Copy, Debug)]
pub struct MatchBundle<'a> {
    transfer: &'a Transaction,
    call: &'a Transaction,
}

impl<'a> MatchBundle<'a> {
    pub fn new(transfer: &'a Transaction, call: &'a Transaction) -> Self {
        Self { transfer, call }
    }

    /// Pair the call at `call_index` with the transaction just before it
    pub fn from_group(group: &'a TxnGroup, call_index: usize) -> Result<Self, RoundError> {
        let call = group
            .get(call_index)
            .ok_or(RoundError::MissingTransfer)?
            .txn();
        let transfer = call_index
            .checked_sub(1)
            .and_then(|i| group.get(i))
            .ok_or(RoundError::MissingTransfer)?
            .txn();
        Ok(Self { transfer, call })
    }

    pub fn transfer(&self) -> &Transaction {
        self.transfer
    }

    pub fn call(&self) -> &Transaction {
        self.call
    }
}

/// An outbound payment issued by the custody account while settling
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InnerPayment {
    /// Aggregate payout to the beneficiary; the custody account also pays
    /// one network fee for it
    Payout {
        receiver: Address,
        amount: u64,
        fee: u64,
    },
    /// Sweep of the entire remaining custody balance
    BurnRemainder { receiver: Address, amount: u64 },
}

impl InnerPayment {
    pub fn receiver(&self) -> &Address {
        match self {
            InnerPayment::Payout { receiver, .. } | InnerPayment::BurnRemainder { receiver, .. } => {
                receiver
            }
        }
    }

    pub fn amount(&self) -> u64 {
        match self {
            InnerPayment::Payout { amount, .. } | InnerPayment::BurnRemainder { amount, .. } => {
                *amount
            }
        }
    }

    pub fn fee(&self) -> u64 {
        match self {
            InnerPayment::Payout { fee, .. } => *fee,
            InnerPayment::BurnRemainder { .. } => 0,
        }
    }
}

/// Which disposal branch closed the round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisposalKind {
    /// Cancelled before the window opened
    EarlyCancel,
    /// Window ended with the threshold met; beneficiary paid
    Settled,
    /// Window ended below the threshold
    ThresholdNotMet,
    /// Window ended with no beneficiary configured
    NoBeneficiary,
}

/// Result of closing a round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    kind: DisposalKind,
    payments: Vec<InnerPayment>,
}

impl Settlement {
    pub fn kind(&self) -> DisposalKind {
        self.kind
    }

    pub fn payments(&self) -> &[InnerPayment] {
        &self.payments
    }

    /// Amount paid to the beneficiary, if any
    pub fn payout(&self) -> Option<u64> {
        self.payments.iter().find_map(|p| match p {
            InnerPayment::Payout { amount, .. } => Some(*amount),
            InnerPayment::BurnRemainder { .. } => None,
        })
    }

    /// Amount swept to the burn address
    pub fn burned(&self) -> u64 {
        self.payments
            .iter()
            .filter_map(|p| match p {
                InnerPayment::BurnRemainder { amount, .. } => Some(*amount),
                InnerPayment::Payout { .. } => None,
            })
            .sum()
    }

    /// Total drawn from custody, fees included
    pub fn total_debit(&self) -> u64 {
        self.payments.iter().map(|p| p.amount() + p.fee()).sum()
    }
}

/// Burn whatever remains; nothing is issued for an empty balance
fn burn_remainder(round: &Round, balance: u64, payments: &mut Vec<InnerPayment>) {
    if balance != 0 {
        payments.push(InnerPayment::BurnRemainder {
            receiver: *round.burn_address(),
            amount: balance,
        });
    }
}

/// Transitions of a matching round
pub struct RoundMachine;

impl RoundMachine {
    /// Deployment: a new round with zeroed counters
    pub fn create(params: RoundParams) -> Round {
        debug!(
            start = params.start_time,
            end = params.end_time,
            min_match = params.min_match,
            growth = params.match_growth,
            "creating round"
        );
        Round::new(params)
    }

    /// Register one match
    ///
    /// Only the tier count matters: a pledge above `min_match` earns the
    /// same single increment as an exact one.
    pub fn register_match(
        round: &Round,
        env: &Environment,
        bundle: &MatchBundle<'_>,
    ) -> Result<Round, RoundError> {
        if round.phase_at(env.now) != Phase::Active {
            return Err(RoundError::OutsideWindow {
                now: env.now,
                start: round.start_time(),
                end: round.end_time(),
            });
        }

        let transfer = bundle.transfer();
        if transfer.txn_type() != TxnType::Payment {
            return Err(RoundError::TransferNotPayment);
        }
        if transfer.sender() != bundle.call().sender() {
            return Err(RoundError::TransferSenderMismatch {
                transfer_sender: *transfer.sender(),
                call_sender: *bundle.call().sender(),
            });
        }
        if transfer.receiver() != Some(&env.app_address) {
            return Err(RoundError::TransferReceiverMismatch {
                receiver: transfer.receiver().copied().unwrap_or(Address::ZERO),
            });
        }

        let amount = transfer.amount();
        if amount < env.min_fee {
            return Err(RoundError::TransferBelowFee {
                amount,
                min_fee: env.min_fee,
            });
        }
        if amount < round.min_match() {
            return Err(RoundError::Underfunded {
                amount,
                min_match: round.min_match(),
            });
        }

        let next = round.with_match()?;
        debug!(
            matcher = %transfer.sender(),
            amount,
            num_matches = next.num_matches(),
            total = next.total_match_amount(),
            "match registered"
        );
        Ok(next)
    }

    /// Close the round: early cancel, post-window settlement, or rejection
    pub fn dispose(
        round: &Round,
        env: &Environment,
        caller: &Address,
    ) -> Result<Settlement, RoundError> {
        let mut payments = Vec::new();

        let kind = match round.phase_at(env.now) {
            Phase::Pending => {
                if caller != round.beneficiary() && *caller != env.creator {
                    return Err(RoundError::Unauthorized { caller: *caller });
                }
                burn_remainder(round, env.custody_balance, &mut payments);
                DisposalKind::EarlyCancel
            }
            Phase::Active => {
                return Err(RoundError::RoundActive {
                    now: env.now,
                    end_time: round.end_time(),
                });
            }
            Phase::Ended => {
                let kind = if round.beneficiary().is_zero() {
                    DisposalKind::NoBeneficiary
                } else if !round.threshold_met() {
                    DisposalKind::ThresholdNotMet
                } else {
                    DisposalKind::Settled
                };

                let mut balance = env.custody_balance;
                if kind == DisposalKind::Settled {
                    let total = round.total_match_amount();
                    let amount = total.checked_sub(env.min_fee).ok_or(RoundError::PayoutBelowFee {
                        total,
                        min_fee: env.min_fee,
                    })?;
                    balance = balance
                        .checked_sub(total)
                        .ok_or(RoundError::InsufficientCustody {
                            balance,
                            required: total,
                        })?;
                    payments.push(InnerPayment::Payout {
                        receiver: *round.beneficiary(),
                        amount,
                        fee: env.min_fee,
                    });
                }

                // Final sweep runs on every post-window branch.
                burn_remainder(round, balance, &mut payments);
                kind
            }
        };

        debug!(?kind, payments = payments.len(), "round disposed");
        Ok(Settlement { kind, payments })
    }
}
