// Network - serial, all-or-nothing execution of transaction groups
//
// Every group is validated up front, then applied in order against a
// snapshot of balances and application state. Any failure restores the
// snapshot, so a rejected group leaves no trace beyond the error.

use crate::identity::Address;
use crate::ledger::{Accounts, LedgerError};
use crate::round::{
    Environment, GlobalState, InnerPayment, ProgramOutcome, RoundError, RoundProgram,
};
use crate::txn::{
    AppId, TxnGroup, TxnId, TxnKind, TxnValidator, ValidationError, DEFAULT_MIN_TXN_FEE,
    MAX_GROUP_SIZE,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// NETWORK CONFIG
// ============================================================================

/// Configuration for a network host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Minimum fee every transaction must carry
    pub min_txn_fee: u64,
    /// Largest group the host accepts
    pub max_group_size: usize,
    /// Timestamp of the genesis block
    pub genesis_timestamp: u64,
    /// Account that collects transaction fees
    pub fee_sink: Address,
}

impl NetworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_txn_fee(mut self, fee: u64) -> Self {
        self.min_txn_fee = fee;
        self
    }

    pub fn with_max_group_size(mut self, size: usize) -> Self {
        self.max_group_size = size;
        self
    }

    pub fn with_genesis_timestamp(mut self, timestamp: u64) -> Self {
        self.genesis_timestamp = timestamp;
        self
    }

    pub fn with_fee_sink(mut self, fee_sink: Address) -> Self {
        self.fee_sink = fee_sink;
        self
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.min_txn_fee == 0 {
            return Err(ExecutionError::InvalidConfig(
                "min_txn_fee must be > 0".to_string(),
            ));
        }
        if self.max_group_size == 0 || self.max_group_size > MAX_GROUP_SIZE {
            return Err(ExecutionError::InvalidConfig(format!(
                "max_group_size must be in 1..={}",
                MAX_GROUP_SIZE
            )));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_txn_fee: DEFAULT_MIN_TXN_FEE,
            max_group_size: MAX_GROUP_SIZE,
            genesis_timestamp: 0,
            fee_sink: Address::ZERO,
        }
    }
}

// ============================================================================
// EXECUTION ERROR
// ============================================================================

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Group of {size} exceeds the host limit of {max}")]
    GroupTooLarge { size: usize, max: usize },

    #[error("Transaction {index} is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("Transaction {index} ({id}) was already confirmed or repeats in the group")]
    Duplicate { index: usize, id: TxnId },

    #[error("Transaction {index} failed: {source}")]
    Ledger {
        index: usize,
        #[source]
        source: LedgerError,
    },

    #[error("Transaction {index} calls unknown application {app_id}")]
    NoSuchApp { index: usize, app_id: AppId },

    #[error("Program rejected transaction {index}: {source}")]
    Rejected {
        index: usize,
        #[source]
        source: RoundError,
    },

    #[error("Clock cannot move backwards: latest {latest}, requested {requested}")]
    ClockRegression { latest: u64, requested: u64 },
}

impl ExecutionError {
    /// The program's reason, when the program rejected the group
    pub fn round_error(&self) -> Option<&RoundError> {
        match self {
            ExecutionError::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============================================================================
// APPLICATIONS AND RECEIPTS
// ============================================================================

/// A deployed round instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInstance {
    id: AppId,
    creator: Address,
    global: GlobalState,
}

impl AppInstance {
    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn creator(&self) -> &Address {
        &self.creator
    }

    pub fn address(&self) -> Address {
        self.id.address()
    }

    pub fn global_state(&self) -> &GlobalState {
        &self.global
    }
}

/// Finality record of one transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Block height the transaction was committed in
    pub round: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Application created by this transaction
    pub created_app: Option<AppId>,
    /// Payments the application issued while settling this call
    pub inner_payments: Vec<InnerPayment>,
}

/// Result of a committed group
#[derive(Clone, Debug)]
pub struct GroupReceipt {
    round: u64,
    confirmations: Vec<(TxnId, Confirmation)>,
}

impl GroupReceipt {
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn txn_ids(&self) -> Vec<TxnId> {
        self.confirmations.iter().map(|(id, _)| *id).collect()
    }

    pub fn confirmations(&self) -> &[(TxnId, Confirmation)] {
        &self.confirmations
    }

    pub fn created_app(&self) -> Option<AppId> {
        self.confirmations.iter().find_map(|(_, c)| c.created_app)
    }

    pub fn inner_payments(&self) -> Vec<&InnerPayment> {
        self.confirmations
            .iter()
            .flat_map(|(_, c)| c.inner_payments.iter())
            .collect()
    }
}

#[derive(Default)]
struct TxnEffect {
    created_app: Option<AppId>,
    inner_payments: Vec<InnerPayment>,
}

// ============================================================================
// NETWORK
// ============================================================================

/// Single-instance host that executes groups one at a time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    config: NetworkConfig,
    accounts: Accounts,
    apps: BTreeMap<AppId, AppInstance>,
    next_app_id: u64,
    height: u64,
    latest_timestamp: u64,
    confirmed: HashMap<TxnId, Confirmation>,
}

impl Network {
    /// Create a network at its genesis block
    pub fn new(config: NetworkConfig) -> Result<Self, ExecutionError> {
        config.validate()?;
        let latest_timestamp = config.genesis_timestamp;
        Ok(Self {
            config,
            accounts: Accounts::new(),
            apps: BTreeMap::new(),
            next_app_id: 1,
            height: 0,
            latest_timestamp,
            confirmed: HashMap::new(),
        })
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn min_txn_fee(&self) -> u64 {
        self.config.min_txn_fee
    }

    /// Height of the last committed block
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Timestamp programs observe as "now"
    pub fn latest_timestamp(&self) -> u64 {
        self.latest_timestamp
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn balance(&self, address: &Address) -> u64 {
        self.accounts.balance(address)
    }

    pub fn app(&self, app_id: &AppId) -> Option<&AppInstance> {
        self.apps.get(app_id)
    }

    pub fn apps(&self) -> impl Iterator<Item = &AppInstance> {
        self.apps.values()
    }

    pub fn confirmation(&self, id: &TxnId) -> Option<&Confirmation> {
        self.confirmed.get(id)
    }

    /// Mint funds into an account (development faucet)
    pub fn fund(&mut self, address: &Address, amount: u64) -> Result<(), LedgerError> {
        self.accounts.credit(address, amount)?;
        info!(%address, amount, "account funded");
        Ok(())
    }

    /// Move the clock forward
    pub fn advance_time(&mut self, secs: u64) {
        self.latest_timestamp = self.latest_timestamp.saturating_add(secs);
        debug!(now = self.latest_timestamp, "clock advanced");
    }

    /// Set the clock to an absolute time no earlier than the current one
    pub fn set_timestamp(&mut self, timestamp: u64) -> Result<(), ExecutionError> {
        if timestamp < self.latest_timestamp {
            return Err(ExecutionError::ClockRegression {
                latest: self.latest_timestamp,
                requested: timestamp,
            });
        }
        self.latest_timestamp = timestamp;
        Ok(())
    }

    /// Apply a group atomically and commit it as one block
    pub fn submit(&mut self, group: TxnGroup) -> Result<GroupReceipt, ExecutionError> {
        self.check_group(&group)?;

        let snapshot_accounts = self.accounts.clone();
        let snapshot_apps = self.apps.clone();
        let snapshot_next_app_id = self.next_app_id;

        let mut effects = Vec::with_capacity(group.len());
        for index in 0..group.len() {
            match self.apply_txn(&group, index) {
                Ok(effect) => effects.push(effect),
                Err(e) => {
                    self.accounts = snapshot_accounts;
                    self.apps = snapshot_apps;
                    self.next_app_id = snapshot_next_app_id;
                    warn!(error = %e, size = group.len(), "group rejected");
                    return Err(e);
                }
            }
        }

        self.height += 1;
        let confirmations: Vec<(TxnId, Confirmation)> = group
            .iter()
            .zip(effects)
            .map(|(signed, effect)| {
                (
                    signed.id(),
                    Confirmation {
                        round: self.height,
                        timestamp: self.latest_timestamp,
                        created_app: effect.created_app,
                        inner_payments: effect.inner_payments,
                    },
                )
            })
            .collect();
        for (id, confirmation) in &confirmations {
            self.confirmed.insert(*id, confirmation.clone());
        }

        debug!(round = self.height, size = group.len(), "group committed");
        Ok(GroupReceipt {
            round: self.height,
            confirmations,
        })
    }

    fn check_group(&self, group: &TxnGroup) -> Result<(), ExecutionError> {
        if group.len() > self.config.max_group_size {
            return Err(ExecutionError::GroupTooLarge {
                size: group.len(),
                max: self.config.max_group_size,
            });
        }

        let mut seen = HashSet::new();
        for (index, signed) in group.iter().enumerate() {
            TxnValidator::validate(signed, self.config.min_txn_fee)
                .map_err(|source| ExecutionError::Invalid { index, source })?;

            let id = signed.id();
            if self.confirmed.contains_key(&id) || !seen.insert(id) {
                return Err(ExecutionError::Duplicate { index, id });
            }
        }
        Ok(())
    }

    fn apply_txn(&mut self, group: &TxnGroup, index: usize) -> Result<TxnEffect, ExecutionError> {
        let ledger_err = |source: LedgerError| ExecutionError::Ledger { index, source };
        let rejected = |source: RoundError| ExecutionError::Rejected { index, source };

        let txn = match group.get(index) {
            Some(signed) => signed.txn(),
            None => return Ok(TxnEffect::default()),
        };
        let sender = *txn.sender();

        self.accounts
            .transfer(&sender, &self.config.fee_sink, txn.fee())
            .map_err(ledger_err)?;

        match txn.kind() {
            TxnKind::Payment {
                receiver,
                amount,
                close_remainder_to,
            } => {
                self.accounts
                    .transfer(&sender, receiver, *amount)
                    .map_err(ledger_err)?;
                if let Some(close_to) = close_remainder_to {
                    self.accounts
                        .close_out(&sender, close_to)
                        .map_err(ledger_err)?;
                }
                Ok(TxnEffect::default())
            }

            TxnKind::AppCreate {
                args,
                global_schema,
                ..
            } => {
                let app_id = AppId::new(self.next_app_id);
                let mut global = GlobalState::new(*global_schema);
                let round = RoundProgram::on_create(args, &mut global).map_err(rejected)?;

                self.next_app_id += 1;
                self.apps.insert(
                    app_id,
                    AppInstance {
                        id: app_id,
                        creator: sender,
                        global,
                    },
                );
                info!(
                    app = %app_id,
                    creator = %sender,
                    start = round.start_time(),
                    end = round.end_time(),
                    "round created"
                );
                Ok(TxnEffect {
                    created_app: Some(app_id),
                    inner_payments: Vec::new(),
                })
            }

            TxnKind::AppCall {
                app_id,
                on_completion,
                ..
            } => {
                let instance = self.apps.get(app_id).ok_or(ExecutionError::NoSuchApp {
                    index,
                    app_id: *app_id,
                })?;
                let app_address = app_id.address();
                let env = Environment {
                    now: self.latest_timestamp,
                    min_fee: self.config.min_txn_fee,
                    app_address,
                    creator: instance.creator,
                    custody_balance: self.accounts.balance(&app_address),
                };

                // Program writes land on a copy and replace the original only on success.
                let mut global = instance.global.clone();
                let outcome = RoundProgram::on_call(group, index, *on_completion, &env, &mut global)
                    .map_err(rejected)?;

                match outcome {
                    ProgramOutcome::Matched(round) => {
                        if let Some(instance) = self.apps.get_mut(app_id) {
                            instance.global = global;
                        }
                        info!(
                            app = %app_id,
                            matcher = %sender,
                            num_matches = round.num_matches(),
                            total = round.total_match_amount(),
                            "match accepted"
                        );
                        Ok(TxnEffect::default())
                    }
                    ProgramOutcome::Disposed(settlement) => {
                        for payment in settlement.payments() {
                            self.pay_inner(&app_address, payment).map_err(ledger_err)?;
                        }
                        self.accounts.remove_if_empty(&app_address);
                        self.apps.remove(app_id);
                        info!(
                            app = %app_id,
                            kind = ?settlement.kind(),
                            payout = settlement.payout().unwrap_or(0),
                            burned = settlement.burned(),
                            "round closed"
                        );
                        Ok(TxnEffect {
                            created_app: None,
                            inner_payments: settlement.payments().to_vec(),
                        })
                    }
                    ProgramOutcome::Cleared => Ok(TxnEffect::default()),
                }
            }
        }
    }

    fn pay_inner(&mut self, app_address: &Address, payment: &InnerPayment) -> Result<(), LedgerError> {
        match payment {
            InnerPayment::Payout {
                receiver,
                amount,
                fee,
            } => {
                self.accounts.transfer(app_address, &self.config.fee_sink, *fee)?;
                self.accounts.transfer(app_address, receiver, *amount)
            }
            InnerPayment::BurnRemainder { receiver, amount } => {
                self.accounts.transfer(app_address, receiver, *amount)
            }
        }
    }
}
