// Node - serialized access to a network host
//
// A `LocalNode` task owns the `Network` and drains one command inbox, so
// groups from concurrent clients are applied strictly one after another.

use crate::identity::Address;
use crate::ledger::{AppInstance, Confirmation, ExecutionError, GroupReceipt, LedgerError, Network};
use crate::round::RoundError;
use crate::txn::{AppId, BuildError, GroupError, TxnGroup, TxnId};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Capacity of a node's command inbox
pub const NODE_INBOX_CAPACITY: usize = 64;

// ============================================================================
// CLIENT ERROR
// ============================================================================

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to build transaction: {0}")]
    Build(#[from] BuildError),

    #[error("Failed to form group: {0}")]
    Group(#[from] GroupError),

    #[error("Group rejected: {0}")]
    Rejected(#[from] ExecutionError),

    #[error("Faucet failed: {0}")]
    Faucet(#[from] LedgerError),

    #[error("Round state unreadable: {0}")]
    Round(#[from] RoundError),

    #[error("Application {0} does not exist")]
    NoSuchApp(AppId),

    #[error("Creation confirmed without an application id")]
    MissingCreatedApp,

    #[error("Timed out waiting for confirmation of {0}")]
    Timeout(TxnId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Node is not running")]
    NodeUnavailable,
}

// ============================================================================
// SUBMITTER TRAIT
// ============================================================================

/// Network parameters a client needs to build transactions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuggestedParams {
    pub min_fee: u64,
    pub latest_timestamp: u64,
    pub height: u64,
}

/// Anything that accepts transaction groups for execution
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn suggested_params(&self) -> Result<SuggestedParams, ClientError>;

    /// Submit a group; returns the id of its last transaction
    async fn submit(&self, group: TxnGroup) -> Result<TxnId, ClientError>;

    async fn confirmation(&self, id: TxnId) -> Result<Option<Confirmation>, ClientError>;

    async fn application(&self, app_id: AppId) -> Result<Option<AppInstance>, ClientError>;

    async fn balance(&self, address: Address) -> Result<u64, ClientError>;
}

// ============================================================================
// LOCAL NODE
// ============================================================================

enum Command {
    Params(oneshot::Sender<SuggestedParams>),
    Submit(TxnGroup, oneshot::Sender<Result<GroupReceipt, ExecutionError>>),
    Confirmation(TxnId, oneshot::Sender<Option<Confirmation>>),
    Application(AppId, oneshot::Sender<Option<AppInstance>>),
    Applications(oneshot::Sender<Vec<AppInstance>>),
    Balance(Address, oneshot::Sender<u64>),
    Fund(Address, u64, oneshot::Sender<Result<(), LedgerError>>),
    AdvanceTime(u64, oneshot::Sender<u64>),
    Shutdown(oneshot::Sender<Network>),
}

/// In-process node running a network host on its own task
pub struct LocalNode;

impl LocalNode {
    /// Start the node task; requires a running tokio runtime
    pub fn spawn(network: Network) -> NodeHandle {
        let (tx, rx) = mpsc::channel(NODE_INBOX_CAPACITY);
        tokio::spawn(Self::run(network, rx));
        NodeHandle { tx }
    }

    async fn run(mut network: Network, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            match command {
                Command::Params(reply) => {
                    let _ = reply.send(SuggestedParams {
                        min_fee: network.min_txn_fee(),
                        latest_timestamp: network.latest_timestamp(),
                        height: network.height(),
                    });
                }
                Command::Submit(group, reply) => {
                    let _ = reply.send(network.submit(group));
                }
                Command::Confirmation(id, reply) => {
                    let _ = reply.send(network.confirmation(&id).cloned());
                }
                Command::Application(app_id, reply) => {
                    let _ = reply.send(network.app(&app_id).cloned());
                }
                Command::Applications(reply) => {
                    let _ = reply.send(network.apps().cloned().collect());
                }
                Command::Balance(address, reply) => {
                    let _ = reply.send(network.balance(&address));
                }
                Command::Fund(address, amount, reply) => {
                    let _ = reply.send(network.fund(&address, amount));
                }
                Command::AdvanceTime(secs, reply) => {
                    network.advance_time(secs);
                    let _ = reply.send(network.latest_timestamp());
                }
                Command::Shutdown(reply) => {
                    debug!("local node shutting down");
                    let _ = reply.send(network);
                    return;
                }
            }
        }
    }
}

/// Cloneable handle to a running `LocalNode`
#[derive(Clone)]
pub struct NodeHandle {
    tx: mpsc::Sender<Command>,
}

impl NodeHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| ClientError::NodeUnavailable)?;
        reply_rx.await.map_err(|_| ClientError::NodeUnavailable)
    }

    /// Submit and return the full receipt
    pub async fn submit_group(&self, group: TxnGroup) -> Result<GroupReceipt, ClientError> {
        Ok(self.request(|reply| Command::Submit(group, reply)).await??)
    }

    /// Mint funds into an account (development faucet)
    pub async fn fund(&self, address: Address, amount: u64) -> Result<(), ClientError> {
        Ok(self
            .request(|reply| Command::Fund(address, amount, reply))
            .await??)
    }

    /// Every live round instance, by id
    pub async fn applications(&self) -> Result<Vec<AppInstance>, ClientError> {
        self.request(Command::Applications).await
    }

    /// Move the node clock forward; returns the new time
    pub async fn advance_time(&self, secs: u64) -> Result<u64, ClientError> {
        self.request(|reply| Command::AdvanceTime(secs, reply)).await
    }

    /// Stop the node and take back its network
    pub async fn shutdown(self) -> Result<Network, ClientError> {
        self.request(Command::Shutdown).await
    }
}

#[async_trait]
impl Submitter for NodeHandle {
    async fn suggested_params(&self) -> Result<SuggestedParams, ClientError> {
        self.request(Command::Params).await
    }

    async fn submit(&self, group: TxnGroup) -> Result<TxnId, ClientError> {
        let receipt = self.submit_group(group).await?;
        receipt
            .txn_ids()
            .last()
            .copied()
            .ok_or(ClientError::NodeUnavailable)
    }

    async fn confirmation(&self, id: TxnId) -> Result<Option<Confirmation>, ClientError> {
        self.request(|reply| Command::Confirmation(id, reply)).await
    }

    async fn application(&self, app_id: AppId) -> Result<Option<AppInstance>, ClientError> {
        self.request(|reply| Command::Application(app_id, reply)).await
    }

    async fn balance(&self, address: Address) -> Result<u64, ClientError> {
        self.request(|reply| Command::Balance(address, reply)).await
    }
}
