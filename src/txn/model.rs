use crate::identity::{Address, Keypair, Signature};
use crate::txn::GroupId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Minimum fee per transaction on a default network, in base units
pub const DEFAULT_MIN_TXN_FEE: u64 = 1_000;

/// Domain prefix for transaction signing and ids
const TXN_DOMAIN: &[u8] = b"TX";

/// Identifier of a deployed application
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(u64);

impl AppId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Custody account of the application
    pub fn address(&self) -> Address {
        Address::for_application(self.0)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transaction (SHA256 of its signing bytes)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxnId([u8; 32]);

impl TxnId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Coarse transaction type, as seen by a program inspecting its group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxnType {
    Payment,
    AppCall,
}

/// What an application call asks the host to do with the application
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnCompletion {
    NoOp,
    OptIn,
    CloseOut,
    ClearState,
    UpdateApplication,
    DeleteApplication,
}

/// Number of storage slots an application reserves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

impl StateSchema {
    pub const EMPTY: StateSchema = StateSchema {
        num_uints: 0,
        num_byte_slices: 0,
    };

    pub fn new(num_uints: u64, num_byte_slices: u64) -> Self {
        Self {
            num_uints,
            num_byte_slices,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnKind {
    /// Native value transfer; `close_remainder_to` also moves the sender's
    /// remaining balance and removes the sender account
    Payment {
        receiver: Address,
        amount: u64,
        close_remainder_to: Option<Address>,
    },
    /// Deploys a new application instance
    AppCreate {
        args: Vec<Vec<u8>>,
        global_schema: StateSchema,
        local_schema: StateSchema,
    },
    /// Invokes an existing application
    AppCall {
        app_id: AppId,
        on_completion: OnCompletion,
        args: Vec<Vec<u8>>,
        accounts: Vec<Address>,
    },
}

/// An unsigned transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    sender: Address,
    fee: u64,
    /// Random note so identical intents get distinct ids
    note: u64,
    group: Option<GroupId>,
    kind: TxnKind,
}

impl Transaction {
    pub fn new(sender: Address, fee: u64, note: u64, kind: TxnKind) -> Self {
        Self {
            sender,
            fee,
            note,
            group: None,
            kind,
        }
    }

    pub fn sender(&self) -> &Address {
        &self.sender
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn note(&self) -> u64 {
        self.note
    }

    pub fn group(&self) -> Option<&GroupId> {
        self.group.as_ref()
    }

    pub fn kind(&self) -> &TxnKind {
        &self.kind
    }

    pub fn txn_type(&self) -> TxnType {
        match self.kind {
            TxnKind::Payment { .. } => TxnType::Payment,
            TxnKind::AppCreate { .. } | TxnKind::AppCall { .. } => TxnType::AppCall,
        }
    }

    /// Receiver of a payment transaction
    pub fn receiver(&self) -> Option<&Address> {
        match &self.kind {
            TxnKind::Payment { receiver, .. } => Some(receiver),
            _ => None,
        }
    }

    /// Amount of a payment transaction (zero for anything else)
    pub fn amount(&self) -> u64 {
        match self.kind {
            TxnKind::Payment { amount, .. } => amount,
            _ => 0,
        }
    }

    /// Application arguments (empty for payments)
    pub fn app_args(&self) -> &[Vec<u8>] {
        match &self.kind {
            TxnKind::AppCreate { args, .. } | TxnKind::AppCall { args, .. } => args,
            TxnKind::Payment { .. } => &[],
        }
    }

    pub(crate) fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }

    /// Get the bytes that are signed and hashed
    pub fn to_signing_bytes(&self) -> Vec<u8> {
        let mut bytes = TXN_DOMAIN.to_vec();
        bytes.extend_from_slice(&postcard::to_allocvec(self).unwrap_or_default());
        bytes
    }

    /// Compute the unique ID for this transaction
    pub fn id(&self) -> TxnId {
        let hash = Sha256::digest(self.to_signing_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&hash);
        TxnId(id)
    }

    /// Sign with the sender's keypair
    pub fn sign(self, keypair: &Keypair) -> SignedTransaction {
        let signature = keypair.sign(&self.to_signing_bytes());
        SignedTransaction {
            txn: self,
            signature,
        }
    }
}

/// A transaction together with its sender's signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    txn: Transaction,
    signature: Signature,
}

impl SignedTransaction {
    pub fn from_parts(txn: Transaction, signature: Signature) -> Self {
        Self { txn, signature }
    }

    pub fn txn(&self) -> &Transaction {
        &self.txn
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn id(&self) -> TxnId {
        self.txn.id()
    }

    /// Check the signature against the sender address
    pub fn verify(&self) -> bool {
        match self.txn.sender().public_key() {
            Ok(public_key) => {
                public_key.verify(&self.txn.to_signing_bytes(), &self.signature)
            }
            Err(_) => false,
        }
    }
}
