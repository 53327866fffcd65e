use crate::identity::Address;
use crate::txn::{AppId, OnCompletion, StateSchema, Transaction, TxnKind, DEFAULT_MIN_TXN_FEE};
use rand::Rng;
use thiserror::Error;

/// Maximum number of application arguments per call
pub const MAX_APP_ARGS: usize = 16;

/// Maximum combined size of application arguments in bytes
pub const MAX_APP_ARGS_BYTES: usize = 2048;

/// Errors that can occur when building a transaction
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Missing sender: sender address is required")]
    MissingSender,

    #[error("Missing receiver: payment receiver is required")]
    MissingReceiver,

    #[error("Missing amount: payment amount is required")]
    MissingAmount,

    #[error("Missing application id")]
    MissingAppId,

    #[error("Too many application arguments: {count}, at most {max}")]
    TooManyArgs { count: usize, max: usize },

    #[error("Application arguments too large: {size} bytes, at most {max}")]
    ArgsTooLarge { size: usize, max: usize },
}

fn random_note() -> u64 {
    rand::thread_rng().gen::<u64>()
}

fn check_args(args: &[Vec<u8>]) -> Result<(), BuildError> {
    if args.len() > MAX_APP_ARGS {
        return Err(BuildError::TooManyArgs {
            count: args.len(),
            max: MAX_APP_ARGS,
        });
    }
    let size: usize = args.iter().map(Vec::len).sum();
    if size > MAX_APP_ARGS_BYTES {
        return Err(BuildError::ArgsTooLarge {
            size,
            max: MAX_APP_ARGS_BYTES,
        });
    }
    Ok(())
}

/// Builder for native payments
#[derive(Default)]
pub struct PaymentBuilder {
    sender: Option<Address>,
    receiver: Option<Address>,
    amount: Option<u64>,
    close_remainder_to: Option<Address>,
    fee: Option<u64>,
    note: Option<u64>,
}

impl PaymentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sender (required)
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Set the receiver (required)
    pub fn receiver(mut self, receiver: Address) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Set the amount (required)
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Close the sender account, moving its remaining balance here
    pub fn close_remainder_to(mut self, address: Address) -> Self {
        self.close_remainder_to = Some(address);
        self
    }

    /// Set the fee (defaults to the default minimum fee)
    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    /// Set the note (random if not provided)
    pub fn note(mut self, note: u64) -> Self {
        self.note = Some(note);
        self
    }

    pub fn build(self) -> Result<Transaction, BuildError> {
        let sender = self.sender.ok_or(BuildError::MissingSender)?;
        let receiver = self.receiver.ok_or(BuildError::MissingReceiver)?;
        let amount = self.amount.ok_or(BuildError::MissingAmount)?;

        Ok(Transaction::new(
            sender,
            self.fee.unwrap_or(DEFAULT_MIN_TXN_FEE),
            self.note.unwrap_or_else(random_note),
            TxnKind::Payment {
                receiver,
                amount,
                close_remainder_to: self.close_remainder_to,
            },
        ))
    }
}

/// Builder for application deployment
#[derive(Default)]
pub struct AppCreateBuilder {
    sender: Option<Address>,
    args: Vec<Vec<u8>>,
    global_schema: StateSchema,
    local_schema: StateSchema,
    fee: Option<u64>,
    note: Option<u64>,
}

impl AppCreateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn args(mut self, args: Vec<Vec<u8>>) -> Self {
        self.args = args;
        self
    }

    pub fn global_schema(mut self, schema: StateSchema) -> Self {
        self.global_schema = schema;
        self
    }

    pub fn local_schema(mut self, schema: StateSchema) -> Self {
        self.local_schema = schema;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn note(mut self, note: u64) -> Self {
        self.note = Some(note);
        self
    }

    pub fn build(self) -> Result<Transaction, BuildError> {
        let sender = self.sender.ok_or(BuildError::MissingSender)?;
        check_args(&self.args)?;

        Ok(Transaction::new(
            sender,
            self.fee.unwrap_or(DEFAULT_MIN_TXN_FEE),
            self.note.unwrap_or_else(random_note),
            TxnKind::AppCreate {
                args: self.args,
                global_schema: self.global_schema,
                local_schema: self.local_schema,
            },
        ))
    }
}

/// Builder for calls on a deployed application
pub struct AppCallBuilder {
    sender: Option<Address>,
    app_id: Option<AppId>,
    on_completion: OnCompletion,
    args: Vec<Vec<u8>>,
    accounts: Vec<Address>,
    fee: Option<u64>,
    note: Option<u64>,
}

impl AppCallBuilder {
    pub fn new() -> Self {
        Self {
            sender: None,
            app_id: None,
            on_completion: OnCompletion::NoOp,
            args: Vec::new(),
            accounts: Vec::new(),
            fee: None,
            note: None,
        }
    }

    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn app_id(mut self, app_id: AppId) -> Self {
        self.app_id = Some(app_id);
        self
    }

    /// Set the completion action (defaults to NoOp)
    pub fn on_completion(mut self, on_completion: OnCompletion) -> Self {
        self.on_completion = on_completion;
        self
    }

    /// Append one application argument
    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Accounts the call may pay out to
    pub fn accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = Some(fee);
        self
    }

    pub fn note(mut self, note: u64) -> Self {
        self.note = Some(note);
        self
    }

    pub fn build(self) -> Result<Transaction, BuildError> {
        let sender = self.sender.ok_or(BuildError::MissingSender)?;
        let app_id = self.app_id.ok_or(BuildError::MissingAppId)?;
        check_args(&self.args)?;

        Ok(Transaction::new(
            sender,
            self.fee.unwrap_or(DEFAULT_MIN_TXN_FEE),
            self.note.unwrap_or_else(random_note),
            TxnKind::AppCall {
                app_id,
                on_completion: self.on_completion,
                args: self.args,
                accounts: self.accounts,
            },
        ))
    }
}

impl Default for AppCallBuilder {
    fn default() -> Self {
        Self::new()
    }
}
