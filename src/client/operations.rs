// Operations - the four round actions a participant performs
//
// Each action builds, signs and submits one group, then polls until the
// node reports it confirmed.

use crate::client::{ClientError, Submitter};
use crate::identity::Keypair;
use crate::ledger::Confirmation;
use crate::round::{Round, RoundParams, MATCH_METHOD, ROUND_GLOBAL_SCHEMA, ROUND_LOCAL_SCHEMA};
use crate::txn::{
    assign_group_id, AppCallBuilder, AppCreateBuilder, AppId, OnCompletion, PaymentBuilder,
    SignedTransaction, Transaction, TxnGroup, TxnId,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

// ============================================================================
// CLIENT CONFIG
// ============================================================================

/// Configuration for a matching client
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// How long to wait for a submitted group to confirm
    pub confirmation_timeout_secs: u64,
    /// Delay between confirmation polls
    pub poll_interval_ms: u64,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirmation_timeout_secs(mut self, secs: u64) -> Self {
        self.confirmation_timeout_secs = secs;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.confirmation_timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "confirmation_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::InvalidConfig(
                "poll_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout_secs: 10,
            poll_interval_ms: 50,
        }
    }
}

// ============================================================================
// MATCHING CLIENT
// ============================================================================

/// Drives rounds on a node through a `Submitter`
pub struct MatchingClient<S: Submitter> {
    submitter: S,
    config: ClientConfig,
}

impl<S: Submitter> MatchingClient<S> {
    pub fn new(submitter: S, config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self { submitter, config })
    }

    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Deploy a new round; returns its application id
    pub async fn create_round(
        &self,
        creator: &Keypair,
        params: &RoundParams,
    ) -> Result<AppId, ClientError> {
        let suggested = self.submitter.suggested_params().await?;
        let txn = AppCreateBuilder::new()
            .sender(creator.address())
            .args(params.to_app_args())
            .global_schema(ROUND_GLOBAL_SCHEMA)
            .local_schema(ROUND_LOCAL_SCHEMA)
            .fee(suggested.min_fee)
            .build()?;

        let id = self.submitter.submit(TxnGroup::single(txn.sign(creator))?).await?;
        let confirmation = self.wait_for_confirmation(id).await?;
        let app_id = confirmation.created_app.ok_or(ClientError::MissingCreatedApp)?;

        info!(app = %app_id, creator = %creator.address(), "round deployed");
        Ok(app_id)
    }

    /// Pledge `amount` to a round: a payment into custody grouped with the match call
    pub async fn commit_match(
        &self,
        app_id: AppId,
        matcher: &Keypair,
        amount: u64,
    ) -> Result<Confirmation, ClientError> {
        let suggested = self.submitter.suggested_params().await?;
        let transfer = PaymentBuilder::new()
            .sender(matcher.address())
            .receiver(app_id.address())
            .amount(amount)
            .fee(suggested.min_fee)
            .build()?;
        let call = AppCallBuilder::new()
            .sender(matcher.address())
            .app_id(app_id)
            .arg(MATCH_METHOD)
            .fee(suggested.min_fee)
            .build()?;

        let group = Self::sign_group(vec![transfer, call], matcher)?;
        let id = self.submitter.submit(group).await?;
        let confirmation = self.wait_for_confirmation(id).await?;

        info!(app = %app_id, matcher = %matcher.address(), amount, "match committed");
        Ok(confirmation)
    }

    /// Delete a round, triggering its payout or refund sweep
    pub async fn close_round(
        &self,
        app_id: AppId,
        closer: &Keypair,
    ) -> Result<Confirmation, ClientError> {
        let round = self.round_state(app_id).await?;
        let suggested = self.submitter.suggested_params().await?;
        let call = AppCallBuilder::new()
            .sender(closer.address())
            .app_id(app_id)
            .on_completion(OnCompletion::DeleteApplication)
            .accounts(vec![*round.beneficiary(), *round.burn_address()])
            .fee(suggested.min_fee)
            .build()?;

        let id = self.submitter.submit(TxnGroup::single(call.sign(closer))?).await?;
        let confirmation = self.wait_for_confirmation(id).await?;

        info!(
            app = %app_id,
            closer = %closer.address(),
            payments = confirmation.inner_payments.len(),
            "round closed"
        );
        Ok(confirmation)
    }

    /// Current round fields as stored in global state
    pub async fn round_state(&self, app_id: AppId) -> Result<Round, ClientError> {
        let instance = self
            .submitter
            .application(app_id)
            .await?
            .ok_or(ClientError::NoSuchApp(app_id))?;
        Ok(Round::load(instance.global_state())?)
    }

    /// Poll until `id` is confirmed or the configured timeout passes
    pub async fn wait_for_confirmation(&self, id: TxnId) -> Result<Confirmation, ClientError> {
        let timeout = Duration::from_secs(self.config.confirmation_timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        let poll = async {
            loop {
                if let Some(confirmation) = self.submitter.confirmation(id).await? {
                    return Ok::<_, ClientError>(confirmation);
                }
                tokio::time::sleep(interval).await;
            }
        };

        let confirmation = tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| ClientError::Timeout(id))??;
        debug!(txn = %id, round = confirmation.round, "confirmed");
        Ok(confirmation)
    }

    fn sign_group(
        txns: Vec<Transaction>,
        signer: &Keypair,
    ) -> Result<TxnGroup, ClientError> {
        let signed: Vec<SignedTransaction> = assign_group_id(txns)?
            .into_iter()
            .map(|txn| txn.sign(signer))
            .collect();
        Ok(TxnGroup::new(signed)?)
    }
}
