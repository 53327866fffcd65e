// Round Program - dispatch from application transactions to round transitions
//
// The host calls `on_create` for the deployment transaction and `on_call`
// for every later application call. Global state is only written after the
// transition succeeds.

use crate::round::{
    Environment, GlobalState, MatchBundle, Round, RoundError, RoundMachine, RoundParams,
    Settlement,
};
use crate::txn::{OnCompletion, TxnGroup};
use tracing::debug;

/// First argument of a match registration call
pub const MATCH_METHOD: &[u8] = b"match";

/// What an accepted call did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramOutcome {
    Matched(Round),
    /// The instance must be deleted after these payments
    Disposed(Settlement),
    Cleared,
}

pub struct RoundProgram;

impl RoundProgram {
    /// Deployment: decode arguments and initialize every field
    pub fn on_create(args: &[Vec<u8>], state: &mut GlobalState) -> Result<Round, RoundError> {
        let params = RoundParams::from_app_args(args)?;
        let round = RoundMachine::create(params);
        round.store(state)?;
        Ok(round)
    }

    /// Any call after deployment
    pub fn on_call(
        group: &TxnGroup,
        index: usize,
        on_completion: OnCompletion,
        env: &Environment,
        state: &mut GlobalState,
    ) -> Result<ProgramOutcome, RoundError> {
        let call = group.get(index).ok_or(RoundError::CallNotInGroup(index))?.txn();

        match on_completion {
            OnCompletion::NoOp => {
                let method = call.app_args().first().ok_or(RoundError::MissingMethod)?;
                if method.as_slice() != MATCH_METHOD {
                    return Err(RoundError::UnknownMethod(
                        String::from_utf8_lossy(method).into_owned(),
                    ));
                }

                let bundle = MatchBundle::from_group(group, index)?;
                let round = Round::load(state)?;
                let next = RoundMachine::register_match(&round, env, &bundle)?;
                next.store_counters(state)?;
                Ok(ProgramOutcome::Matched(next))
            }
            OnCompletion::DeleteApplication => {
                let round = Round::load(state)?;
                let settlement = RoundMachine::dispose(&round, env, call.sender())?;
                Ok(ProgramOutcome::Disposed(settlement))
            }
            // No local state exists, so there is nothing to clear.
            OnCompletion::ClearState => {
                debug!(sender = %call.sender(), "clear state approved");
                Ok(ProgramOutcome::Cleared)
            }
            OnCompletion::OptIn | OnCompletion::CloseOut | OnCompletion::UpdateApplication => {
                Err(RoundError::UnsupportedCompletion(on_completion))
            }
        }
    }
}
