// Round - the typed view of a matching round's global state

use crate::identity::Address;
use crate::round::{keys, GlobalState, RoundError};
use serde::{Deserialize, Serialize};

/// Names of the creation arguments, in wire order
const ARG_NAMES: [&str; 6] = [
    "beneficiary",
    "start_time",
    "end_time",
    "min_match",
    "match_growth",
    "burn_address",
];

/// Read a big-endian integer argument of at most 8 bytes
fn btoi(name: &'static str, bytes: &[u8]) -> Result<u64, RoundError> {
    if bytes.len() > 8 {
        return Err(RoundError::ArgumentTooLong {
            name,
            len: bytes.len(),
        });
    }
    Ok(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Configuration supplied once at deployment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundParams {
    pub beneficiary: Address,
    pub burn_address: Address,
    pub start_time: u64,
    pub end_time: u64,
    pub min_match: u64,
    pub match_growth: u64,
}

impl RoundParams {
    /// Encode as deployment arguments
    pub fn to_app_args(&self) -> Vec<Vec<u8>> {
        vec![
            self.beneficiary.as_bytes().to_vec(),
            self.start_time.to_be_bytes().to_vec(),
            self.end_time.to_be_bytes().to_vec(),
            self.min_match.to_be_bytes().to_vec(),
            self.match_growth.to_be_bytes().to_vec(),
            self.burn_address.as_bytes().to_vec(),
        ]
    }

    /// Decode deployment arguments; ordering of the times is not checked
    pub fn from_app_args(args: &[Vec<u8>]) -> Result<Self, RoundError> {
        let arg = |index: usize| {
            args.get(index)
                .map(Vec::as_slice)
                .ok_or(RoundError::MissingArgument {
                    index,
                    name: ARG_NAMES[index],
                })
        };

        Ok(Self {
            beneficiary: Address::from_bytes(arg(0)?)?,
            start_time: btoi(ARG_NAMES[1], arg(1)?)?,
            end_time: btoi(ARG_NAMES[2], arg(2)?)?,
            min_match: btoi(ARG_NAMES[3], arg(3)?)?,
            match_growth: btoi(ARG_NAMES[4], arg(4)?)?,
            burn_address: Address::from_bytes(arg(5)?)?,
        })
    }
}

/// Where a round stands relative to its window
///
/// A closed round has no phase: its instance no longer exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Before `start_time`; may be cancelled by beneficiary or creator
    Pending,
    /// In `[start_time, end_time)`; accepts matches, cannot close
    Active,
    /// At or after `end_time`; anyone may settle
    Ended,
}

/// The single matching round of an application instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    beneficiary: Address,
    burn_address: Address,
    start_time: u64,
    end_time: u64,
    min_match: u64,
    match_growth: u64,
    num_matches: u64,
    total_match_amount: u64,
}

impl Round {
    /// A fresh round with zeroed counters
    pub fn new(params: RoundParams) -> Self {
        Self {
            beneficiary: params.beneficiary,
            burn_address: params.burn_address,
            start_time: params.start_time,
            end_time: params.end_time,
            min_match: params.min_match,
            match_growth: params.match_growth,
            num_matches: 0,
            total_match_amount: 0,
        }
    }

    pub fn beneficiary(&self) -> &Address {
        &self.beneficiary
    }

    pub fn burn_address(&self) -> &Address {
        &self.burn_address
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn end_time(&self) -> u64 {
        self.end_time
    }

    pub fn min_match(&self) -> u64 {
        self.min_match
    }

    pub fn match_growth(&self) -> u64 {
        self.match_growth
    }

    pub fn num_matches(&self) -> u64 {
        self.num_matches
    }

    pub fn total_match_amount(&self) -> u64 {
        self.total_match_amount
    }

    /// Phase at a given network time. Pending is checked first, so a round
    /// configured with `start_time > end_time` stays Pending until start.
    pub fn phase_at(&self, now: u64) -> Phase {
        if now < self.start_time {
            Phase::Pending
        } else if now >= self.end_time {
            Phase::Ended
        } else {
            Phase::Active
        }
    }

    /// True when the aggregate reaches the payout threshold
    pub fn threshold_met(&self) -> bool {
        self.total_match_amount >= self.min_match
    }

    /// The round after one more accepted match
    ///
    /// The total is recomputed from the count, never accumulated.
    pub(crate) fn with_match(&self) -> Result<Round, RoundError> {
        let num_matches = self.num_matches.checked_add(1).ok_or(RoundError::Overflow)?;
        let total_match_amount = num_matches
            .checked_mul(self.min_match)
            .and_then(|v| v.checked_mul(self.match_growth))
            .ok_or(RoundError::Overflow)?;

        Ok(Round {
            num_matches,
            total_match_amount,
            ..self.clone()
        })
    }

    /// Load from global state
    pub fn load(state: &GlobalState) -> Result<Self, RoundError> {
        Ok(Self {
            beneficiary: Address::from_bytes(state.get_bytes(keys::BENEFICIARY)?)?,
            burn_address: Address::from_bytes(state.get_bytes(keys::BURN_ACCOUNT)?)?,
            start_time: state.get_uint(keys::START_TIME)?,
            end_time: state.get_uint(keys::END_TIME)?,
            min_match: state.get_uint(keys::MIN_MATCH)?,
            match_growth: state.get_uint(keys::MATCH_GROWTH)?,
            num_matches: state.get_uint(keys::NUM_MATCHES)?,
            total_match_amount: state.get_uint(keys::TOTAL_MATCH_AMOUNT)?,
        })
    }

    /// Write every field to global state
    pub fn store(&self, state: &mut GlobalState) -> Result<(), RoundError> {
        state.put_bytes(keys::BENEFICIARY, self.beneficiary.as_bytes())?;
        state.put_uint(keys::START_TIME, self.start_time)?;
        state.put_uint(keys::END_TIME, self.end_time)?;
        state.put_uint(keys::MIN_MATCH, self.min_match)?;
        state.put_uint(keys::MATCH_GROWTH, self.match_growth)?;
        state.put_bytes(keys::BURN_ACCOUNT, self.burn_address.as_bytes())?;
        self.store_counters(state)
    }

    /// Write only the counters, the fields a match mutates
    pub fn store_counters(&self, state: &mut GlobalState) -> Result<(), RoundError> {
        state.put_uint(keys::NUM_MATCHES, self.num_matches)?;
        state.put_uint(keys::TOTAL_MATCH_AMOUNT, self.total_match_amount)?;
        Ok(())
    }
}
