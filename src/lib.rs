// Mutual Matching - time-gated crowd matching rounds
//
// A round collects fixed-tier pledges during [start_time, end_time) and at
// close either pays the aggregate to a beneficiary or burns the custody
// balance. Settlement runs as a deterministic program over atomic
// transaction groups applied by a serial network host.

pub mod client;
pub mod identity;
pub mod ledger;
pub mod round;
pub mod storage;
pub mod txn;
