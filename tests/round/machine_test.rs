// Round Machine Tests
// Tests for match registration and round disposal

use mutual_matching::identity::{Address, Keypair};
use mutual_matching::round::{
    DisposalKind, Environment, InnerPayment, MatchBundle, Phase, Round, RoundError, RoundMachine,
    RoundParams,
};
use mutual_matching::txn::{AppCallBuilder, AppId, PaymentBuilder, Transaction};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const APP: u64 = 1;
const MIN_FEE: u64 = 1_000;

struct Fixture {
    creator: Keypair,
    beneficiary: Keypair,
    burn: Address,
    round: Round,
}

fn fixture() -> Fixture {
    let creator = Keypair::generate();
    let beneficiary = Keypair::generate();
    let burn = Keypair::generate().address();
    let round = RoundMachine::create(RoundParams {
        beneficiary: beneficiary.address(),
        burn_address: burn,
        start_time: 100,
        end_time: 200,
        min_match: 100_000,
        match_growth: 2,
    });
    Fixture {
        creator,
        beneficiary,
        burn,
        round,
    }
}

fn env(fx: &Fixture, now: u64, custody_balance: u64) -> Environment {
    Environment {
        now,
        min_fee: MIN_FEE,
        app_address: AppId::new(APP).address(),
        creator: fx.creator.address(),
        custody_balance,
    }
}

fn transfer(from: &Keypair, to: Address, amount: u64) -> Transaction {
    PaymentBuilder::new()
        .sender(from.address())
        .receiver(to)
        .amount(amount)
        .build()
        .unwrap()
}

fn match_call(from: &Keypair) -> Transaction {
    AppCallBuilder::new()
        .sender(from.address())
        .app_id(AppId::new(APP))
        .arg("match")
        .build()
        .unwrap()
}

fn register(fx: &Fixture, round: &Round, now: u64, amount: u64) -> Result<Round, RoundError> {
    let matcher = Keypair::generate();
    let pay = transfer(&matcher, AppId::new(APP).address(), amount);
    let call = match_call(&matcher);
    RoundMachine::register_match(round, &env(fx, now, 0), &MatchBundle::new(&pay, &call))
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
fn test_created_round_has_zero_counters() {
    let fx = fixture();
    assert_eq!(fx.round.num_matches(), 0);
    assert_eq!(fx.round.total_match_amount(), 0);
    assert_eq!(fx.round.phase_at(0), Phase::Pending);
}

// ============================================================================
// MATCH REGISTRATION
// ============================================================================

#[test]
fn test_match_increments_and_recomputes_total() {
    let fx = fixture();
    let mut round = fx.round.clone();

    for expected in 1..=3u64 {
        round = register(&fx, &round, 150, 100_000).unwrap();
        assert_eq!(round.num_matches(), expected);
        assert_eq!(round.total_match_amount(), expected * 100_000 * 2);
    }
}

#[test]
fn test_overpayment_counts_as_one_tier() {
    let fx = fixture();
    let round = register(&fx, &fx.round, 150, 950_000).unwrap();

    assert_eq!(round.num_matches(), 1);
    assert_eq!(round.total_match_amount(), 200_000);
}

#[test]
fn test_window_is_start_inclusive_end_exclusive() {
    let fx = fixture();

    assert!(register(&fx, &fx.round, 100, 100_000).is_ok());
    assert!(register(&fx, &fx.round, 199, 100_000).is_ok());
    assert!(matches!(
        register(&fx, &fx.round, 99, 100_000),
        Err(RoundError::OutsideWindow { now: 99, .. })
    ));
    assert!(matches!(
        register(&fx, &fx.round, 200, 100_000),
        Err(RoundError::OutsideWindow { now: 200, .. })
    ));
}

#[test]
fn test_underfunded_match_rejected() {
    let fx = fixture();

    assert!(matches!(
        register(&fx, &fx.round, 150, 99_999),
        Err(RoundError::Underfunded {
            amount: 99_999,
            min_match: 100_000
        })
    ));
}

#[test]
fn test_transfer_below_fee_rejected() {
    let mut fx = fixture();
    fx.round = RoundMachine::create(RoundParams {
        beneficiary: fx.beneficiary.address(),
        burn_address: fx.burn,
        start_time: 100,
        end_time: 200,
        min_match: 10,
        match_growth: 1,
    });

    assert!(matches!(
        register(&fx, &fx.round, 150, 999),
        Err(RoundError::TransferBelowFee { amount: 999, .. })
    ));
    assert!(register(&fx, &fx.round, 150, 1_000).is_ok());
}

#[test]
fn test_transfer_from_other_sender_rejected() {
    let fx = fixture();
    let payer = Keypair::generate();
    let caller = Keypair::generate();
    let pay = transfer(&payer, AppId::new(APP).address(), 100_000);
    let call = match_call(&caller);

    let result = RoundMachine::register_match(
        &fx.round,
        &env(&fx, 150, 0),
        &MatchBundle::new(&pay, &call),
    );
    assert!(matches!(result, Err(RoundError::TransferSenderMismatch { .. })));
}

#[test]
fn test_transfer_to_other_receiver_rejected() {
    let fx = fixture();
    let matcher = Keypair::generate();
    let pay = transfer(&matcher, fx.beneficiary.address(), 100_000);
    let call = match_call(&matcher);

    let result = RoundMachine::register_match(
        &fx.round,
        &env(&fx, 150, 0),
        &MatchBundle::new(&pay, &call),
    );
    assert!(matches!(result, Err(RoundError::TransferReceiverMismatch { .. })));
}

#[test]
fn test_paired_call_instead_of_payment_rejected() {
    let fx = fixture();
    let matcher = Keypair::generate();
    let first = match_call(&matcher);
    let call = match_call(&matcher);

    let result = RoundMachine::register_match(
        &fx.round,
        &env(&fx, 150, 0),
        &MatchBundle::new(&first, &call),
    );
    assert!(matches!(result, Err(RoundError::TransferNotPayment)));
}

#[test]
fn test_rejected_match_leaves_round_unchanged() {
    let fx = fixture();
    let before = fx.round.clone();
    let _ = register(&fx, &fx.round, 150, 1);

    assert_eq!(fx.round, before);
}

#[test]
fn test_counter_overflow_rejected() {
    let fx = fixture();
    let round = RoundMachine::create(RoundParams {
        beneficiary: fx.beneficiary.address(),
        burn_address: fx.burn,
        start_time: 100,
        end_time: 200,
        min_match: u64::MAX / 2,
        match_growth: 3,
    });

    assert!(matches!(
        register(&fx, &round, 150, u64::MAX / 2),
        Err(RoundError::Overflow)
    ));
}

// ============================================================================
// DISPOSAL BEFORE THE WINDOW
// ============================================================================

#[test]
fn test_early_cancel_by_creator_burns_balance() {
    let fx = fixture();
    let settlement =
        RoundMachine::dispose(&fx.round, &env(&fx, 50, 7_000), &fx.creator.address()).unwrap();

    assert_eq!(settlement.kind(), DisposalKind::EarlyCancel);
    assert_eq!(
        settlement.payments(),
        &[InnerPayment::BurnRemainder {
            receiver: fx.burn,
            amount: 7_000
        }]
    );
}

#[test]
fn test_early_cancel_by_beneficiary() {
    let fx = fixture();
    let settlement =
        RoundMachine::dispose(&fx.round, &env(&fx, 50, 0), &fx.beneficiary.address()).unwrap();

    assert_eq!(settlement.kind(), DisposalKind::EarlyCancel);
    assert!(settlement.payments().is_empty(), "Nothing to sweep from an empty custody");
}

#[test]
fn test_early_cancel_by_stranger_rejected() {
    let fx = fixture();
    let stranger = Keypair::generate().address();

    assert!(matches!(
        RoundMachine::dispose(&fx.round, &env(&fx, 50, 7_000), &stranger),
        Err(RoundError::Unauthorized { .. })
    ));
}

// ============================================================================
// DISPOSAL DURING AND AFTER THE WINDOW
// ============================================================================

#[test]
fn test_close_during_window_rejected_for_everyone() {
    let fx = fixture();
    for caller in [fx.creator.address(), fx.beneficiary.address()] {
        assert!(matches!(
            RoundMachine::dispose(&fx.round, &env(&fx, 150, 0), &caller),
            Err(RoundError::RoundActive { now: 150, end_time: 200 })
        ));
    }
}

#[test]
fn test_settled_round_pays_total_minus_fee_then_burns() {
    let fx = fixture();
    let round = register(&fx, &fx.round, 150, 400_000).unwrap();
    let round = register(&fx, &round, 150, 400_000).unwrap();
    let stranger = Keypair::generate().address();

    let settlement = RoundMachine::dispose(&round, &env(&fx, 200, 800_000), &stranger).unwrap();

    assert_eq!(settlement.kind(), DisposalKind::Settled);
    assert_eq!(settlement.payout(), Some(399_000));
    assert_eq!(settlement.burned(), 400_000);
    assert_eq!(settlement.total_debit(), 800_000);
    assert_eq!(settlement.payments()[0].receiver(), &fx.beneficiary.address());
    assert_eq!(settlement.payments()[1].receiver(), &fx.burn);
}

#[test]
fn test_threshold_not_met_burns_everything() {
    let fx = fixture();
    let settlement =
        RoundMachine::dispose(&fx.round, &env(&fx, 500, 3_000), &fx.creator.address()).unwrap();

    assert_eq!(settlement.kind(), DisposalKind::ThresholdNotMet);
    assert_eq!(settlement.payout(), None);
    assert_eq!(settlement.burned(), 3_000);
}

#[test]
fn test_missing_beneficiary_burns_everything() {
    let fx = fixture();
    let round = RoundMachine::create(RoundParams {
        beneficiary: Address::ZERO,
        burn_address: fx.burn,
        start_time: 100,
        end_time: 200,
        min_match: 100_000,
        match_growth: 2,
    });
    let round = register(&fx, &round, 150, 100_000).unwrap();

    let settlement =
        RoundMachine::dispose(&round, &env(&fx, 200, 100_000), &fx.creator.address()).unwrap();

    assert_eq!(settlement.kind(), DisposalKind::NoBeneficiary);
    assert_eq!(settlement.payout(), None);
    assert_eq!(settlement.burned(), 100_000);
}

#[test]
fn test_settlement_with_short_custody_rejected() {
    let fx = fixture();
    let round = register(&fx, &fx.round, 150, 100_000).unwrap();

    assert!(matches!(
        RoundMachine::dispose(&round, &env(&fx, 200, 100_000), &fx.creator.address()),
        Err(RoundError::InsufficientCustody {
            balance: 100_000,
            required: 200_000
        })
    ));
}

#[test]
fn test_payout_below_fee_rejected() {
    let fx = fixture();
    let round = RoundMachine::create(RoundParams {
        beneficiary: fx.beneficiary.address(),
        burn_address: fx.burn,
        start_time: 100,
        end_time: 200,
        min_match: 300,
        match_growth: 1,
    });
    let round = register(&fx, &round, 150, 1_000).unwrap();

    assert!(matches!(
        RoundMachine::dispose(&round, &env(&fx, 200, 1_000), &fx.creator.address()),
        Err(RoundError::PayoutBelowFee { total: 300, min_fee: 1_000 })
    ));
}
