// Network Tests
// Tests for fee charging, atomic groups, the clock and application dispatch

use mutual_matching::identity::{Address, Keypair};
use mutual_matching::ledger::{ExecutionError, LedgerError, Network, NetworkConfig};
use mutual_matching::round::{RoundError, RoundParams, ROUND_GLOBAL_SCHEMA};
use mutual_matching::txn::{
    assign_group_id, AppCallBuilder, AppCreateBuilder, AppId, OnCompletion, PaymentBuilder,
    Transaction, TxnGroup, ValidationError,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn network() -> Network {
    Network::new(NetworkConfig::default()).unwrap()
}

fn funded(network: &mut Network, amount: u64) -> Keypair {
    let kp = Keypair::generate();
    network.fund(&kp.address(), amount).unwrap();
    kp
}

fn payment(from: &Keypair, to: Address, amount: u64) -> Transaction {
    PaymentBuilder::new()
        .sender(from.address())
        .receiver(to)
        .amount(amount)
        .build()
        .unwrap()
}

fn group_of(txns: Vec<Transaction>, kp: &Keypair) -> TxnGroup {
    let signed = assign_group_id(txns)
        .unwrap()
        .into_iter()
        .map(|t| t.sign(kp))
        .collect();
    TxnGroup::new(signed).unwrap()
}

fn single(txn: Transaction, kp: &Keypair) -> TxnGroup {
    TxnGroup::single(txn.sign(kp)).unwrap()
}

/// Deploy a round whose window is open at genesis
fn deploy_open_round(network: &mut Network, creator: &Keypair) -> AppId {
    let params = RoundParams {
        beneficiary: Keypair::generate().address(),
        burn_address: Keypair::generate().address(),
        start_time: 0,
        end_time: 1_000,
        min_match: 10_000,
        match_growth: 1,
    };
    let txn = AppCreateBuilder::new()
        .sender(creator.address())
        .args(params.to_app_args())
        .global_schema(ROUND_GLOBAL_SCHEMA)
        .build()
        .unwrap();
    network
        .submit(single(txn, creator))
        .unwrap()
        .created_app()
        .unwrap()
}

fn call(from: &Keypair, app: AppId) -> AppCallBuilder {
    AppCallBuilder::new().sender(from.address()).app_id(app)
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = NetworkConfig::default();
    assert_eq!(config.min_txn_fee, 1_000);
    assert_eq!(config.genesis_timestamp, 0);
    assert!(config.fee_sink.is_zero());
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_zero_fee() {
    let result = Network::new(NetworkConfig::new().with_min_txn_fee(0));
    assert!(matches!(result, Err(ExecutionError::InvalidConfig(_))));
}

#[test]
fn test_config_rejects_bad_group_limit() {
    assert!(NetworkConfig::new().with_max_group_size(0).validate().is_err());
    assert!(NetworkConfig::new().with_max_group_size(17).validate().is_err());
}

// ============================================================================
// FEES AND PAYMENTS
// ============================================================================

#[test]
fn test_fee_goes_to_sink() {
    let sink = Keypair::generate().address();
    let mut network = Network::new(NetworkConfig::new().with_fee_sink(sink)).unwrap();
    let alice = funded(&mut network, 10_000);
    let bob = Keypair::generate().address();

    network.submit(single(payment(&alice, bob, 2_500), &alice)).unwrap();

    assert_eq!(network.balance(&alice.address()), 6_500);
    assert_eq!(network.balance(&bob), 2_500);
    assert_eq!(network.balance(&sink), 1_000);
    assert_eq!(network.accounts().total_supply(), 10_000);
}

#[test]
fn test_fee_below_minimum_rejected() {
    let mut network = network();
    let alice = funded(&mut network, 10_000);
    let txn = PaymentBuilder::new()
        .sender(alice.address())
        .receiver(alice.address())
        .amount(1)
        .fee(999)
        .build()
        .unwrap();

    let err = network.submit(single(txn, &alice)).unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Invalid {
            index: 0,
            source: ValidationError::FeeTooLow { fee: 999, min: 1_000 }
        }
    ));
}

#[test]
fn test_overdraft_rejected_without_fee() {
    let mut network = network();
    let alice = funded(&mut network, 5_000);

    let err = network
        .submit(single(payment(&alice, Address::ZERO, 4_500), &alice))
        .unwrap_err();

    assert!(matches!(
        err,
        ExecutionError::Ledger {
            index: 0,
            source: LedgerError::InsufficientBalance { .. }
        }
    ));
    assert_eq!(network.balance(&alice.address()), 5_000);
    assert_eq!(network.height(), 0);
}

#[test]
fn test_close_remainder_to_empties_sender() {
    let mut network = network();
    let alice = funded(&mut network, 10_000);
    let bob = Keypair::generate().address();
    let txn = PaymentBuilder::new()
        .sender(alice.address())
        .receiver(bob)
        .amount(1_000)
        .close_remainder_to(bob)
        .build()
        .unwrap();

    network.submit(single(txn, &alice)).unwrap();

    assert!(!network.accounts().exists(&alice.address()));
    assert_eq!(network.balance(&bob), 9_000);
}

// ============================================================================
// ATOMIC GROUPS
// ============================================================================

#[test]
fn test_failing_member_reverts_whole_group() {
    let mut network = network();
    let alice = funded(&mut network, 10_000);
    let bob = Keypair::generate().address();

    let group = group_of(
        vec![payment(&alice, bob, 3_000), payment(&alice, bob, 50_000)],
        &alice,
    );
    let err = network.submit(group).unwrap_err();

    assert!(matches!(err, ExecutionError::Ledger { index: 1, .. }));
    assert_eq!(network.balance(&alice.address()), 10_000);
    assert_eq!(network.balance(&bob), 0);
}

#[test]
fn test_committed_group_confirms_every_member() {
    let mut network = network();
    let alice = funded(&mut network, 10_000);
    let bob = Keypair::generate().address();

    let group = group_of(
        vec![payment(&alice, bob, 1_000), payment(&alice, bob, 1_000)],
        &alice,
    );
    let ids = group.ids();
    let receipt = network.submit(group).unwrap();

    assert_eq!(receipt.round(), 1);
    assert_eq!(receipt.txn_ids(), ids);
    for id in &ids {
        assert_eq!(network.confirmation(id).unwrap().round, 1);
    }
}

#[test]
fn test_resubmitted_group_rejected() {
    let mut network = network();
    let alice = funded(&mut network, 10_000);
    let group = single(payment(&alice, Address::ZERO, 1), &alice);

    network.submit(group.clone()).unwrap();
    let err = network.submit(group).unwrap_err();

    assert!(matches!(err, ExecutionError::Duplicate { index: 0, .. }));
}

#[test]
fn test_host_group_limit() {
    let mut network = Network::new(NetworkConfig::new().with_max_group_size(2)).unwrap();
    let alice = funded(&mut network, 100_000);
    let txns = (0..3).map(|_| payment(&alice, Address::ZERO, 1)).collect();

    let err = network.submit(group_of(txns, &alice)).unwrap_err();
    assert!(matches!(err, ExecutionError::GroupTooLarge { size: 3, max: 2 }));
}

// ============================================================================
// CLOCK
// ============================================================================

#[test]
fn test_clock_starts_at_genesis_and_only_moves_forward() {
    let mut network = Network::new(NetworkConfig::new().with_genesis_timestamp(500)).unwrap();
    assert_eq!(network.latest_timestamp(), 500);

    network.advance_time(25);
    assert_eq!(network.latest_timestamp(), 525);

    assert!(matches!(
        network.set_timestamp(100),
        Err(ExecutionError::ClockRegression {
            latest: 525,
            requested: 100
        })
    ));
    network.set_timestamp(600).unwrap();
    assert_eq!(network.latest_timestamp(), 600);
}

#[test]
fn test_confirmation_carries_block_timestamp() {
    let mut network = Network::new(NetworkConfig::new().with_genesis_timestamp(42)).unwrap();
    let alice = funded(&mut network, 10_000);
    let group = single(payment(&alice, Address::ZERO, 1), &alice);
    let id = group.ids()[0];

    network.submit(group).unwrap();
    assert_eq!(network.confirmation(&id).unwrap().timestamp, 42);
}

// ============================================================================
// APPLICATION DISPATCH
// ============================================================================

#[test]
fn test_creation_assigns_sequential_ids() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);

    let first = deploy_open_round(&mut network, &creator);
    let second = deploy_open_round(&mut network, &creator);

    assert_eq!(first, AppId::new(1));
    assert_eq!(second, AppId::new(2));
    assert_eq!(network.app(&first).unwrap().creator(), &creator.address());
    assert_eq!(network.apps().count(), 2);
}

#[test]
fn test_creation_with_bad_args_rejected() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let txn = AppCreateBuilder::new()
        .sender(creator.address())
        .global_schema(ROUND_GLOBAL_SCHEMA)
        .build()
        .unwrap();

    let err = network.submit(single(txn, &creator)).unwrap_err();
    assert!(matches!(
        err.round_error(),
        Some(RoundError::MissingArgument { index: 0, .. })
    ));
    assert_eq!(network.apps().count(), 0);
    assert_eq!(network.balance(&creator.address()), 10_000);
}

#[test]
fn test_match_call_without_transfer_rejected() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);

    let txn = call(&creator, app).arg("match").build().unwrap();
    let err = network.submit(single(txn, &creator)).unwrap_err();

    assert!(matches!(err.round_error(), Some(RoundError::MissingTransfer)));
}

#[test]
fn test_match_with_leading_extra_transactions_accepted() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);
    let matcher = funded(&mut network, 100_000);

    let group = group_of(
        vec![
            payment(&matcher, Address::ZERO, 1),
            payment(&matcher, app.address(), 10_000),
            call(&matcher, app).arg("match").build().unwrap(),
        ],
        &matcher,
    );
    network.submit(group).unwrap();

    let state = network.app(&app).unwrap().global_state();
    assert_eq!(
        mutual_matching::round::Round::load(state).unwrap().num_matches(),
        1
    );
}

#[test]
fn test_unknown_method_rejected() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);

    let txn = call(&creator, app).arg("withdraw").build().unwrap();
    let err = network.submit(single(txn, &creator)).unwrap_err();

    assert!(matches!(
        err.round_error(),
        Some(RoundError::UnknownMethod(method)) if method == "withdraw"
    ));
}

#[test]
fn test_noop_without_method_rejected() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);

    let txn = call(&creator, app).build().unwrap();
    let err = network.submit(single(txn, &creator)).unwrap_err();

    assert!(matches!(err.round_error(), Some(RoundError::MissingMethod)));
}

#[test]
fn test_unsupported_completions_rejected() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);

    for on_completion in [
        OnCompletion::OptIn,
        OnCompletion::CloseOut,
        OnCompletion::UpdateApplication,
    ] {
        let txn = call(&creator, app).on_completion(on_completion).build().unwrap();
        let err = network.submit(single(txn, &creator)).unwrap_err();
        assert!(matches!(
            err.round_error(),
            Some(RoundError::UnsupportedCompletion(c)) if *c == on_completion
        ));
    }
}

#[test]
fn test_clear_state_approved() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);

    let txn = call(&creator, app)
        .on_completion(OnCompletion::ClearState)
        .build()
        .unwrap();
    network.submit(single(txn, &creator)).unwrap();

    assert!(network.app(&app).is_some());
}

#[test]
fn test_clear_state_with_args_invalid() {
    let mut network = network();
    let creator = funded(&mut network, 10_000);
    let app = deploy_open_round(&mut network, &creator);

    let txn = call(&creator, app)
        .on_completion(OnCompletion::ClearState)
        .arg("match")
        .build()
        .unwrap();
    let err = network.submit(single(txn, &creator)).unwrap_err();

    assert!(matches!(
        err,
        ExecutionError::Invalid {
            source: ValidationError::ClearStateWithArgs,
            ..
        }
    ));
}

#[test]
fn test_call_to_unknown_app_rejected() {
    let mut network = network();
    let caller = funded(&mut network, 10_000);

    let txn = call(&caller, AppId::new(99)).arg("match").build().unwrap();
    let err = network.submit(single(txn, &caller)).unwrap_err();

    assert!(matches!(err, ExecutionError::NoSuchApp { index: 0, .. }));
}
