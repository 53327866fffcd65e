//! `matching` - drive matching rounds on a persistent local network.
//!
//! Each invocation loads the network snapshot from the data directory,
//! runs one command against a `LocalNode`, and saves the snapshot back.

mod cli;

use clap::Parser;
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::cli::{format_time, AccountCommand, Cli, Command};
use mutual_matching::client::{
    ClientConfig, ClientError, LocalNode, MatchingClient, NodeHandle, Submitter,
};
use mutual_matching::identity::{Address, AddressError, Keypair};
use mutual_matching::ledger::{Confirmation, ExecutionError, Network, NetworkConfig};
use mutual_matching::round::{InnerPayment, Round, RoundParams};
use mutual_matching::storage::{MatchingStore, StoreError};
use mutual_matching::txn::AppId;

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("No network found; run `matching init` first")]
    NotInitialized,

    #[error("A network already exists; pass --force to replace it")]
    AlreadyInitialized,

    #[error("Account label '{0}' is already taken")]
    LabelTaken(String),

    #[error("'{0}' is neither a stored account nor an address: {1}")]
    UnknownAccount(String, AddressError),

    #[error("No stored key for account '{0}'")]
    MissingKey(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let store = MatchingStore::open(&cli.data_dir)?;

    match cli.command {
        Command::Init {
            genesis,
            min_fee,
            force,
        } => {
            if !force && store.load_network()?.is_some() {
                return Err(CliError::AlreadyInitialized);
            }
            let now = unix_now();
            let genesis = genesis.map_or(now, |t| t.resolve(now));
            let config = NetworkConfig::new()
                .with_min_txn_fee(min_fee)
                .with_genesis_timestamp(genesis);
            let network = Network::new(config)?;
            store.save_network(&network)?;
            store.flush()?;
            println!("network initialized at {}", format_time(genesis));
            Ok(())
        }

        Command::Account(AccountCommand::New { label }) => {
            if store.load_keypair(&label)?.is_some() {
                return Err(CliError::LabelTaken(label));
            }
            let keypair = Keypair::generate();
            store.save_keypair(&label, &keypair)?;
            store.flush()?;
            println!("{}: {}", label, keypair.address());
            Ok(())
        }

        Command::Account(AccountCommand::List) => {
            let network = store.load_network()?;
            for label in store.keypair_labels()? {
                let Some(keypair) = store.load_keypair(&label)? else {
                    continue;
                };
                let address = keypair.address();
                match &network {
                    Some(network) => {
                        println!("{:<12} {} {}", label, address, network.balance(&address))
                    }
                    None => println!("{:<12} {}", label, address),
                }
            }
            Ok(())
        }

        command => {
            let network = store.load_network()?.ok_or(CliError::NotInitialized)?;
            let node = LocalNode::spawn(network);
            let client = MatchingClient::new(node.clone(), ClientConfig::default())?;

            let result = execute(&store, &node, &client, command).await;

            // Rejected groups leave the network untouched, so the snapshot is
            // saved either way.
            let network = node.shutdown().await?;
            store.save_network(&network)?;
            store.flush()?;
            result
        }
    }
}

async fn execute(
    store: &MatchingStore,
    node: &NodeHandle,
    client: &MatchingClient<NodeHandle>,
    command: Command,
) -> Result<(), CliError> {
    match command {
        Command::Fund { account, amount } => {
            let address = resolve_address(store, &account)?;
            node.fund(address, amount).await?;
            println!("{} balance: {}", account, node.balance(address).await?);
        }

        Command::Balance { account } => {
            let address = resolve_address(store, &account)?;
            println!("{}", node.balance(address).await?);
        }

        Command::Tick { secs, to } => {
            let now = node.suggested_params().await?.latest_timestamp;
            let target = match (secs, to) {
                (_, Some(to)) => to.resolve(now),
                (Some(secs), None) => now.saturating_add(secs),
                (None, None) => now,
            };
            if target < now {
                return Err(ExecutionError::ClockRegression {
                    latest: now,
                    requested: target,
                }
                .into());
            }
            let now = node.advance_time(target - now).await?;
            println!("now {}", format_time(now));
        }

        Command::Create {
            creator,
            beneficiary,
            burn,
            start,
            end,
            min_match,
            growth,
        } => {
            let keypair = load_key(store, &creator)?;
            let now = node.suggested_params().await?.latest_timestamp;
            let params = RoundParams {
                beneficiary: resolve_address(store, &beneficiary)?,
                burn_address: resolve_address(store, &burn)?,
                start_time: start.resolve(now),
                end_time: end.resolve(now),
                min_match,
                match_growth: growth,
            };
            let app_id = client.create_round(&keypair, &params).await?;
            println!("round {} created", app_id);
            println!("custody address: {}", app_id.address());
        }

        Command::Match {
            app_id,
            from,
            amount,
        } => {
            let keypair = load_key(store, &from)?;
            let app_id = AppId::new(app_id);
            let amount = match amount {
                Some(amount) => amount,
                None => client.round_state(app_id).await?.min_match(),
            };
            client.commit_match(app_id, &keypair, amount).await?;
            let round = client.round_state(app_id).await?;
            println!(
                "match accepted: num_matches={} total_match_amount={}",
                round.num_matches(),
                round.total_match_amount()
            );
        }

        Command::Close { app_id, from } => {
            let keypair = load_key(store, &from)?;
            let confirmation = client.close_round(AppId::new(app_id), &keypair).await?;
            print_settlement(app_id, &confirmation);
        }

        Command::Show { app_id: Some(app_id) } => {
            let app_id = AppId::new(app_id);
            let round = client.round_state(app_id).await?;
            let now = node.suggested_params().await?.latest_timestamp;
            let custody = node.balance(app_id.address()).await?;
            print_round(app_id, &round, now, custody);
        }

        Command::Show { app_id: None } => {
            let params = node.suggested_params().await?;
            println!(
                "height {} at {}",
                params.height,
                format_time(params.latest_timestamp)
            );
            for instance in node.applications().await? {
                let round = Round::load(instance.global_state()).map_err(ClientError::from)?;
                let custody = node.balance(instance.address()).await?;
                print_round(instance.id(), &round, params.latest_timestamp, custody);
            }
        }

        Command::Init { .. } | Command::Account(_) => {}
    }
    Ok(())
}

fn load_key(store: &MatchingStore, label: &str) -> Result<Keypair, CliError> {
    store
        .load_keypair(label)?
        .ok_or_else(|| CliError::MissingKey(label.to_string()))
}

/// A stored account label, or a base58 address
fn resolve_address(store: &MatchingStore, account: &str) -> Result<Address, CliError> {
    if let Some(keypair) = store.load_keypair(account)? {
        return Ok(keypair.address());
    }
    Address::from_str(account).map_err(|e| CliError::UnknownAccount(account.to_string(), e))
}

fn print_round(app_id: AppId, round: &Round, now: u64, custody: u64) {
    println!("round {}", app_id);
    println!("  phase:              {:?}", round.phase_at(now));
    println!("  beneficiary:        {}", round.beneficiary());
    println!("  burn address:       {}", round.burn_address());
    println!("  start:              {}", format_time(round.start_time()));
    println!("  end:                {}", format_time(round.end_time()));
    println!("  min_match:          {}", round.min_match());
    println!("  match_growth:       {}", round.match_growth());
    println!("  num_matches:        {}", round.num_matches());
    println!("  total_match_amount: {}", round.total_match_amount());
    println!("  custody balance:    {}", custody);
}

fn print_settlement(app_id: u64, confirmation: &Confirmation) {
    println!("round {} closed in block {}", app_id, confirmation.round);
    for payment in &confirmation.inner_payments {
        match payment {
            InnerPayment::Payout {
                receiver,
                amount,
                fee,
            } => println!("  payout {} to {} (fee {})", amount, receiver, fee),
            InnerPayment::BurnRemainder { receiver, amount } => {
                println!("  burned {} to {}", amount, receiver)
            }
        }
    }
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
