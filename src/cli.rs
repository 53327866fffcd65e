//! Command-line argument parsing.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Local mutual matching network.
#[derive(Parser, Debug)]
#[command(name = "matching")]
#[command(about = "Run time-gated matching rounds on a local network")]
#[command(version)]
pub struct Cli {
    /// Directory holding the network snapshot and account keys.
    #[arg(long, global = true, default_value = ".matching")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a fresh local network.
    Init {
        /// Genesis time (unix seconds or RFC 3339); defaults to now.
        #[arg(long)]
        genesis: Option<TimeArg>,

        /// Minimum transaction fee.
        #[arg(long, default_value = "1000")]
        min_fee: u64,

        /// Replace an existing network.
        #[arg(long)]
        force: bool,
    },

    /// Manage local account keys.
    #[command(subcommand)]
    Account(AccountCommand),

    /// Mint funds into an account.
    Fund {
        /// Account label or address.
        account: String,
        amount: u64,
    },

    /// Show an account balance.
    Balance {
        /// Account label or address.
        account: String,
    },

    /// Advance the network clock.
    Tick {
        /// Seconds to advance.
        #[arg(conflicts_with = "to")]
        secs: Option<u64>,

        /// Move the clock to an absolute time instead.
        #[arg(long)]
        to: Option<TimeArg>,
    },

    /// Deploy a new round.
    Create {
        /// Label of the deploying account.
        #[arg(long)]
        creator: String,

        /// Account label or address receiving the payout.
        #[arg(long)]
        beneficiary: String,

        /// Account label or address receiving the residual balance.
        #[arg(long)]
        burn: String,

        /// Window start (unix seconds, RFC 3339, or +secs from now).
        #[arg(long)]
        start: TimeArg,

        /// Window end (unix seconds, RFC 3339, or +secs from now).
        #[arg(long)]
        end: TimeArg,

        /// Pledge tier size.
        #[arg(long)]
        min_match: u64,

        /// Multiplier applied per match.
        #[arg(long, default_value = "2")]
        growth: u64,
    },

    /// Pledge to a round.
    Match {
        app_id: u64,

        /// Label of the pledging account.
        #[arg(long)]
        from: String,

        /// Amount to pay into the round; defaults to its min_match.
        #[arg(long)]
        amount: Option<u64>,
    },

    /// Close a round and settle it.
    Close {
        app_id: u64,

        /// Label of the closing account.
        #[arg(long)]
        from: String,
    },

    /// Show a round, or every round if no id is given.
    Show { app_id: Option<u64> },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Generate and store a new keypair.
    New { label: String },
    /// List stored accounts with their balances.
    List,
}

/// A point in time given on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeArg {
    Absolute(u64),
    /// Seconds after the network's current time
    Relative(u64),
}

impl TimeArg {
    pub fn resolve(self, now: u64) -> u64 {
        match self {
            TimeArg::Absolute(ts) => ts,
            TimeArg::Relative(secs) => now.saturating_add(secs),
        }
    }
}

impl FromStr for TimeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix('+') {
            return rest
                .parse()
                .map(TimeArg::Relative)
                .map_err(|e| format!("invalid offset '{}': {}", s, e));
        }
        if let Ok(ts) = s.parse::<u64>() {
            return Ok(TimeArg::Absolute(ts));
        }
        let parsed = DateTime::parse_from_rfc3339(s)
            .map_err(|e| format!("invalid time '{}': {}", s, e))?;
        u64::try_from(parsed.timestamp())
            .map(TimeArg::Absolute)
            .map_err(|_| format!("time '{}' is before the unix epoch", s))
    }
}

/// Render a unix timestamp for humans.
pub fn format_time(ts: u64) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| format!("{} ({})", dt.to_rfc3339(), ts))
        .unwrap_or_else(|| ts.to_string())
}
