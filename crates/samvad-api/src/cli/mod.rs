//! CLI command definitions and dispatch for the `samvad` binary.
//!
//! Uses clap derive macros. Administration commands (users, tokens,
//! wallets, rates) exist so an operator can seed a deployment without a
//! separate admin surface; `serve` runs the session server itself.

pub mod admin;
pub mod session;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Live consultation session server for the marketplace.
#[derive(Parser)]
#[command(name = "samvad", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP/WebSocket session server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value_t = 8000)]
        port: u16,

        /// Host/interface to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Export spans via OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Manage marketplace users.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Manage customer wallets.
    Wallet {
        #[command(subcommand)]
        action: WalletCommand,
    },

    /// Set a provider's per-minute chat rate (minor units).
    Rate {
        /// Provider user id.
        provider_id: Uuid,
        /// Rate per minute in minor currency units.
        rate: i64,
    },

    /// List consultations.
    #[command(alias = "ls")]
    Sessions {
        /// Maximum number of rows.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show store counts and data directory.
    Status,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user.
    Add {
        /// Phone number (10-digit numbers get the default country code).
        phone: String,
        /// Display name.
        name: String,
        /// Register as a provider instead of a customer.
        #[arg(long)]
        provider: bool,
    },

    /// Issue an API token for a user (printed once).
    Token {
        /// User id.
        user_id: Uuid,
    },
}

#[derive(Subcommand)]
pub enum WalletCommand {
    /// Credit a customer's wallet.
    Topup {
        /// Customer user id.
        user_id: Uuid,
        /// Amount in minor currency units.
        amount: i64,
    },

    /// Show a customer's balance.
    Balance {
        /// Customer user id.
        user_id: Uuid,
    },
}
