//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// VPN control plane - gateway registry, provisioning and stats polling
#[derive(Parser, Debug)]
#[command(name = "vpn-control-plane")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server and the stats poller
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Run one stats poll cycle and print the report
    Stats,

    /// Print a fresh WireGuard key pair
    Keygen(KeygenArgs),

    /// Grant the admin role to an existing user
    Promote(PromoteArgs),
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to, overriding SERVER_HOST
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on, overriding SERVER_PORT
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Serve HTTP only, without the background stats poller
    #[arg(long)]
    pub no_poller: bool,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the keygen command
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Derive the public key from this base64 private key instead
    #[arg(long)]
    pub private_key: Option<String>,
}

/// Arguments for the promote command
#[derive(Parser, Debug)]
pub struct PromoteArgs {
    /// Email of the user to promote
    pub email: String,
}
