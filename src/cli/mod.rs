//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `serve` - Start the HTTP server and stats poller
//! - `migrate` - Database migrations
//! - `stats` - One-off gateway stats poll
//! - `keygen` - WireGuard key generation
//! - `promote` - Grant the admin role

pub mod args;

pub use args::{Cli, Commands};
