//! VPN control plane
//!
//! Keeps a registry of WireGuard gateways, hands every user exactly one
//! tunnel on the least-loaded reachable gateway, and polls gateway agents
//! for load in the background.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core entities plus selection, addressing, keys and config rendering
//! - **services**: Provisioning, gateway administration and authentication
//! - **infra**: Database, repositories and the gateway agent client
//! - **jobs**: Background stats poller
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared response types
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server and poller
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Poll every gateway once
//! cargo run -- stats
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Gateway, GatewayHealth, Password, User, UserRole};
pub use errors::{AppError, AppResult};
