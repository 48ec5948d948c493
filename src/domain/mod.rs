//! Domain layer - Core business entities and logic
//!
//! Gateways, users and their tunnel assignments, plus the pure pieces of
//! provisioning: gateway selection, address picking, key generation and
//! config rendering. Nothing in here performs I/O.

pub mod address;
pub mod gateway;
pub mod keys;
pub mod password;
pub mod tunnel_config;
pub mod user;

pub use gateway::{
    least_loaded, CreateGateway, Gateway, GatewayChanges, GatewayHealth, GatewayResponse,
    NewGateway, UpdateGateway,
};
pub use keys::TunnelKeyPair;
pub use password::Password;
pub use user::{PlanTier, TunnelAssignment, User, UserResponse, UserRole};
