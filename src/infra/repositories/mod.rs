//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

pub(crate) mod entities;
mod gateway_repository;
mod user_repository;

pub use gateway_repository::{GatewayRepository, GatewayStore};
pub use user_repository::{UserRepository, UserStore};

// Export mocks for tests
#[cfg(any(test, feature = "test-utils"))]
pub use gateway_repository::MockGatewayRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
