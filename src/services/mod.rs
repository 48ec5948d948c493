//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.

mod allocator;
mod auth_service;
pub mod container;
mod gateway_service;
mod provisioning_service;
mod user_locks;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use allocator::{LedgerAllocator, TunnelAllocator};
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use gateway_service::{GatewayManager, GatewayService};
pub use provisioning_service::{Provisioner, ProvisioningService};
pub use user_locks::{UserLockGuard, UserLocks};

#[cfg(any(test, feature = "test-utils"))]
pub use allocator::MockTunnelAllocator;
#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
