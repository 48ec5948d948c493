//! Key generation and tunnel address allocation.
//!
//! `LedgerAllocator` keeps the set of handed-out addresses per gateway.
//! A gateway's set is seeded from the user store the first time it is
//! needed and updated under the same lock as the pick, so two concurrent
//! allocations on one gateway never return the same address. Each gateway
//! has its own lock; seeding one never holds up another.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{address, Gateway, TunnelKeyPair};
use crate::errors::{AppError, AppResult};
use crate::infra::UserRepository;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TunnelAllocator: Send + Sync {
    /// Fresh WireGuard key pair
    fn generate_key_pair(&self) -> TunnelKeyPair;

    /// Reserve a free client address in the gateway's subnet
    async fn allocate_address(&self, gateway: &Gateway) -> AppResult<Ipv4Addr>;

    /// Return a reservation that was never persisted
    async fn release_address(&self, gateway_id: Uuid, address: Ipv4Addr);

    /// Drop all state for a deleted or re-addressed gateway
    async fn forget_gateway(&self, gateway_id: Uuid);
}

/// `None` until the gateway's persisted addresses have been loaded.
type Ledger = Arc<Mutex<Option<HashSet<Ipv4Addr>>>>;

pub struct LedgerAllocator {
    users: Arc<dyn UserRepository>,
    ledgers: DashMap<Uuid, Ledger>,
    attempts: u32,
}

impl LedgerAllocator {
    /// `attempts` random picks are tried before falling back to a scan.
    pub fn new(users: Arc<dyn UserRepository>, attempts: u32) -> Self {
        Self {
            users,
            ledgers: DashMap::new(),
            attempts,
        }
    }

    fn ledger(&self, gateway_id: Uuid) -> Ledger {
        // Clone out so no shard lock is held across an await
        self.ledgers.entry(gateway_id).or_default().clone()
    }
}

#[async_trait]
impl TunnelAllocator for LedgerAllocator {
    fn generate_key_pair(&self) -> TunnelKeyPair {
        TunnelKeyPair::generate()
    }

    async fn allocate_address(&self, gateway: &Gateway) -> AppResult<Ipv4Addr> {
        let ledger = self.ledger(gateway.id);
        let mut slot = ledger.lock().await;

        if slot.is_none() {
            let existing = self.users.tunnel_addresses(gateway.id).await?;
            tracing::debug!(
                gateway = %gateway.name,
                count = existing.len(),
                "Seeded address ledger"
            );
            *slot = Some(existing.into_iter().collect());
        }

        let taken = slot
            .as_mut()
            .ok_or_else(|| AppError::internal("Address ledger not seeded"))?;

        let picked = {
            let mut rng = rand::thread_rng();
            address::pick_host(&gateway.subnet, taken, self.attempts, &mut rng)
        };

        match picked {
            Some(addr) => {
                taken.insert(addr);
                Ok(addr)
            }
            None => {
                tracing::warn!(gateway = %gateway.name, subnet = %gateway.subnet, "Subnet exhausted");
                Err(AppError::AddressExhausted)
            }
        }
    }

    async fn release_address(&self, gateway_id: Uuid, address: Ipv4Addr) {
        let Some(ledger) = self.ledgers.get(&gateway_id).map(|l| l.clone()) else {
            return;
        };
        if let Some(taken) = ledger.lock().await.as_mut() {
            taken.remove(&address);
        };
    }

    async fn forget_gateway(&self, gateway_id: Uuid) {
        self.ledgers.remove(&gateway_id);
    }
}
