//! Shared in-memory fakes for integration tests.
//!
//! These stand in for the database-backed stores and the HTTP agent client
//! so the services can be exercised without PostgreSQL or real gateways.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use uuid::Uuid;

use vpn_control_plane::domain::{
    Gateway, GatewayChanges, GatewayHealth, NewGateway, TunnelAssignment, TunnelKeyPair, User,
    UserRole,
};
use vpn_control_plane::errors::{AppError, AppResult};
use vpn_control_plane::infra::{
    AgentClient, AgentError, AgentStats, GatewayRepository, PeerRequest, UserRepository,
};
use vpn_control_plane::services::TunnelAllocator;

pub const GATEWAY_PUBLIC_KEY: &str = "hSDwCYkwp1R0i33ctD73Wg2/Og0mOBr066SpjqqbTmo=";

pub fn gateway(name: &str, load: i32) -> Gateway {
    Gateway {
        id: Uuid::new_v4(),
        name: name.to_string(),
        api_endpoint: format!("http://{}.vpn.example.com:8000", name),
        api_key: format!("{}-key", name),
        subnet: "10.10.0.0/16".parse().unwrap(),
        public_key: GATEWAY_PUBLIC_KEY.to_string(),
        health: GatewayHealth::from_stored(load),
        total_peers: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn user(email: &str) -> User {
    User::new(Uuid::new_v4(), email.to_string(), "hash".to_string())
}

// =============================================================================
// Gateway registry
// =============================================================================

#[derive(Default)]
pub struct InMemoryGateways {
    rows: Mutex<Vec<Gateway>>,
    pub fail_list: Mutex<bool>,
}

impl InMemoryGateways {
    pub fn with(gateways: Vec<Gateway>) -> Self {
        Self {
            rows: Mutex::new(gateways),
            fail_list: Mutex::new(false),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Gateway> {
        self.rows.lock().unwrap().iter().find(|g| g.id == id).cloned()
    }

    pub fn insert(&self, gateway: Gateway) {
        self.rows.lock().unwrap().push(gateway);
    }
}

#[async_trait]
impl GatewayRepository for InMemoryGateways {
    async fn least_loaded(&self) -> AppResult<Gateway> {
        let rows = self.rows.lock().unwrap();
        vpn_control_plane::domain::least_loaded(rows.iter())
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Gateway>> {
        Ok(self.get(id))
    }

    async fn list(&self) -> AppResult<Vec<Gateway>> {
        if *self.fail_list.lock().unwrap() {
            return Err(AppError::internal("connection reset"));
        }
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn create(&self, new: NewGateway) -> AppResult<Gateway> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|g| g.name == new.name) {
            return Err(AppError::conflict("Gateway name"));
        }
        let gateway = Gateway {
            id: Uuid::new_v4(),
            name: new.name,
            api_endpoint: new.api_endpoint,
            api_key: new.api_key,
            subnet: new.subnet,
            public_key: new.public_key,
            health: GatewayHealth::Healthy { active_users: 0 },
            total_peers: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        rows.push(gateway.clone());
        Ok(gateway)
    }

    async fn update(&self, id: Uuid, changes: GatewayChanges) -> AppResult<Gateway> {
        let mut rows = self.rows.lock().unwrap();
        let gateway = rows.iter_mut().find(|g| g.id == id).ok_or(AppError::NotFound)?;
        if let Some(name) = changes.name {
            gateway.name = name;
        }
        if let Some(endpoint) = changes.api_endpoint {
            gateway.api_endpoint = endpoint;
        }
        if let Some(key) = changes.api_key {
            gateway.api_key = key;
        }
        if let Some(subnet) = changes.subnet {
            gateway.subnet = subnet;
        }
        if let Some(key) = changes.public_key {
            gateway.public_key = key;
        }
        gateway.updated_at = Utc::now();
        Ok(gateway.clone())
    }

    async fn update_load(&self, id: Uuid, active_users: u32, total_peers: u32) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let gateway = rows.iter_mut().find(|g| g.id == id).ok_or(AppError::NotFound)?;
        gateway.health = GatewayHealth::Healthy { active_users };
        gateway.total_peers = total_peers;
        Ok(())
    }

    async fn mark_unreachable(&self, id: Uuid) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let gateway = rows.iter_mut().find(|g| g.id == id).ok_or(AppError::NotFound)?;
        gateway.health = GatewayHealth::Unreachable;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|g| g.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// User store
// =============================================================================

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<HashMap<Uuid, User>>,
    pub assignments: AtomicUsize,
}

impl InMemoryUsers {
    pub fn with(users: Vec<User>) -> Self {
        Self {
            rows: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
            assignments: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn insert(&self, user: User) {
        self.rows.lock().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.get(id))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, email: String, password_hash: String) -> AppResult<User> {
        let mut rows = self.rows.lock().unwrap();
        let email = email.to_lowercase();
        if rows.values().any(|u| u.email == email) {
            return Err(AppError::conflict("User"));
        }
        let user = User::new(Uuid::new_v4(), email, password_hash);
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_role(&self, email: &str, role: UserRole) -> AppResult<User> {
        let mut rows = self.rows.lock().unwrap();
        let user = rows
            .values_mut()
            .find(|u| u.email == email)
            .ok_or(AppError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }

    async fn assign_tunnel(&self, id: Uuid, assignment: &TunnelAssignment) -> AppResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let taken = rows.values().any(|u| {
            u.tunnel.as_ref().is_some_and(|t| {
                t.gateway_id == assignment.gateway_id && t.address == assignment.address
            })
        });
        if taken {
            return Err(AppError::conflict("Tunnel address"));
        }

        match rows.get_mut(&id) {
            Some(user) if user.tunnel.is_none() => {
                user.tunnel = Some(assignment.clone());
                self.assignments.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_by_gateway(&self, gateway_id: Uuid) -> AppResult<u64> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.tunnel.as_ref().is_some_and(|t| t.gateway_id == gateway_id))
            .count() as u64)
    }

    async fn tunnel_addresses(&self, gateway_id: Uuid) -> AppResult<Vec<Ipv4Addr>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter_map(|u| u.tunnel.as_ref())
            .filter(|t| t.gateway_id == gateway_id)
            .map(|t| t.address)
            .collect())
    }
}

// =============================================================================
// Gateway agent
// =============================================================================

/// Agent fake that records peer registrations.
#[derive(Default)]
pub struct RecordingAgent {
    pub add_peer_calls: AtomicUsize,
    pub peers: Mutex<Vec<PeerRequest>>,
    /// Held inside `add_peer` to widen race windows
    pub delay: Option<Duration>,
    pub fail_add_peer: bool,
    /// Stats per gateway name; gateways without an entry time out
    pub stats: Mutex<HashMap<String, AgentStats>>,
}

impl RecordingAgent {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_add_peer: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.add_peer_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentClient for RecordingAgent {
    async fn add_peer(&self, _gateway: &Gateway, peer: &PeerRequest) -> Result<(), AgentError> {
        self.add_peer_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_add_peer {
            return Err(AgentError::Rejected {
                status: 500,
                body: "wg set failed".to_string(),
            });
        }
        self.peers.lock().unwrap().push(peer.clone());
        Ok(())
    }

    async fn get_stats(&self, gateway: &Gateway) -> Result<AgentStats, AgentError> {
        self.stats
            .lock()
            .unwrap()
            .get(&gateway.name)
            .copied()
            .ok_or(AgentError::Timeout)
    }
}

// =============================================================================
// Allocator
// =============================================================================

/// Always hands out the same address
pub struct FixedAllocator {
    pub address: Ipv4Addr,
    pub released: Mutex<Vec<Ipv4Addr>>,
}

impl FixedAllocator {
    pub fn new(address: Ipv4Addr) -> Self {
        Self {
            address,
            released: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TunnelAllocator for FixedAllocator {
    fn generate_key_pair(&self) -> TunnelKeyPair {
        TunnelKeyPair::generate()
    }

    async fn allocate_address(&self, _gateway: &Gateway) -> AppResult<Ipv4Addr> {
        Ok(self.address)
    }

    async fn release_address(&self, _gateway_id: Uuid, address: Ipv4Addr) {
        self.released.lock().unwrap().push(address);
    }

    async fn forget_gateway(&self, _gateway_id: Uuid) {}
}

// =============================================================================
// Throwaway HTTP servers
// =============================================================================

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
