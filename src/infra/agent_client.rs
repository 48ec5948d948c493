//! HTTP client for the control agent running on each gateway.
//!
//! Every call carries the gateway's shared secret in the `x-api-key` header
//! and is bounded by the client-wide timeout.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AGENT_ADD_PEER_PATH, AGENT_API_KEY_HEADER, AGENT_STATS_PATH};
use crate::domain::Gateway;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Longest agent response body kept for logging
const MAX_LOGGED_BODY: usize = 512;

/// Failure talking to a gateway agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent did not answer within the timeout")]
    Timeout,

    #[error("agent unreachable: {0}")]
    Transport(String),

    #[error("agent rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("agent sent a malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout
        } else if err.is_decode() {
            AgentError::Malformed(err.to_string())
        } else {
            AgentError::Transport(err.to_string())
        }
    }
}

/// Peer registration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRequest {
    pub public_key: String,
    pub address: Ipv4Addr,
    pub peer_name: String,
}

/// Load reported by an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AgentStats {
    pub active_users: u32,
    pub total_peers: u32,
}

/// Remote agent operations used by provisioning and stats polling.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Register a peer on the gateway. Any 2xx answer is success.
    async fn add_peer(&self, gateway: &Gateway, peer: &PeerRequest) -> Result<(), AgentError>;

    /// Fetch the gateway's current load.
    async fn get_stats(&self, gateway: &Gateway) -> Result<AgentStats, AgentError>;
}

/// reqwest-backed agent client
#[derive(Clone)]
pub struct HttpAgentClient {
    client: Client,
}

impl HttpAgentClient {
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vpn-control-plane/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Turn non-2xx answers into `Rejected`, keeping a bounded body for logs.
    async fn check_status(response: Response) -> Result<Response, AgentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_LOGGED_BODY {
            let cut = (0..=MAX_LOGGED_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(AgentError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn add_peer(&self, gateway: &Gateway, peer: &PeerRequest) -> Result<(), AgentError> {
        let url = gateway.agent_url(AGENT_ADD_PEER_PATH);
        tracing::debug!(gateway = %gateway.name, %url, address = %peer.address, "Registering peer");

        let response = self
            .client
            .post(&url)
            .header(AGENT_API_KEY_HEADER, &gateway.api_key)
            .json(peer)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn get_stats(&self, gateway: &Gateway) -> Result<AgentStats, AgentError> {
        let url = gateway.agent_url(AGENT_STATS_PATH);

        let response = self
            .client
            .get(&url)
            .header(AGENT_API_KEY_HEADER, &gateway.api_key)
            .send()
            .await?;

        let body = Self::check_status(response).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| AgentError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_request_wire_format() {
        let peer = PeerRequest {
            public_key: "PUB=".into(),
            address: Ipv4Addr::new(10, 10, 7, 14),
            peer_name: "alice".into(),
        };
        let json = serde_json::to_value(&peer).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"publicKey": "PUB=", "address": "10.10.7.14", "peerName": "alice"})
        );
    }

    #[test]
    fn test_stats_rejects_negative_counts() {
        assert!(serde_json::from_str::<AgentStats>(r#"{"active_users":-1,"total_peers":3}"#).is_err());
        let stats: AgentStats =
            serde_json::from_str(r#"{"active_users":4,"total_peers":9,"uptime":12}"#).unwrap();
        assert_eq!(stats, AgentStats { active_users: 4, total_peers: 9 });
    }
}
