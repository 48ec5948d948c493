//! Stats poller against throwaway agent servers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderMap, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use common::{gateway, spawn_server, InMemoryGateways, RecordingAgent};
use vpn_control_plane::domain::{Gateway, GatewayHealth};
use vpn_control_plane::infra::{AgentStats, HttpAgentClient};
use vpn_control_plane::jobs::{CycleReport, StatsPoller};

const AGENT_KEY: &str = "agent-secret";

async fn healthy_stats(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        Some(AGENT_KEY) => Ok(Json(json!({ "active_users": 4, "total_peers": 9 }))),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn hanging_stats() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "active_users": 0, "total_peers": 0 }))
}

fn gateway_at(name: &str, endpoint: &str, load: i32, total_peers: u32) -> Gateway {
    let mut gw = gateway(name, load);
    gw.api_endpoint = endpoint.to_string();
    gw.api_key = AGENT_KEY.to_string();
    gw.total_peers = total_peers;
    gw
}

fn http_client() -> Arc<HttpAgentClient> {
    Arc::new(HttpAgentClient::new(Duration::from_millis(200)).unwrap())
}

#[tokio::test]
async fn test_timeout_sets_sentinel_and_keeps_total_peers() {
    let healthy = spawn_server(Router::new().route("/stats", get(healthy_stats))).await;
    let hanging = spawn_server(Router::new().route("/stats", get(hanging_stats))).await;

    let up = gateway_at("up", &healthy, 1, 3);
    let down = gateway_at("down", &hanging, 5, 40);
    let (up_id, down_id) = (up.id, down.id);
    let gateways = Arc::new(InMemoryGateways::with(vec![up, down]));

    let poller = StatsPoller::new(gateways.clone(), http_client(), Duration::from_secs(30), 4);
    let report = poller.run_cycle().await.unwrap();

    assert_eq!(
        report,
        CycleReport {
            refreshed: 1,
            unreachable: 1,
            write_failures: 0
        }
    );

    let down = gateways.get(down_id).unwrap();
    assert_eq!(down.health, GatewayHealth::Unreachable);
    assert_eq!(down.total_peers, 40);

    let up = gateways.get(up_id).unwrap();
    assert_eq!(up.health, GatewayHealth::Healthy { active_users: 4 });
    assert_eq!(up.total_peers, 9);
}

#[tokio::test]
async fn test_wrong_api_key_counts_as_unreachable() {
    let healthy = spawn_server(Router::new().route("/stats", get(healthy_stats))).await;
    let mut gw = gateway_at("fra", &healthy, 2, 2);
    gw.api_key = "stale-key".to_string();
    let id = gw.id;
    let gateways = Arc::new(InMemoryGateways::with(vec![gw]));

    let poller = StatsPoller::new(gateways.clone(), http_client(), Duration::from_secs(30), 4);
    let report = poller.run_cycle().await.unwrap();

    assert_eq!(report.unreachable, 1);
    assert_eq!(gateways.get(id).unwrap().health, GatewayHealth::Unreachable);
}

#[tokio::test]
async fn test_unreachable_gateway_recovers() {
    let agent = Arc::new(RecordingAgent::default());
    agent.stats.lock().unwrap().insert(
        "fra".to_string(),
        AgentStats {
            active_users: 7,
            total_peers: 12,
        },
    );
    let gw = gateway("fra", -1);
    let id = gw.id;
    let gateways = Arc::new(InMemoryGateways::with(vec![gw]));

    let poller = StatsPoller::new(gateways.clone(), agent, Duration::from_secs(30), 1);
    poller.run_cycle().await.unwrap();

    assert_eq!(
        gateways.get(id).unwrap().health,
        GatewayHealth::Healthy { active_users: 7 }
    );
}

#[tokio::test]
async fn test_list_failure_aborts_cycle_without_writes() {
    let gw = gateway("fra", 3);
    let id = gw.id;
    let gateways = Arc::new(InMemoryGateways::with(vec![gw]));
    *gateways.fail_list.lock().unwrap() = true;

    let poller = StatsPoller::new(
        gateways.clone(),
        Arc::new(RecordingAgent::default()),
        Duration::from_secs(30),
        4,
    );
    assert!(poller.run_cycle().await.is_err());
    assert_eq!(
        gateways.get(id).unwrap().health,
        GatewayHealth::Healthy { active_users: 3 }
    );
}

#[tokio::test]
async fn test_background_run_polls_immediately_and_stops() {
    let agent = Arc::new(RecordingAgent::default());
    agent.stats.lock().unwrap().insert(
        "fra".to_string(),
        AgentStats {
            active_users: 1,
            total_peers: 1,
        },
    );
    let gw = gateway("fra", 0);
    let id = gw.id;
    let gateways = Arc::new(InMemoryGateways::with(vec![gw]));

    // Interval far longer than the test: only the startup cycle can run
    let poller = StatsPoller::new(gateways.clone(), agent, Duration::from_secs(3600), 4);
    let shutdown = CancellationToken::new();
    let handle = poller.spawn(shutdown.clone());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        gateways.get(id).unwrap().health,
        GatewayHealth::Healthy { active_users: 1 }
    );

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller did not stop")
        .unwrap();
}
