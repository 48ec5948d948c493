//! Gateway administration rules.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use common::{gateway, user, InMemoryGateways, InMemoryUsers, GATEWAY_PUBLIC_KEY};
use vpn_control_plane::domain::{
    CreateGateway, Gateway, GatewayResponse, TunnelAssignment, UpdateGateway, User,
};
use vpn_control_plane::errors::AppError;
use vpn_control_plane::services::{GatewayManager, GatewayService, LedgerAllocator};

fn assigned_user(email: &str, gw: &Gateway, last_octet: u8) -> User {
    let mut u = user(email);
    u.tunnel = Some(TunnelAssignment {
        gateway_id: gw.id,
        address: Ipv4Addr::new(10, 10, 0, last_octet),
        public_key: "pub".to_string(),
        private_key: "priv".to_string(),
    });
    u
}

fn manager(gateways: Arc<InMemoryGateways>, users: Arc<InMemoryUsers>) -> GatewayManager {
    let allocator = Arc::new(LedgerAllocator::new(users.clone(), 64));
    GatewayManager::new(gateways, users, allocator)
}

fn create_input(name: &str) -> CreateGateway {
    CreateGateway {
        name: name.to_string(),
        api_endpoint: "https://fra-1.vpn.example.com:8000/".to_string(),
        api_key: "agent-secret".to_string(),
        subnet: "10.20.3.7/16".to_string(),
        public_key: GATEWAY_PUBLIC_KEY.to_string(),
    }
}

#[tokio::test]
async fn test_delete_with_assigned_users_is_refused() {
    let gw = gateway("fra", 3);
    let users = Arc::new(InMemoryUsers::with(vec![
        assigned_user("a@example.com", &gw, 2),
        assigned_user("b@example.com", &gw, 3),
        assigned_user("c@example.com", &gw, 4),
    ]));
    let gateways = Arc::new(InMemoryGateways::with(vec![gw.clone()]));

    let service = manager(gateways.clone(), users);
    let result = service.delete_gateway(gw.id).await;

    match result {
        Err(AppError::PrecheckFailed(msg)) => assert!(msg.contains("3 user(s)")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(gateways.get(gw.id).is_some());
}

#[tokio::test]
async fn test_delete_unused_gateway() {
    let gw = gateway("fra", 0);
    let gateways = Arc::new(InMemoryGateways::with(vec![gw.clone()]));
    let service = manager(gateways.clone(), Arc::new(InMemoryUsers::default()));

    service.delete_gateway(gw.id).await.unwrap();
    assert!(gateways.get(gw.id).is_none());

    let again = service.delete_gateway(gw.id).await;
    assert!(matches!(again, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_create_normalizes_input() {
    let gateways = Arc::new(InMemoryGateways::default());
    let service = manager(gateways, Arc::new(InMemoryUsers::default()));

    let created = service.create_gateway(create_input("fra-1")).await.unwrap();
    assert_eq!(created.subnet.to_string(), "10.20.0.0/16");
    assert_eq!(created.api_endpoint, "https://fra-1.vpn.example.com:8000");
    assert!(created.health.is_reachable());

    let json = serde_json::to_value(GatewayResponse::from(created)).unwrap();
    assert!(json.get("api_key").is_none());
    assert!(!json.to_string().contains("agent-secret"));
}

#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let service = manager(
        Arc::new(InMemoryGateways::default()),
        Arc::new(InMemoryUsers::default()),
    );
    service.create_gateway(create_input("fra-1")).await.unwrap();

    let duplicate = service.create_gateway(create_input("fra-1")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_create_rejects_bad_key_and_subnet() {
    let service = manager(
        Arc::new(InMemoryGateways::default()),
        Arc::new(InMemoryUsers::default()),
    );

    let mut bad_key = create_input("a");
    bad_key.public_key = "not-a-key".to_string();
    assert!(matches!(
        service.create_gateway(bad_key).await,
        Err(AppError::Validation(_))
    ));

    let mut bad_subnet = create_input("b");
    bad_subnet.subnet = "10.0.0.0/31".to_string();
    assert!(matches!(
        service.create_gateway(bad_subnet).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_subnet_change_refused_while_users_assigned() {
    let gw = gateway("fra", 1);
    let users = Arc::new(InMemoryUsers::with(vec![assigned_user("a@example.com", &gw, 2)]));
    let gateways = Arc::new(InMemoryGateways::with(vec![gw.clone()]));
    let service = manager(gateways.clone(), users);

    let result = service
        .update_gateway(
            gw.id,
            UpdateGateway {
                subnet: Some("10.30.0.0/16".to_string()),
                ..UpdateGateway::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::PrecheckFailed(_))));
    assert_eq!(gateways.get(gw.id).unwrap().subnet, gw.subnet);

    // Other fields can still change
    let renamed = service
        .update_gateway(
            gw.id,
            UpdateGateway {
                name: Some("fra-2".to_string()),
                ..UpdateGateway::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "fra-2");
}

#[tokio::test]
async fn test_empty_update_is_validation_error() {
    let gw = gateway("fra", 0);
    let service = manager(
        Arc::new(InMemoryGateways::with(vec![gw.clone()])),
        Arc::new(InMemoryUsers::default()),
    );

    let result = service.update_gateway(gw.id, UpdateGateway::default()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_list_is_ordered_by_name() {
    let gateways = Arc::new(InMemoryGateways::with(vec![
        gateway("zurich", 0),
        gateway("amsterdam", -1),
    ]));
    let service = manager(gateways, Arc::new(InMemoryUsers::default()));

    let names: Vec<String> = service
        .list_gateways()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["amsterdam", "zurich"]);
}
