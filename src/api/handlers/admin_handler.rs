//! Gateway administration handlers (admin only).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use uuid::Uuid;

use crate::api::extractors::ValidatedJson;
use crate::api::AppState;
use crate::domain::{CreateGateway, GatewayResponse, UpdateGateway};
use crate::errors::AppResult;
use crate::types::MessageResponse;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/gateways", get(list_gateways).post(create_gateway))
        .route("/gateways/:id", put(update_gateway).delete(delete_gateway))
}

/// Register a gateway
#[utoipa::path(
    post,
    path = "/admin/gateways",
    tag = "Gateways",
    security(("bearer_auth" = [])),
    request_body = CreateGateway,
    responses(
        (status = 201, description = "Gateway created", body = GatewayResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Gateway name already in use")
    )
)]
pub async fn create_gateway(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateGateway>,
) -> AppResult<(StatusCode, Json<GatewayResponse>)> {
    let gateway = state.gateway_service.create_gateway(payload).await?;
    Ok((StatusCode::CREATED, Json(GatewayResponse::from(gateway))))
}

/// List all gateways with their last reported load
#[utoipa::path(
    get,
    path = "/admin/gateways",
    tag = "Gateways",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Gateways ordered by name", body = Vec<GatewayResponse>),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_gateways(State(state): State<AppState>) -> AppResult<Json<Vec<GatewayResponse>>> {
    let gateways = state.gateway_service.list_gateways().await?;
    Ok(Json(gateways.into_iter().map(GatewayResponse::from).collect()))
}

/// Update gateway fields
#[utoipa::path(
    put,
    path = "/admin/gateways/{id}",
    tag = "Gateways",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Gateway ID")),
    request_body = UpdateGateway,
    responses(
        (status = 200, description = "Gateway updated", body = GatewayResponse),
        (status = 400, description = "Validation error or subnet change refused"),
        (status = 404, description = "Gateway not found")
    )
)]
pub async fn update_gateway(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateGateway>,
) -> AppResult<Json<GatewayResponse>> {
    let gateway = state.gateway_service.update_gateway(id, payload).await?;
    Ok(Json(GatewayResponse::from(gateway)))
}

/// Delete a gateway that has no assigned users
#[utoipa::path(
    delete,
    path = "/admin/gateways/{id}",
    tag = "Gateways",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Gateway ID")),
    responses(
        (status = 200, description = "Gateway deleted", body = MessageResponse),
        (status = 400, description = "Users are still assigned"),
        (status = 404, description = "Gateway not found")
    )
)]
pub async fn delete_gateway(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    state.gateway_service.delete_gateway(id).await?;
    Ok(Json(MessageResponse::new("Gateway deleted successfully")))
}
