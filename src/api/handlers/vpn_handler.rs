//! Client-facing VPN handlers.

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Extension, Router,
};

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::errors::AppResult;

pub fn vpn_routes() -> Router<AppState> {
    Router::new().route("/get-config", get(get_config))
}

/// Download the caller's WireGuard config, provisioning a tunnel on first use
#[utoipa::path(
    get,
    path = "/api/v1/get-config",
    tag = "VPN",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "WireGuard config", body = String, content_type = "text/plain"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Gateway agent failed"),
        (status = 503, description = "No gateway or address available")
    )
)]
pub async fn get_config(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let config = state
        .provisioning_service
        .config_for(current_user.id)
        .await?;

    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], config))
}
