//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{admin_handler, auth_handler, vpn_handler};
use crate::domain::{CreateGateway, GatewayResponse, UpdateGateway, UserResponse};
use crate::services::TokenResponse;
use crate::types::MessageResponse;

/// OpenAPI documentation for the VPN control plane
#[derive(OpenApi)]
#[openapi(
    info(
        title = "VPN Control Plane",
        version = "0.1.0",
        description = "Gateway registry, tunnel provisioning and WireGuard config delivery"
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::register,
        auth_handler::login,
        auth_handler::me,
        // Client endpoints
        vpn_handler::get_config,
        // Gateway administration
        admin_handler::create_gateway,
        admin_handler::list_gateways,
        admin_handler::update_gateway,
        admin_handler::delete_gateway,
    ),
    components(
        schemas(
            UserResponse,
            CreateGateway,
            UpdateGateway,
            GatewayResponse,
            MessageResponse,
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            TokenResponse,
            auth_handler::SessionResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "User registration and login"),
        (name = "VPN", description = "Client tunnel configuration"),
        (name = "Gateways", description = "Gateway registry administration")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /auth/login"))
                        .build(),
                ),
            );
        }
    }
}
