//! OpenAPI documentation
//!
//! The generated document is served as JSON at `/api-docs/openapi.json`.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Bearer JWT security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Main API documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ledgerd API",
        version = "1.0.0",
        description = "Account-ledger service: atomic double-entry transfers with idempotent replay."
    ),
    paths(
        crate::gateway::handlers::health_check,
        crate::gateway::handlers::create_transfer,
        crate::gateway::handlers::get_transfer,
        crate::gateway::handlers::open_account,
        crate::gateway::handlers::list_accounts,
        crate::gateway::handlers::account_ledger,
        crate::gateway::handlers::recent_audit,
        crate::user_auth::handlers::register,
        crate::user_auth::handlers::login,
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health and diagnostics"),
        (name = "Auth", description = "Registration and sessions"),
        (name = "Transfer", description = "Transfer execution and lookup"),
        (name = "Account", description = "Accounts and ledger history"),
        (name = "Audit", description = "Audit trail reads"),
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
