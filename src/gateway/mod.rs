pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::GatewayConfig;
use crate::user_auth;

use state::AppState;

/// Build the router and serve until shutdown.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let public_routes = Router::new()
        .route("/auth/register", post(user_auth::handlers::register))
        .route("/auth/login", post(user_auth::handlers::login))
        .route("/health", get(handlers::health_check));

    let private_routes = Router::new()
        .route("/transfer", post(handlers::create_transfer))
        .route("/transfer/{transaction_id}", get(handlers::get_transfer))
        .route(
            "/accounts",
            post(handlers::open_account).get(handlers::list_accounts),
        )
        .route(
            "/accounts/{account_id}/ledger",
            get(handlers::account_ledger),
        )
        .route("/audit", get(handlers::recent_audit))
        .layer(from_fn_with_state(
            state.clone(),
            user_auth::middleware::jwt_auth_middleware,
        ));

    let app = Router::new()
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest("/api/v1", public_routes.merge(private_routes))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
