use std::sync::Arc;

use anyhow::{Context, Result};

use ledgerd::config::AppConfig;
use ledgerd::db::Database;
use ledgerd::gateway::{self, state::AppState};
use ledgerd::transfer::TransferExecutor;
use ledgerd::user_auth::UserAuthService;
use ledgerd::{logging, schema};

#[tokio::main]
async fn main() -> Result<()> {
    let env = std::env::var("LEDGERD_ENV").unwrap_or_else(|_| "default".to_string());
    let config = AppConfig::load(&env)?;

    let _guard = logging::init_logging(&config);

    tracing::info!("ledgerd starting (build {})", env!("GIT_HASH"));

    let db = Arc::new(
        Database::connect(&config.database)
            .await
            .context("Failed to connect to PostgreSQL")?,
    );
    schema::init_schema(db.pool())
        .await
        .context("Failed to initialize schema")?;

    let executor = Arc::new(TransferExecutor::new(db.pool().clone()));
    let user_auth = Arc::new(UserAuthService::new(
        db.pool().clone(),
        config.auth.jwt_secret.clone(),
        config.auth.token_ttl_hours,
    ));

    let state = Arc::new(AppState::new(
        db,
        executor,
        user_auth,
        config.amount_decimals,
    ));

    gateway::run_server(&config.gateway, state).await
}
