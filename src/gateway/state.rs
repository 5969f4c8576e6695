use std::sync::Arc;

use crate::db::Database;
use crate::transfer::TransferExecutor;
use crate::user_auth::UserAuthService;

/// Shared gateway state
pub struct AppState {
    pub db: Arc<Database>,
    pub executor: Arc<TransferExecutor>,
    pub user_auth: Arc<UserAuthService>,
    /// Minor-unit decimals for client amount strings
    pub amount_decimals: u32,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        executor: Arc<TransferExecutor>,
        user_auth: Arc<UserAuthService>,
        amount_decimals: u32,
    ) -> Self {
        Self {
            db,
            executor,
            user_auth,
            amount_decimals,
        }
    }
}
