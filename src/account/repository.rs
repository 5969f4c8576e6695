//! Repository layer for account reads and provisioning

use super::models::Account;
use sqlx::PgPool;
use uuid::Uuid;

/// Account repository
pub struct AccountRepository;

impl AccountRepository {
    /// Get account by ID
    pub async fn get_by_id(pool: &PgPool, account_id: Uuid) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT account_id, user_id, status, current_balance, created_at, frozen_at, terminated_at
               FROM accounts WHERE account_id = $1"#,
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await
    }

    /// List accounts owned by a user
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Account>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT account_id, user_id, status, current_balance, created_at, frozen_at, terminated_at
               FROM accounts WHERE user_id = $1 ORDER BY created_at"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Open a new ACTIVE account with zero balance.
    ///
    /// Provisioning only; balances change exclusively through the transfer
    /// executor's conditional updates (and test seeding).
    pub async fn open(pool: &PgPool, user_id: Uuid) -> Result<Account, sqlx::Error> {
        sqlx::query_as(
            r#"INSERT INTO accounts (user_id) VALUES ($1)
               RETURNING account_id, user_id, status, current_balance, created_at, frozen_at, terminated_at"#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
