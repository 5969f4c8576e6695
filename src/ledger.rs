//! Double-entry ledger
//!
//! Ledger entries are the source of truth for account balances;
//! `accounts.current_balance` is a denormalized cache of their sum. Entries
//! are written only inside the transfer executor's transaction (a debit and
//! a credit pair, equal magnitude, opposite sign) and are never updated or
//! deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A signed posting against one account. Negative = debit, positive = credit.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LedgerEntry {
    pub ledger_entry_id: Uuid,
    pub amount: i64,
    pub account_id: Uuid,
    pub transaction_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub struct LedgerRepository;

impl LedgerRepository {
    /// Entries posted against an account, newest first
    pub async fn for_account(
        pool: &PgPool,
        account_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT ledger_entry_id, amount, account_id, transaction_id, created_at
               FROM ledger_entries
               WHERE account_id = $1
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(account_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Entries belonging to one transaction
    pub async fn for_transaction(
        pool: &PgPool,
        transaction_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT ledger_entry_id, amount, account_id, transaction_id, created_at
               FROM ledger_entries
               WHERE transaction_id = $1
               ORDER BY amount"#,
        )
        .bind(transaction_id)
        .fetch_all(pool)
        .await
    }

    /// Sum of all entries for an account. Reconciliation: this must equal
    /// `accounts.current_balance` at every committed state.
    pub async fn account_sum(pool: &PgPool, account_id: Uuid) -> Result<i64, sqlx::Error> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount)::BIGINT FROM ledger_entries WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_one(pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }
}
