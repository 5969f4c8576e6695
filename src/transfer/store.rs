//! Transaction row persistence
//!
//! All writes here run on the caller's connection so they join the
//! executor's transaction; the compensating failure write is the one
//! exception and documents it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::types::{RejectReason, ResponsePayload, TransferCommand, TxStatus};

/// A transactions row: an intent and its outcome.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: TxStatus,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tx_type: String,
    pub initiator_user_id: Uuid,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub amount: i64,
    pub idempotency_key: Option<Uuid>,
    #[sqlx(json(nullable))]
    pub response_payload: Option<ResponsePayload>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = r#"transaction_id, status, type, initiator_user_id,
       from_account_id, to_account_id, amount, idempotency_key,
       response_payload, failure_reason, created_at"#;

pub struct TransactionStore;

impl TransactionStore {
    /// Look up a prior attempt for `(initiator, key, type=TRANSFER)`.
    ///
    /// The unique partial index guarantees at most one row.
    pub async fn find_by_idempotency_key(
        executor: impl sqlx::PgExecutor<'_>,
        initiator_user_id: Uuid,
        idempotency_key: Uuid,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {COLUMNS}
               FROM transactions
               WHERE initiator_user_id = $1
                 AND idempotency_key = $2
                 AND type = 'TRANSFER'"#
        );
        sqlx::query_as(&sql)
            .bind(initiator_user_id)
            .bind(idempotency_key)
            .fetch_optional(executor)
            .await
    }

    /// Get one transaction by id
    pub async fn get(
        executor: impl sqlx::PgExecutor<'_>,
        transaction_id: Uuid,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM transactions WHERE transaction_id = $1");
        sqlx::query_as(&sql)
            .bind(transaction_id)
            .fetch_optional(executor)
            .await
    }

    /// Get one transaction by id, scoped to its initiator
    pub async fn get_for_initiator(
        executor: impl sqlx::PgExecutor<'_>,
        transaction_id: Uuid,
        initiator_user_id: Uuid,
    ) -> Result<Option<TransactionRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM transactions WHERE transaction_id = $1 AND initiator_user_id = $2"
        );
        sqlx::query_as(&sql)
            .bind(transaction_id)
            .bind(initiator_user_id)
            .fetch_optional(executor)
            .await
    }

    /// Admission: insert the PENDING row.
    ///
    /// A unique violation on the idempotency index here means a concurrent
    /// duplicate won admission since the caller's lookup; the caller handles
    /// that as a replay, not a fault.
    pub async fn insert_pending(
        conn: &mut PgConnection,
        transaction_id: Uuid,
        cmd: &TransferCommand,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO transactions
                   (transaction_id, status, type, initiator_user_id,
                    from_account_id, to_account_id, amount, idempotency_key)
               VALUES ($1, 'PENDING', 'TRANSFER', $2, $3, $4, $5, $6)"#,
        )
        .bind(transaction_id)
        .bind(cmd.initiator_user_id)
        .bind(cmd.from_account_id)
        .bind(cmd.to_account_id)
        .bind(cmd.amount)
        .bind(cmd.key())
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Rejection path: terminal REJECTED state plus the stored response.
    pub async fn mark_rejected(
        conn: &mut PgConnection,
        transaction_id: Uuid,
        reason: RejectReason,
        payload: &ResponsePayload,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE transactions
               SET status = 'REJECTED', failure_reason = $2, response_payload = $3
               WHERE transaction_id = $1"#,
        )
        .bind(transaction_id)
        .bind(reason.as_str())
        .bind(Json(payload))
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Success path: terminal SUCCEEDED state plus the stored response.
    pub async fn mark_succeeded(
        conn: &mut PgConnection,
        transaction_id: Uuid,
        payload: &ResponsePayload,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE transactions
               SET status = 'SUCCEEDED', response_payload = $2
               WHERE transaction_id = $1"#,
        )
        .bind(transaction_id)
        .bind(Json(payload))
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Compensating write: establish the FAILED terminal state after the
    /// original transaction rolled back.
    ///
    /// Runs on a fresh connection/transaction owned by the caller. If the row
    /// vanished with the rollback it is re-inserted; if it survived as
    /// PENDING it is updated. Returns whether FAILED state was newly
    /// established (false if the row already reached some other terminal
    /// state, in which case nothing is touched).
    pub async fn record_failure(
        conn: &mut PgConnection,
        transaction_id: Uuid,
        cmd: &TransferCommand,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM transactions WHERE transaction_id = $1 FOR UPDATE")
                .bind(transaction_id)
                .fetch_optional(&mut *conn)
                .await?;

        match status.as_deref() {
            None => {
                sqlx::query(
                    r#"INSERT INTO transactions
                           (transaction_id, status, type, initiator_user_id,
                            from_account_id, to_account_id, amount, idempotency_key,
                            failure_reason)
                       VALUES ($1, 'FAILED', 'TRANSFER', $2, $3, $4, $5, $6, $7)"#,
                )
                .bind(transaction_id)
                .bind(cmd.initiator_user_id)
                .bind(cmd.from_account_id)
                .bind(cmd.to_account_id)
                .bind(cmd.amount)
                .bind(cmd.key())
                .bind(reason)
                .execute(&mut *conn)
                .await?;
                Ok(true)
            }
            Some("PENDING") => {
                sqlx::query(
                    r#"UPDATE transactions
                       SET status = 'FAILED', failure_reason = $2
                       WHERE transaction_id = $1"#,
                )
                .bind(transaction_id)
                .bind(reason)
                .execute(&mut *conn)
                .await?;
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }
}
