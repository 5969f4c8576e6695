//! Transfer executor
//!
//! One database transaction per request. The flow is strictly sequential:
//! idempotency lookup, PENDING admission, ATTEMPTED audit, eligibility,
//! conditional debit, conditional credit, ledger pair, terminal writes.
//! Rejections commit (the REJECTED row and its audit trail are the desired
//! outcome); system faults roll back, then a second transaction records the
//! FAILED state so the audit trail matches reality.
//!
//! Balance mutation happens only through the conditional UPDATEs below.
//! The debit predicate (`status = 'ACTIVE' AND current_balance >= amount`)
//! is the funds check; a SELECT-then-UPDATE would race against concurrent
//! transfers on the same account.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::account::Account;
use crate::audit::{
    ActorType, AuditOutcome, AuditRecorder, TargetType, TRANSFER_SERVICE_ACTOR,
};

use super::error::TransferError;
use super::store::{TransactionRecord, TransactionStore};
use super::types::{RejectReason, ResponsePayload, TransferCommand, TransferOutcome, TxStatus};

const ACTION_TRANSFER: &str = "TRANSFER";
const CREDIT_FAILED_ROLLBACK: &str = "CREDIT_FAILED_ROLLBACK";

/// Instrumentation seam between executor steps.
///
/// Production wiring installs no hooks; tests use this to open the window
/// between debit and credit where a concurrent status change makes the
/// credit's conditional UPDATE touch zero rows.
#[async_trait]
pub trait StepHooks: Send + Sync {
    async fn before_credit(&self) {}
}

/// Internal step outcome. `DuplicateKey` is the admission gate firing for a
/// concurrent duplicate; everything else fatal is a `System` fault that
/// obligates the compensating write.
enum StepFault {
    DuplicateKey,
    System(String),
}

impl StepFault {
    fn db(e: sqlx::Error) -> Self {
        StepFault::System(format!("DATABASE_FAILURE: {}", e))
    }
}

pub struct TransferExecutor {
    pool: PgPool,
    hooks: Option<Arc<dyn StepHooks>>,
}

impl TransferExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, hooks: None }
    }

    pub fn with_hooks(pool: PgPool, hooks: Arc<dyn StepHooks>) -> Self {
        Self {
            pool,
            hooks: Some(hooks),
        }
    }

    /// Execute one transfer to a terminal outcome.
    ///
    /// Succeeded and Rejected come back as values; a `TransferError::System`
    /// means the original transaction rolled back and the FAILED record was
    /// written in a separate transaction.
    pub async fn execute(&self, cmd: TransferCommand) -> Result<TransferOutcome, TransferError> {
        cmd.validate()?;

        let mut dbtx = self.pool.begin().await?;

        // Idempotency resolution: replay a prior attempt before any side effect
        if let Some(prior) = TransactionStore::find_by_idempotency_key(
            &mut *dbtx,
            cmd.initiator_user_id,
            cmd.key(),
        )
        .await?
        {
            dbtx.commit().await?;
            return Self::replay(prior);
        }

        let transaction_id = Uuid::new_v4();

        match self.run_admitted(&mut dbtx, transaction_id, &cmd).await {
            Ok(outcome) => {
                if let Err(e) = dbtx.commit().await {
                    let reason = format!("COMMIT_FAILED: {}", e);
                    tracing::error!(%transaction_id, "Transfer commit failed: {}", e);
                    self.write_failure_record(transaction_id, &cmd, &reason).await;
                    return Err(TransferError::System { reason });
                }
                if outcome.is_succeeded() {
                    tracing::info!(
                        %transaction_id,
                        from = %cmd.from_account_id,
                        to = %cmd.to_account_id,
                        amount = cmd.amount,
                        "Transfer succeeded"
                    );
                }
                Ok(outcome)
            }
            Err(StepFault::DuplicateKey) => {
                // A concurrent duplicate won admission since our lookup.
                // Bounded retry = 1: drop our transaction and replay theirs.
                drop(dbtx);
                self.replay_after_race(&cmd).await
            }
            Err(StepFault::System(reason)) => {
                if let Err(e) = dbtx.rollback().await {
                    tracing::error!(%transaction_id, "Rollback failed: {}", e);
                }
                tracing::error!(%transaction_id, reason = %reason, "Transfer system failure");
                self.write_failure_record(transaction_id, &cmd, &reason).await;
                Err(TransferError::System { reason })
            }
        }
    }

    /// Admission through terminal write, inside the caller's transaction.
    async fn run_admitted(
        &self,
        dbtx: &mut Transaction<'_, Postgres>,
        transaction_id: Uuid,
        cmd: &TransferCommand,
    ) -> Result<TransferOutcome, StepFault> {
        // Admission: the unique partial index is the gate
        match TransactionStore::insert_pending(&mut *dbtx, transaction_id, cmd).await {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => return Err(StepFault::DuplicateKey),
            Err(e) => return Err(StepFault::db(e)),
        }

        AuditRecorder::record(
            &mut *dbtx,
            ActorType::User,
            &cmd.initiator_user_id.to_string(),
            ACTION_TRANSFER,
            TargetType::Transaction,
            Some(&transaction_id.to_string()),
            AuditOutcome::Attempted,
            None,
        )
        .await
        .map_err(StepFault::db)?;

        // Eligibility, fixed priority order
        let from = load_account(&mut *dbtx, cmd.from_account_id)
            .await
            .map_err(StepFault::db)?;
        let to = load_account(&mut *dbtx, cmd.to_account_id)
            .await
            .map_err(StepFault::db)?;
        if let Some(reason) = eligibility_reason(from.as_ref(), to.as_ref()) {
            return self.reject(dbtx, transaction_id, cmd, reason).await;
        }

        // Debit. The predicate is the authoritative funds check.
        let debited = sqlx::query(
            r#"UPDATE accounts
               SET current_balance = current_balance - $1
               WHERE account_id = $2
                 AND status = 'ACTIVE'
                 AND current_balance >= $1"#,
        )
        .bind(cmd.amount)
        .bind(cmd.from_account_id)
        .execute(&mut **dbtx)
        .await
        .map_err(StepFault::db)?
        .rows_affected();

        if debited == 0 {
            return self
                .reject(dbtx, transaction_id, cmd, RejectReason::InsufficientFunds)
                .await;
        }

        if let Some(hooks) = &self.hooks {
            hooks.before_credit().await;
        }

        // Credit. Zero rows here is a fault, not a rejection: the account was
        // ACTIVE at the eligibility read and a concurrent change won the race.
        let credited = sqlx::query(
            r#"UPDATE accounts
               SET current_balance = current_balance + $1
               WHERE account_id = $2
                 AND status = 'ACTIVE'"#,
        )
        .bind(cmd.amount)
        .bind(cmd.to_account_id)
        .execute(&mut **dbtx)
        .await
        .map_err(StepFault::db)?
        .rows_affected();

        if credited == 0 {
            return Err(StepFault::System(CREDIT_FAILED_ROLLBACK.to_string()));
        }

        // Ledger pair, atomic with the balance updates
        sqlx::query(
            r#"INSERT INTO ledger_entries (account_id, transaction_id, amount)
               VALUES ($1, $2, $3), ($4, $5, $6)"#,
        )
        .bind(cmd.from_account_id)
        .bind(transaction_id)
        .bind(-cmd.amount)
        .bind(cmd.to_account_id)
        .bind(transaction_id)
        .bind(cmd.amount)
        .execute(&mut **dbtx)
        .await
        .map_err(StepFault::db)?;

        let payload = ResponsePayload::succeeded(
            transaction_id,
            cmd.from_account_id,
            cmd.to_account_id,
            cmd.amount,
        );

        TransactionStore::mark_succeeded(&mut *dbtx, transaction_id, &payload)
            .await
            .map_err(StepFault::db)?;

        AuditRecorder::record(
            &mut *dbtx,
            ActorType::User,
            &cmd.initiator_user_id.to_string(),
            ACTION_TRANSFER,
            TargetType::Transaction,
            Some(&transaction_id.to_string()),
            AuditOutcome::Succeeded,
            None,
        )
        .await
        .map_err(StepFault::db)?;

        Ok(TransferOutcome::Succeeded(payload))
    }

    /// Rejection path: terminal REJECTED state, stored payload, audit row.
    /// The caller commits; rejections are a desired committed outcome.
    async fn reject(
        &self,
        dbtx: &mut Transaction<'_, Postgres>,
        transaction_id: Uuid,
        cmd: &TransferCommand,
        reason: RejectReason,
    ) -> Result<TransferOutcome, StepFault> {
        let payload = ResponsePayload::rejected(transaction_id, reason);

        TransactionStore::mark_rejected(&mut *dbtx, transaction_id, reason, &payload)
            .await
            .map_err(StepFault::db)?;

        AuditRecorder::record(
            &mut *dbtx,
            ActorType::User,
            &cmd.initiator_user_id.to_string(),
            ACTION_TRANSFER,
            TargetType::Transaction,
            Some(&transaction_id.to_string()),
            AuditOutcome::Rejected,
            Some(reason.as_str()),
        )
        .await
        .map_err(StepFault::db)?;

        tracing::info!(%transaction_id, reason = reason.as_str(), "Transfer rejected");

        Ok(TransferOutcome::Rejected(payload))
    }

    /// Map a prior attempt to a replay response. Stored payloads are returned
    /// verbatim; PENDING and FAILED rows produce transient responses that are
    /// never stored.
    fn replay(prior: TransactionRecord) -> Result<TransferOutcome, TransferError> {
        match prior.status {
            TxStatus::Succeeded => {
                let payload = stored_payload(prior)?;
                Ok(TransferOutcome::Succeeded(payload))
            }
            TxStatus::Rejected => {
                let payload = stored_payload(prior)?;
                Ok(TransferOutcome::Rejected(payload))
            }
            TxStatus::Pending => Ok(TransferOutcome::Rejected(ResponsePayload::in_flight(
                prior.transaction_id,
            ))),
            TxStatus::Failed => Ok(TransferOutcome::Rejected(
                ResponsePayload::previous_attempt_failed(prior.transaction_id),
            )),
        }
    }

    /// After losing the admission race, the winner's row must be visible.
    async fn replay_after_race(
        &self,
        cmd: &TransferCommand,
    ) -> Result<TransferOutcome, TransferError> {
        let prior = TransactionStore::find_by_idempotency_key(
            &self.pool,
            cmd.initiator_user_id,
            cmd.key(),
        )
        .await?
        .ok_or_else(|| TransferError::system("IDEMPOTENCY_RACE_ROW_MISSING"))?;

        Self::replay(prior)
    }

    /// Compensating write (§ failure discipline): a fresh transaction that
    /// establishes the FAILED transaction row and the SYSTEM audit row after
    /// the original transaction rolled back.
    async fn write_failure_record(
        &self,
        transaction_id: Uuid,
        cmd: &TransferCommand,
        reason: &str,
    ) {
        let result: Result<(), sqlx::Error> = async {
            let mut dbtx = self.pool.begin().await?;

            let wrote =
                TransactionStore::record_failure(&mut *dbtx, transaction_id, cmd, reason).await?;

            if wrote {
                AuditRecorder::record(
                    &mut *dbtx,
                    ActorType::System,
                    TRANSFER_SERVICE_ACTOR,
                    ACTION_TRANSFER,
                    TargetType::Transaction,
                    Some(&transaction_id.to_string()),
                    AuditOutcome::Failed,
                    Some(reason),
                )
                .await?;
            }

            dbtx.commit().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            // The caller already gets the system fault; a reconciler can
            // sweep the orphan later.
            tracing::error!(
                %transaction_id,
                reason,
                "Compensating FAILED write did not commit: {}",
                e
            );
        }
    }
}

async fn load_account(
    conn: &mut PgConnection,
    account_id: Uuid,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT account_id, user_id, status, current_balance, created_at, frozen_at, terminated_at
           FROM accounts WHERE account_id = $1"#,
    )
    .bind(account_id)
    .fetch_optional(conn)
    .await
}

/// First matching reason wins: from-not-found, from-not-active,
/// to-not-found, to-not-active.
fn eligibility_reason(from: Option<&Account>, to: Option<&Account>) -> Option<RejectReason> {
    match from {
        None => return Some(RejectReason::FromAccountNotFound),
        Some(a) if !a.is_active() => return Some(RejectReason::FromAccountNotActive),
        Some(_) => {}
    }
    match to {
        None => Some(RejectReason::ToAccountNotFound),
        Some(a) if !a.is_active() => Some(RejectReason::ToAccountNotActive),
        Some(_) => None,
    }
}

/// Terminal rows on the replay path must carry their stored response; a
/// terminal row without one is corrupt state, not a replayable attempt.
fn stored_payload(prior: TransactionRecord) -> Result<ResponsePayload, TransferError> {
    prior
        .response_payload
        .ok_or_else(|| TransferError::system("REPLAY_PAYLOAD_MISSING"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStatus;
    use chrono::Utc;

    fn account(status: AccountStatus) -> Account {
        Account {
            account_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status,
            current_balance: 10_000,
            created_at: Utc::now(),
            frozen_at: None,
            terminated_at: None,
        }
    }

    #[test]
    fn test_eligibility_priority_order() {
        let active = account(AccountStatus::Active);
        let frozen = account(AccountStatus::Frozen);
        let terminated = account(AccountStatus::Terminated);

        // From-side findings outrank to-side findings
        assert_eq!(
            eligibility_reason(None, None),
            Some(RejectReason::FromAccountNotFound)
        );
        assert_eq!(
            eligibility_reason(Some(&frozen), None),
            Some(RejectReason::FromAccountNotActive)
        );
        assert_eq!(
            eligibility_reason(Some(&active), None),
            Some(RejectReason::ToAccountNotFound)
        );
        assert_eq!(
            eligibility_reason(Some(&active), Some(&frozen)),
            Some(RejectReason::ToAccountNotActive)
        );
        assert_eq!(
            eligibility_reason(Some(&active), Some(&terminated)),
            Some(RejectReason::ToAccountNotActive)
        );
        assert_eq!(eligibility_reason(Some(&active), Some(&active)), None);
    }

    #[test]
    fn test_frozen_from_beats_missing_to() {
        let frozen = account(AccountStatus::Frozen);
        assert_eq!(
            eligibility_reason(Some(&frozen), None),
            Some(RejectReason::FromAccountNotActive)
        );
    }
}
