//! Schema bootstrap
//!
//! Applies the ledger schema at startup. Every statement is idempotent
//! (`IF NOT EXISTS`) so restarts are safe. The CHECK constraints and the
//! unique partial index are load-bearing: the balance non-negativity CHECK
//! and the per-type shape CHECK back up the executor defensively, and the
//! partial index on (initiator_user_id, idempotency_key, type) is the sole
//! admission gate against duplicate transfer attempts.

use sqlx::PgPool;

const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        account_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        user_id UUID NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'ACTIVE'
            CHECK (status IN ('ACTIVE', 'FROZEN', 'TERMINATED')),
        current_balance BIGINT NOT NULL DEFAULT 0 CHECK (current_balance >= 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        frozen_at TIMESTAMPTZ,
        terminated_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS transactions (
        transaction_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        status TEXT NOT NULL DEFAULT 'PENDING'
            CHECK (status IN ('PENDING', 'SUCCEEDED', 'REJECTED', 'FAILED')),
        type TEXT NOT NULL CHECK (type IN ('TRANSFER', 'DEPOSIT', 'WITHDRAWAL')),
        initiator_user_id UUID NOT NULL REFERENCES users(user_id),
        from_account_id UUID REFERENCES accounts(account_id),
        to_account_id UUID REFERENCES accounts(account_id),
        amount BIGINT NOT NULL CHECK (amount > 0),
        idempotency_key UUID,
        response_payload JSONB,
        failure_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT transactions_shape CHECK (
            (type = 'TRANSFER'
                AND from_account_id IS NOT NULL
                AND to_account_id IS NOT NULL)
            OR (type = 'DEPOSIT'
                AND from_account_id IS NULL
                AND to_account_id IS NOT NULL)
            OR (type = 'WITHDRAWAL'
                AND from_account_id IS NOT NULL
                AND to_account_id IS NULL)
        )
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS transactions_idempotency_key
        ON transactions (initiator_user_id, idempotency_key, type)
        WHERE type = 'TRANSFER' AND idempotency_key IS NOT NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        ledger_entry_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        amount BIGINT NOT NULL CHECK (amount <> 0),
        account_id UUID NOT NULL REFERENCES accounts(account_id),
        transaction_id UUID NOT NULL REFERENCES transactions(transaction_id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS ledger_entries_account
        ON ledger_entries (account_id, created_at)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audit_logs (
        audit_log_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        actor_type TEXT NOT NULL CHECK (actor_type IN ('USER', 'SERVICE', 'SYSTEM')),
        actor_id TEXT NOT NULL,
        action TEXT NOT NULL,
        target_type TEXT NOT NULL
            CHECK (target_type IN ('ACCOUNT', 'TRANSACTION', 'SESSION', 'USER')),
        target_id TEXT,
        outcome TEXT NOT NULL
            CHECK (outcome IN ('ATTEMPTED', 'SUCCEEDED', 'REJECTED', 'FAILED')),
        reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS audit_logs_created
        ON audit_logs (created_at)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS audit_logs_actor
        ON audit_logs (actor_type, actor_id, created_at)
    "#,
];

/// Apply the schema, statement by statement.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!("Schema initialized ({} statements)", DDL.len());
    Ok(())
}
