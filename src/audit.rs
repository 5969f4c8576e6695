//! Append-only audit trail
//!
//! Audit rows are written inside the caller's database transaction so they
//! commit or vanish together with the state they describe. Rows are never
//! updated or deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use std::fmt;
use uuid::Uuid;

/// Actor identity used for SYSTEM-outcome rows written by the transfer core.
pub const TRANSFER_SERVICE_ACTOR: &str = "TRANSFER_SERVICE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorType {
    User,
    Service,
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "USER",
            ActorType::Service => "SERVICE",
            ActorType::System => "SYSTEM",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Account,
    Transaction,
    Session,
    User,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Account => "ACCOUNT",
            TargetType::Transaction => "TRANSACTION",
            TargetType::Session => "SESSION",
            TargetType::User => "USER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Attempted,
    Succeeded,
    Rejected,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Attempted => "ATTEMPTED",
            AuditOutcome::Succeeded => "SUCCEEDED",
            AuditOutcome::Rejected => "REJECTED",
            AuditOutcome::Failed => "FAILED",
        }
    }
}

/// One observed action
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLog {
    pub audit_log_id: Uuid,
    pub actor_type: String,
    pub actor_id: String,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub outcome: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct AuditRecorder;

impl AuditRecorder {
    /// Append one audit row on the caller's connection.
    ///
    /// Takes `&mut PgConnection` so the write joins whatever transaction the
    /// caller holds.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        conn: &mut PgConnection,
        actor_type: ActorType,
        actor_id: &str,
        action: &str,
        target_type: TargetType,
        target_id: Option<&str>,
        outcome: AuditOutcome,
        reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO audit_logs
                   (actor_type, actor_id, action, target_type, target_id, outcome, reason)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(actor_type.as_str())
        .bind(actor_id)
        .bind(action)
        .bind(target_type.as_str())
        .bind(target_id)
        .bind(outcome.as_str())
        .bind(reason)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Recent rows for one actor, newest first
    pub async fn recent_for_actor(
        pool: &PgPool,
        actor_type: ActorType,
        actor_id: &str,
        limit: i64,
    ) -> Result<Vec<AuditLog>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT audit_log_id, actor_type, actor_id, action, target_type,
                      target_id, outcome, reason, created_at
               FROM audit_logs
               WHERE actor_type = $1 AND actor_id = $2
               ORDER BY created_at DESC
               LIMIT $3"#,
        )
        .bind(actor_type.as_str())
        .bind(actor_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_literals_match_schema() {
        assert_eq!(ActorType::System.as_str(), "SYSTEM");
        assert_eq!(TargetType::Transaction.as_str(), "TRANSACTION");
        assert_eq!(AuditOutcome::Attempted.as_str(), "ATTEMPTED");
        assert_eq!(AuditOutcome::Failed.as_str(), "FAILED");
    }
}
