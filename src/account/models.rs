//! Data models for accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// Account status, stored as TEXT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Frozen,
    Terminated,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for AccountStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ACTIVE" => Ok(AccountStatus::Active),
            "FROZEN" => Ok(AccountStatus::Frozen),
            "TERMINATED" => Ok(AccountStatus::Terminated),
            other => Err(format!("unknown account status: {}", other)),
        }
    }
}

/// A user-owned container of value. `current_balance` is integer minor units
/// and is a denormalized cache of the account's ledger entry sum.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    pub current_balance: i64,
    pub created_at: DateTime<Utc>,
    pub frozen_at: Option<DateTime<Utc>>,
    pub terminated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for s in ["ACTIVE", "FROZEN", "TERMINATED"] {
            let status = AccountStatus::try_from(s.to_string()).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(AccountStatus::try_from("CLOSED".to_string()).is_err());
    }
}
