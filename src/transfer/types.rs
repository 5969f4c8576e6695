//! Transfer core types

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::TransferError;

/// Validated transfer input.
///
/// `initiator_user_id` comes from the authenticated session and
/// `idempotency_key` from the client-supplied header; both are parsed and
/// typed before the core is invoked.
#[derive(Debug, Clone, Copy)]
pub struct TransferCommand {
    pub initiator_user_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    /// Integer minor units, always > 0
    pub amount: i64,
    pub idempotency_key: Option<Uuid>,
}

impl TransferCommand {
    /// Cheap input checks, run before any database round-trip.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.amount <= 0 {
            return Err(TransferError::InvalidAmount);
        }
        if self.from_account_id == self.to_account_id {
            return Err(TransferError::SameAccount);
        }
        match self.idempotency_key {
            Some(key) if !key.is_nil() => Ok(()),
            _ => Err(TransferError::MissingIdempotencyKey),
        }
    }

    /// The key, after `validate` has passed.
    pub(crate) fn key(&self) -> Uuid {
        self.idempotency_key.expect("validated command has a key")
    }
}

/// Domain transaction status, stored as TEXT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Succeeded,
    Rejected,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Succeeded => "SUCCEEDED",
            TxStatus::Rejected => "REJECTED",
            TxStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for TxStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PENDING" => Ok(TxStatus::Pending),
            "SUCCEEDED" => Ok(TxStatus::Succeeded),
            "REJECTED" => Ok(TxStatus::Rejected),
            "FAILED" => Ok(TxStatus::Failed),
            other => Err(format!("unknown transaction status: {}", other)),
        }
    }
}

/// Why a transfer was not executed.
///
/// Eligibility reasons are checked in this declaration order; the first match
/// wins. `InFlight` and `PreviousAttemptFailed` are replay conditions, not
/// committed rejection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    FromAccountNotFound,
    FromAccountNotActive,
    ToAccountNotFound,
    ToAccountNotActive,
    InsufficientFunds,
    InFlight,
    PreviousAttemptFailed,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::FromAccountNotFound => "FROM_ACCOUNT_NOT_FOUND",
            RejectReason::FromAccountNotActive => "FROM_ACCOUNT_NOT_ACTIVE",
            RejectReason::ToAccountNotFound => "TO_ACCOUNT_NOT_FOUND",
            RejectReason::ToAccountNotActive => "TO_ACCOUNT_NOT_ACTIVE",
            RejectReason::InsufficientFunds => "INSUFFICIENT_FUNDS",
            RejectReason::InFlight => "IN_FLIGHT",
            RejectReason::PreviousAttemptFailed => "PREVIOUS_ATTEMPT_FAILED",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The stored response object.
///
/// This struct is the versioned payload schema: field order is fixed by the
/// declaration, serialization goes through serde with no map reordering, so
/// replaying a stored payload re-serializes to the original bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub success: bool,
    pub transaction_id: Uuid,
    pub status: TxStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ResponsePayload {
    pub fn succeeded(transaction_id: Uuid, from: Uuid, to: Uuid, amount: i64) -> Self {
        Self {
            success: true,
            transaction_id,
            status: TxStatus::Succeeded,
            from_account_id: Some(from),
            to_account_id: Some(to),
            amount: Some(amount),
            reason: None,
        }
    }

    pub fn rejected(transaction_id: Uuid, reason: RejectReason) -> Self {
        Self {
            success: false,
            transaction_id,
            status: TxStatus::Rejected,
            from_account_id: None,
            to_account_id: None,
            amount: None,
            reason: Some(reason.as_str().to_string()),
        }
    }

    /// Replay response for a key whose attempt is still in flight. Not stored.
    pub fn in_flight(transaction_id: Uuid) -> Self {
        Self {
            success: false,
            transaction_id,
            status: TxStatus::Pending,
            from_account_id: None,
            to_account_id: None,
            amount: None,
            reason: Some(RejectReason::InFlight.as_str().to_string()),
        }
    }

    /// Replay response for a key whose attempt ended FAILED. Not stored; the
    /// caller may retry with a fresh key.
    pub fn previous_attempt_failed(transaction_id: Uuid) -> Self {
        Self {
            success: false,
            transaction_id,
            status: TxStatus::Failed,
            from_account_id: None,
            to_account_id: None,
            amount: None,
            reason: Some(RejectReason::PreviousAttemptFailed.as_str().to_string()),
        }
    }
}

/// Terminal domain outcome of one execution. System failures are not a
/// variant here; they surface as [`TransferError::System`] after the
/// compensating write has run.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    Succeeded(ResponsePayload),
    Rejected(ResponsePayload),
}

impl TransferOutcome {
    pub fn payload(&self) -> &ResponsePayload {
        match self {
            TransferOutcome::Succeeded(p) | TransferOutcome::Rejected(p) => p,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, TransferOutcome::Succeeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> TransferCommand {
        TransferCommand {
            initiator_user_id: Uuid::new_v4(),
            from_account_id: Uuid::new_v4(),
            to_account_id: Uuid::new_v4(),
            amount: 3000,
            idempotency_key: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_command() {
        assert!(command().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let mut cmd = command();
        cmd.amount = 0;
        assert!(matches!(cmd.validate(), Err(TransferError::InvalidAmount)));
        cmd.amount = -5;
        assert!(matches!(cmd.validate(), Err(TransferError::InvalidAmount)));
    }

    #[test]
    fn test_validate_rejects_same_account() {
        let mut cmd = command();
        cmd.to_account_id = cmd.from_account_id;
        assert!(matches!(cmd.validate(), Err(TransferError::SameAccount)));
    }

    #[test]
    fn test_validate_rejects_missing_or_nil_key() {
        let mut cmd = command();
        cmd.idempotency_key = None;
        assert!(matches!(
            cmd.validate(),
            Err(TransferError::MissingIdempotencyKey)
        ));
        cmd.idempotency_key = Some(Uuid::nil());
        assert!(matches!(
            cmd.validate(),
            Err(TransferError::MissingIdempotencyKey)
        ));
    }

    #[test]
    fn test_status_roundtrip() {
        for s in ["PENDING", "SUCCEEDED", "REJECTED", "FAILED"] {
            assert_eq!(TxStatus::try_from(s.to_string()).unwrap().as_str(), s);
        }
        assert!(TxStatus::try_from("DONE".to_string()).is_err());
    }

    #[test]
    fn test_success_payload_serialization_shape() {
        let tx = Uuid::nil();
        let payload = ResponsePayload::succeeded(tx, tx, tx, 3000);
        let json = serde_json::to_string(&payload).unwrap();
        let nil = "00000000-0000-0000-0000-000000000000";
        assert_eq!(
            json,
            format!(
                r#"{{"success":true,"transactionId":"{nil}","status":"SUCCEEDED","fromAccountId":"{nil}","toAccountId":"{nil}","amount":3000}}"#
            )
        );
    }

    #[test]
    fn test_rejected_payload_serialization_shape() {
        let tx = Uuid::nil();
        let payload = ResponsePayload::rejected(tx, RejectReason::InsufficientFunds);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"success":false,"transactionId":"00000000-0000-0000-0000-000000000000","status":"REJECTED","reason":"INSUFFICIENT_FUNDS"}"#
        );
    }

    #[test]
    fn test_payload_reserialization_is_byte_stable() {
        let payload = ResponsePayload::succeeded(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 42);
        let first = serde_json::to_string(&payload).unwrap();
        let reparsed: ResponsePayload = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&reparsed).unwrap();
        assert_eq!(first, second);
    }
}
