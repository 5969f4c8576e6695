use thiserror::Error;

/// Transfer execution errors.
///
/// Input faults are returned before any database round-trip and never create
/// a transaction row. `System` means the original database transaction was
/// rolled back and the compensating FAILED write has been attempted; callers
/// treat it as a 5xx.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Source and destination accounts are the same")]
    SameAccount,

    #[error("Missing idempotency key")]
    MissingIdempotencyKey,

    #[error("TRANSFER_SYSTEM_FAILURE: {reason}")]
    System { reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TransferError {
    pub fn system(reason: impl Into<String>) -> Self {
        TransferError::System {
            reason: reason.into(),
        }
    }

    /// True for faults the caller maps to a 400 (request never admitted).
    pub fn is_input_fault(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidAmount
                | TransferError::SameAccount
                | TransferError::MissingIdempotencyKey
        )
    }

    /// Stable machine-readable code for the gateway response.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::SameAccount => "SAME_ACCOUNT",
            TransferError::MissingIdempotencyKey => "MISSING_IDEMPOTENCY_KEY",
            TransferError::System { .. } => "TRANSFER_SYSTEM_FAILURE",
            TransferError::Database(_) => "DATABASE_FAILURE",
        }
    }
}
