use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    /// Error response that still carries a body (rejected transfers return
    /// their stored payload alongside the error code)
    pub fn error_with_data(code: i32, msg: impl Into<String>, data: T) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: Some(data),
        }
    }
}

/// Error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const TRANSFER_REJECTED: i32 = 1002;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5001;
    pub const SERVICE_UNAVAILABLE: i32 = 5002;
}

/// Transfer request body. `amount` is a decimal string ("30.00"); it is
/// scaled to integer minor units before the core runs.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferApiRequest {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    #[schema(example = "30.00")]
    pub amount: String,
}

/// Account view returned by the gateway
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountView {
    pub account_id: Uuid,
    pub status: String,
    /// Balance in minor units
    pub balance_units: i64,
    /// Human-readable balance ("30.00")
    pub balance: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success_shape() {
        let resp = ApiResponse::success(42);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"code":0,"msg":"ok","data":42}"#);
    }

    #[test]
    fn test_api_response_error_omits_data() {
        let resp = ApiResponse::<()>::error(error_codes::INVALID_PARAMETER, "bad input");
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"code":1001,"msg":"bad input"}"#);
    }

    #[test]
    fn test_transfer_request_deserializes() {
        let json = r#"{"from_account_id":"00000000-0000-0000-0000-000000000001",
                       "to_account_id":"00000000-0000-0000-0000-000000000002",
                       "amount":"30.00"}"#;
        let req: TransferApiRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.amount, "30.00");
        assert_ne!(req.from_account_id, req.to_account_id);
    }
}
