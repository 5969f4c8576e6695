//! HTTP handlers
//!
//! Status mapping for transfers: input faults are 400 (never admitted),
//! domain rejections are 422 with the stored payload, system failures are
//! 500 with `TRANSFER_SYSTEM_FAILURE`, and an idempotent replay of a
//! terminal success returns 200 with the original payload bytes.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::account::AccountRepository;
use crate::audit::{ActorType, AuditOutcome, AuditRecorder, TargetType};
use crate::ledger::LedgerRepository;
use crate::money;
use crate::transfer::{ResponsePayload, TransactionStore, TransferCommand, TransferOutcome};
use crate::user_auth::Claims;

use super::state::AppState;
use super::types::{error_codes, AccountView, ApiResponse, TransferApiRequest};

/// Header carrying the client-chosen idempotency key
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Service unavailable")
    ),
    tag = "System"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse { timestamp_ms })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<()>::error(
                    error_codes::SERVICE_UNAVAILABLE,
                    "unavailable",
                )),
            )
                .into_response()
        }
    }
}

/// Execute a transfer between two accounts
///
/// POST /api/v1/transfer
#[utoipa::path(
    post,
    path = "/api/v1/transfer",
    request_body = TransferApiRequest,
    params(
        ("Idempotency-Key" = Uuid, Header, description = "Client-chosen key; repeated submissions replay the original response"),
    ),
    responses(
        (status = 200, description = "Transfer succeeded (or replayed)", body = ResponsePayload),
        (status = 400, description = "Input fault, never admitted"),
        (status = 422, description = "Domain rejection", body = ResponsePayload),
        (status = 500, description = "System failure, FAILED record persisted")
    ),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    Json(req): Json<TransferApiRequest>,
) -> impl IntoResponse {
    let Some(initiator_user_id) = claims.user_id() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid subject in token",
            )),
        )
            .into_response();
    };

    // The key is a UUID header; malformed keys are an edge error, absence is
    // the core's MISSING_IDEMPOTENCY_KEY input fault.
    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => None,
        Some(value) => match value.to_str().ok().and_then(|s| Uuid::parse_str(s).ok()) {
            Some(key) => Some(key),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::<()>::error(
                        error_codes::INVALID_PARAMETER,
                        "Malformed Idempotency-Key header: expected UUID",
                    )),
                )
                    .into_response();
            }
        },
    };

    let amount = match money::parse_units(&req.amount, state.amount_decimals) {
        Ok(amount) => amount,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::<()>::error(
                    error_codes::INVALID_PARAMETER,
                    format!("Invalid amount: {}", e),
                )),
            )
                .into_response();
        }
    };

    let cmd = TransferCommand {
        initiator_user_id,
        from_account_id: req.from_account_id,
        to_account_id: req.to_account_id,
        amount,
        idempotency_key,
    };

    match state.executor.execute(cmd).await {
        Ok(TransferOutcome::Succeeded(payload)) => {
            (StatusCode::OK, Json(ApiResponse::success(payload))).into_response()
        }
        Ok(TransferOutcome::Rejected(payload)) => {
            let reason = payload.reason.clone().unwrap_or_default();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error_with_data(
                    error_codes::TRANSFER_REJECTED,
                    reason,
                    payload,
                )),
            )
                .into_response()
        }
        Err(e) if e.is_input_fault() => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                format!("{}: {}", e.code(), e),
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Transfer failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    e.to_string(),
                )),
            )
                .into_response()
        }
    }
}

/// Fetch one of the caller's transactions
///
/// GET /api/v1/transfer/{transaction_id}
#[utoipa::path(
    get,
    path = "/api/v1/transfer/{transaction_id}",
    responses(
        (status = 200, description = "Transaction found"),
        (status = 404, description = "No such transaction for this user")
    ),
    tag = "Transfer"
)]
pub async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid subject in token",
            )),
        )
            .into_response();
    };

    match TransactionStore::get_for_initiator(state.db.pool(), transaction_id, user_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiResponse::success(record))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::<()>::error(
                error_codes::NOT_FOUND,
                "Transaction not found",
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(%transaction_id, "Transaction lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                )),
            )
                .into_response()
        }
    }
}

/// Open a new account for the authenticated user
///
/// POST /api/v1/accounts
#[utoipa::path(
    post,
    path = "/api/v1/accounts",
    responses(
        (status = 201, description = "Account opened", body = AccountView)
    ),
    tag = "Account"
)]
pub async fn open_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid subject in token",
            )),
        )
            .into_response();
    };

    match AccountRepository::open(state.db.pool(), user_id).await {
        Ok(account) => {
            if let Ok(mut conn) = state.db.pool().acquire().await {
                if let Err(e) = AuditRecorder::record(
                    &mut conn,
                    ActorType::User,
                    &user_id.to_string(),
                    "ACCOUNT_OPEN",
                    TargetType::Account,
                    Some(&account.account_id.to_string()),
                    AuditOutcome::Succeeded,
                    None,
                )
                .await
                {
                    tracing::error!(account_id = %account.account_id, "Failed to audit account open: {}", e);
                }
            }

            let view = AccountView {
                account_id: account.account_id,
                status: account.status.as_str().to_string(),
                balance_units: account.current_balance,
                balance: money::format_units(account.current_balance, state.amount_decimals),
                created_at: account.created_at,
            };
            (StatusCode::CREATED, Json(ApiResponse::success(view))).into_response()
        }
        Err(e) => {
            tracing::error!(%user_id, "Account open failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                )),
            )
                .into_response()
        }
    }
}

/// List the caller's accounts with balances
///
/// GET /api/v1/accounts
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses(
        (status = 200, description = "Accounts", body = [AccountView])
    ),
    tag = "Account"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid subject in token",
            )),
        )
            .into_response();
    };

    match AccountRepository::list_for_user(state.db.pool(), user_id).await {
        Ok(accounts) => {
            let views: Vec<AccountView> = accounts
                .into_iter()
                .map(|a| AccountView {
                    account_id: a.account_id,
                    status: a.status.as_str().to_string(),
                    balance_units: a.current_balance,
                    balance: money::format_units(a.current_balance, state.amount_decimals),
                    created_at: a.created_at,
                })
                .collect();
            (StatusCode::OK, Json(ApiResponse::success(views))).into_response()
        }
        Err(e) => {
            tracing::error!(%user_id, "Account list failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                )),
            )
                .into_response()
        }
    }
}

/// Ledger history for one of the caller's accounts, newest first
///
/// GET /api/v1/accounts/{account_id}/ledger
#[utoipa::path(
    get,
    path = "/api/v1/accounts/{account_id}/ledger",
    responses(
        (status = 200, description = "Ledger entries"),
        (status = 404, description = "No such account for this user")
    ),
    tag = "Account"
)]
pub async fn account_ledger(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(account_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid subject in token",
            )),
        )
            .into_response();
    };

    // Ownership check; a foreign account id reads as not-found
    let account = match AccountRepository::get_by_id(state.db.pool(), account_id).await {
        Ok(Some(account)) if account.user_id == user_id => account,
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error(
                    error_codes::NOT_FOUND,
                    "Account not found",
                )),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(%account_id, "Account lookup failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                )),
            )
                .into_response();
        }
    };

    match LedgerRepository::for_account(state.db.pool(), account.account_id, 100).await {
        Ok(entries) => (StatusCode::OK, Json(ApiResponse::success(entries))).into_response(),
        Err(e) => {
            tracing::error!(%account_id, "Ledger read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                )),
            )
                .into_response()
        }
    }
}

/// Recent audit rows where the caller is the actor, newest first
///
/// GET /api/v1/audit
#[utoipa::path(
    get,
    path = "/api/v1/audit",
    responses(
        (status = 200, description = "Audit rows")
    ),
    tag = "Audit"
)]
pub async fn recent_audit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let Some(user_id) = claims.user_id() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid subject in token",
            )),
        )
            .into_response();
    };

    match AuditRecorder::recent_for_actor(
        state.db.pool(),
        ActorType::User,
        &user_id.to_string(),
        50,
    )
    .await
    {
        Ok(rows) => (StatusCode::OK, Json(ApiResponse::success(rows))).into_response(),
        Err(e) => {
            tracing::error!(%user_id, "Audit read failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::error(
                    error_codes::INTERNAL_ERROR,
                    "Internal error",
                )),
            )
                .into_response()
        }
    }
}
