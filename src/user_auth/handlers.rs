use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::audit::{ActorType, AuditOutcome, AuditRecorder, TargetType};
use crate::gateway::{
    state::AppState,
    types::{error_codes, ApiResponse},
};

use super::service::{AuthError, AuthResponse, LoginRequest, RegisterRequest};

/// Register a new user
///
/// POST /api/v1/auth/register
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Username taken or invalid input")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    if req.username.trim().is_empty() || req.password.len() < 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "Username must be non-empty and password at least 8 characters",
            )),
        )
            .into_response();
    }

    match state.user_auth.register(req).await {
        Ok(user_id) => {
            let mut conn = match state.db.pool().acquire().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("Failed to acquire connection for audit: {}", e);
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
            if let Err(e) = AuditRecorder::record(
                &mut conn,
                ActorType::User,
                &user_id.to_string(),
                "REGISTER",
                TargetType::User,
                Some(&user_id.to_string()),
                AuditOutcome::Succeeded,
                None,
            )
            .await
            {
                tracing::error!(%user_id, "Failed to audit registration: {}", e);
            }

            (
                StatusCode::CREATED,
                Json(ApiResponse::success(serde_json::json!({
                    "userId": user_id
                }))),
            )
                .into_response()
        }
        Err(AuthError::UsernameTaken) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(
                error_codes::INVALID_PARAMETER,
                "Username already taken",
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Registration failed: {}", e);
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

/// Login and receive a JWT
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    match state.user_auth.login(req).await {
        Ok(resp) => {
            if let Ok(mut conn) = state.db.pool().acquire().await {
                if let Err(e) = AuditRecorder::record(
                    &mut conn,
                    ActorType::User,
                    &resp.user_id.to_string(),
                    "LOGIN",
                    TargetType::Session,
                    None,
                    AuditOutcome::Succeeded,
                    None,
                )
                .await
                {
                    tracing::error!(user_id = %resp.user_id, "Failed to audit login: {}", e);
                }
            }
            (StatusCode::OK, Json(ApiResponse::success(resp))).into_response()
        }
        Err(AuthError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::<()>::error(
                error_codes::AUTH_FAILED,
                "Invalid username or password",
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Login failed: {}", e);
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
