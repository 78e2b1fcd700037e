//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout. Sessions
//! are opaque bearer tokens stored server-side with an expiry.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;
use household_core::domain::User;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub status: u16,
    pub token: String,
    #[schema(value_type = Object)]
    pub user: User,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required."));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    let user = state
        .db
        .create_user_with_email(req.email.trim(), &password_hash)
        .await?;

    let token = issue_session(&state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            status: 201,
            token,
            user,
        }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(ApiError::Unauthorized);
    }

    let token = issue_session(&state, creds.id).await?;

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            status: 200,
            token,
            user: User {
                id: creds.id,
                email: creds.email,
                created_at: creds.created_at,
            },
        }),
    ))
}

/// POST /auth/logout - Invalidate the presented bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    state.db.delete_auth_session(token).await?;

    Ok(Json(serde_json::json!({
        "status": 200,
        "message": "Logged out."
    })))
}

async fn issue_session(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    let token = Uuid::new_v4().to_string();
    let expires_at = state.clock.now() + Duration::days(state.config.session_ttl_days);
    state
        .db
        .create_auth_session(&token, user_id, expires_at)
        .await?;
    Ok(token)
}
