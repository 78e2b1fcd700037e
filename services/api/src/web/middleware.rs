//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`]. Handlers take it via `Extension<CallerId>`.
#[derive(Debug, Clone, Copy)]
pub struct CallerId(pub Uuid);

/// Middleware that validates the `Authorization: Bearer` token and
/// attaches the caller's user id.
///
/// Handlers behind this middleware never see a request without a valid
/// identity; they only check row ownership.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let user_id = state
        .db
        .validate_auth_session(token)
        .await
        .map_err(|e| {
            debug!("auth session rejected: {e}");
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(CallerId(user_id));
    Ok(next.run(req).await)
}
