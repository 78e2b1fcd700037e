//! services/api/src/web/profiles.rs
//!
//! Family-member profile endpoints. Every other health resource hangs off
//! one of these rows.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CallerId;
use crate::web::state::AppState;
use household_core::domain::Profile;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub display_name: String,
    pub relation_to_user: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub status: u16,
    pub profile: Profile,
}

#[derive(Serialize)]
pub struct ProfilesResponse {
    pub status: u16,
    pub profiles: Vec<Profile>,
}

pub async fn create_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.display_name.trim().is_empty() {
        return Err(ApiError::bad_request("displayName is required."));
    }

    let profile = state
        .db
        .create_profile(Profile {
            id: Uuid::new_v4(),
            user_id,
            display_name: req.display_name,
            relation_to_user: req.relation_to_user,
            date_of_birth: req.date_of_birth,
            gender: req.gender,
            blood_group: req.blood_group,
            allergies: req.allergies,
            chronic_conditions: req.chronic_conditions,
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            status: 201,
            profile,
        }),
    ))
}

pub async fn list_profiles_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let profiles = state.db.list_profiles(user_id).await?;
    Ok(Json(ProfilesResponse {
        status: 200,
        profiles,
    }))
}
