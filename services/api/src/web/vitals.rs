//! services/api/src/web/vitals.rs
//!
//! Vital-sign endpoints: blood pressure, blood sugar, body weight, and
//! illness episodes. The three measurement kinds share one storage shape
//! and differ only in which value fields they populate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CallerId;
use crate::web::state::AppState;
use household_core::domain::{
    IllnessEntry, IllnessSeverity, IllnessStatus, VitalEntry, VitalKind,
};

#[derive(Serialize)]
pub struct RecordResponse<T: Serialize> {
    pub status: u16,
    pub record: T,
}

#[derive(Serialize)]
pub struct RecordsResponse<T: Serialize> {
    pub status: u16,
    pub records: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    pub profile_id: Option<Uuid>,
}

async fn resolve_profile(
    state: &AppState,
    user_id: Uuid,
    profile_id: Option<Uuid>,
) -> ApiResult<household_core::domain::Profile> {
    state
        .db
        .find_profile(user_id, profile_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found for current user."))
}

fn require_profile_param(query: &ProfileQuery) -> ApiResult<Uuid> {
    query
        .profile_id
        .ok_or_else(|| ApiError::bad_request("profileId query parameter is required."))
}

//=========================================================================================
// Blood pressure
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBloodPressureRequest {
    pub profile_id: Option<Uuid>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn create_blood_pressure_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateBloodPressureRequest>,
) -> ApiResult<impl IntoResponse> {
    let (systolic, diastolic) = match (req.systolic, req.diastolic) {
        (Some(s), Some(d)) => (s, d),
        _ => {
            return Err(ApiError::bad_request(
                "Systolic and diastolic values are required and must be numbers.",
            ))
        }
    };

    let profile = resolve_profile(&state, user_id, req.profile_id).await?;
    let record = state
        .db
        .create_vital(VitalEntry {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            kind: VitalKind::BloodPressure,
            systolic: Some(systolic),
            diastolic: Some(diastolic),
            value: None,
            unit: "mmHg".to_string(),
            context: None,
            recorded_at: req.recorded_at.unwrap_or_else(|| state.clock.now()),
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RecordResponse { status: 201, record })))
}

pub async fn list_blood_pressure_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile_id = require_profile_param(&query)?;
    let profile = resolve_profile(&state, user_id, Some(profile_id)).await?;
    let records = state
        .db
        .list_vitals(profile.id, VitalKind::BloodPressure)
        .await?;
    Ok(Json(RecordsResponse { status: 200, records }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBloodPressureRequest {
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn get_blood_pressure_handler(
    state: State<Arc<AppState>>,
    caller: Extension<CallerId>,
    path: Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    get_vital(state, caller, path, VitalKind::BloodPressure, "Blood pressure record not found.")
        .await
}

pub async fn update_blood_pressure_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateBloodPressureRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut entry = find_vital_of_kind(
        &state,
        user_id,
        entry_id,
        VitalKind::BloodPressure,
        "Blood pressure record not found.",
    )
    .await?;

    if let Some(systolic) = req.systolic {
        entry.systolic = Some(systolic);
    }
    if let Some(diastolic) = req.diastolic {
        entry.diastolic = Some(diastolic);
    }
    if let Some(recorded_at) = req.recorded_at {
        entry.recorded_at = recorded_at;
    }
    if let Some(notes) = req.notes {
        entry.notes = Some(notes);
    }

    let record = state.db.update_vital(entry).await?;
    Ok(Json(RecordResponse { status: 200, record }))
}

//=========================================================================================
// Blood sugar
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBloodSugarRequest {
    pub profile_id: Option<Uuid>,
    pub reading: Option<f64>,
    /// Measurement context, e.g. "fasting" or "after meal".
    pub context: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn create_blood_sugar_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateBloodSugarRequest>,
) -> ApiResult<impl IntoResponse> {
    let reading = req
        .reading
        .ok_or_else(|| ApiError::bad_request("Blood sugar reading must be provided as a number."))?;

    let profile = resolve_profile(&state, user_id, req.profile_id).await?;
    let record = state
        .db
        .create_vital(VitalEntry {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            kind: VitalKind::BloodGlucose,
            systolic: None,
            diastolic: None,
            value: Some(reading),
            unit: "mg/dL".to_string(),
            context: req.context,
            recorded_at: req.recorded_at.unwrap_or_else(|| state.clock.now()),
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RecordResponse { status: 201, record })))
}

pub async fn list_blood_sugar_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile_id = require_profile_param(&query)?;
    let profile = resolve_profile(&state, user_id, Some(profile_id)).await?;
    let records = state
        .db
        .list_vitals(profile.id, VitalKind::BloodGlucose)
        .await?;
    Ok(Json(RecordsResponse { status: 200, records }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBloodSugarRequest {
    pub reading: Option<f64>,
    pub context: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn get_blood_sugar_handler(
    state: State<Arc<AppState>>,
    caller: Extension<CallerId>,
    path: Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    get_vital(state, caller, path, VitalKind::BloodGlucose, "Blood sugar record not found.").await
}

pub async fn update_blood_sugar_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateBloodSugarRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut entry = find_vital_of_kind(
        &state,
        user_id,
        entry_id,
        VitalKind::BloodGlucose,
        "Blood sugar record not found.",
    )
    .await?;

    if let Some(reading) = req.reading {
        entry.value = Some(reading);
    }
    if let Some(context) = req.context {
        entry.context = Some(context);
    }
    if let Some(recorded_at) = req.recorded_at {
        entry.recorded_at = recorded_at;
    }
    if let Some(notes) = req.notes {
        entry.notes = Some(notes);
    }

    let record = state.db.update_vital(entry).await?;
    Ok(Json(RecordResponse { status: 200, record }))
}

//=========================================================================================
// Body weight
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBodyWeightRequest {
    pub profile_id: Option<Uuid>,
    pub weight: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn create_body_weight_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateBodyWeightRequest>,
) -> ApiResult<impl IntoResponse> {
    let weight = req
        .weight
        .ok_or_else(|| ApiError::bad_request("Weight must be provided as a number."))?;

    let profile = resolve_profile(&state, user_id, req.profile_id).await?;
    let record = state
        .db
        .create_vital(VitalEntry {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            kind: VitalKind::Weight,
            systolic: None,
            diastolic: None,
            value: Some(weight),
            unit: "kg".to_string(),
            context: None,
            recorded_at: req.recorded_at.unwrap_or_else(|| state.clock.now()),
            notes: req.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RecordResponse { status: 201, record })))
}

pub async fn list_body_weight_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile_id = require_profile_param(&query)?;
    let profile = resolve_profile(&state, user_id, Some(profile_id)).await?;
    let records = state.db.list_vitals(profile.id, VitalKind::Weight).await?;
    Ok(Json(RecordsResponse { status: 200, records }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBodyWeightRequest {
    pub weight: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

pub async fn get_body_weight_handler(
    state: State<Arc<AppState>>,
    caller: Extension<CallerId>,
    path: Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    get_vital(state, caller, path, VitalKind::Weight, "Body weight record not found.").await
}

pub async fn update_body_weight_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateBodyWeightRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut entry = find_vital_of_kind(
        &state,
        user_id,
        entry_id,
        VitalKind::Weight,
        "Body weight record not found.",
    )
    .await?;

    if let Some(weight) = req.weight {
        entry.value = Some(weight);
    }
    if let Some(recorded_at) = req.recorded_at {
        entry.recorded_at = recorded_at;
    }
    if let Some(notes) = req.notes {
        entry.notes = Some(notes);
    }

    let record = state.db.update_vital(entry).await?;
    Ok(Json(RecordResponse { status: 200, record }))
}

async fn find_vital_of_kind(
    state: &AppState,
    user_id: Uuid,
    entry_id: Uuid,
    kind: VitalKind,
    missing: &str,
) -> ApiResult<VitalEntry> {
    state
        .db
        .find_vital(user_id, entry_id)
        .await?
        .filter(|entry| entry.kind == kind)
        .ok_or_else(|| ApiError::not_found(missing))
}

async fn get_vital(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
    kind: VitalKind,
    missing: &str,
) -> ApiResult<Json<RecordResponse<VitalEntry>>> {
    let record = find_vital_of_kind(&state, user_id, entry_id, kind, missing).await?;
    Ok(Json(RecordResponse { status: 200, record }))
}

//=========================================================================================
// Illness episodes
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIllnessRequest {
    pub profile_id: Option<Uuid>,
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub body_temperature: Option<f64>,
    pub temperature_unit: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub medications: Option<Vec<String>>,
    pub recorded_at: Option<DateTime<Utc>>,
}

pub async fn create_illness_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateIllnessRequest>,
) -> ApiResult<impl IntoResponse> {
    let diagnosis = req
        .diagnosis
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Diagnosis is required."))?;

    let profile = resolve_profile(&state, user_id, req.profile_id).await?;

    let severity = req
        .severity
        .as_deref()
        .and_then(IllnessSeverity::parse)
        .unwrap_or(IllnessSeverity::Mild);
    let status = req
        .status
        .as_deref()
        .and_then(IllnessStatus::parse)
        .unwrap_or(IllnessStatus::Ongoing);

    let record = state
        .db
        .create_illness(IllnessEntry {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            diagnosis,
            symptoms: clean_list(req.symptoms),
            body_temperature: req.body_temperature,
            temperature_unit: req.temperature_unit.unwrap_or_else(|| "C".to_string()),
            severity,
            status,
            medications: clean_list(req.medications),
            notes: req.notes,
            recorded_at: req.recorded_at.unwrap_or_else(|| state.clock.now()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RecordResponse { status: 201, record })))
}

pub async fn list_illness_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile_id = require_profile_param(&query)?;
    let profile = resolve_profile(&state, user_id, Some(profile_id)).await?;
    let records = state.db.list_illnesses(profile.id).await?;
    Ok(Json(RecordsResponse { status: 200, records }))
}

pub async fn get_illness_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .db
        .find_illness(user_id, entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Illness record not found."))?;
    Ok(Json(RecordResponse { status: 200, record }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIllnessRequest {
    pub diagnosis: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub body_temperature: Option<f64>,
    pub temperature_unit: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub medications: Option<Vec<String>>,
    pub recorded_at: Option<DateTime<Utc>>,
}

pub async fn update_illness_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
    Json(req): Json<UpdateIllnessRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut entry = state
        .db
        .find_illness(user_id, entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Illness record not found."))?;

    if let Some(diagnosis) = req.diagnosis {
        entry.diagnosis = diagnosis;
    }
    if let Some(symptoms) = req.symptoms {
        entry.symptoms = symptoms.into_iter().filter(|s| !s.trim().is_empty()).collect();
    }
    if let Some(medications) = req.medications {
        entry.medications = medications
            .into_iter()
            .filter(|m| !m.trim().is_empty())
            .collect();
    }
    if let Some(temperature) = req.body_temperature {
        entry.body_temperature = Some(temperature);
    }
    if let Some(unit) = req.temperature_unit {
        entry.temperature_unit = unit;
    }
    if let Some(raw) = req.severity {
        entry.severity = IllnessSeverity::parse(&raw)
            .ok_or_else(|| ApiError::bad_request("Invalid severity value."))?;
    }
    if let Some(raw) = req.status {
        entry.status = IllnessStatus::parse(&raw)
            .ok_or_else(|| ApiError::bad_request("Invalid status value."))?;
    }
    if let Some(notes) = req.notes {
        entry.notes = Some(notes);
    }
    if let Some(recorded_at) = req.recorded_at {
        entry.recorded_at = recorded_at;
    }

    let record = state.db.update_illness(entry).await?;
    Ok(Json(RecordResponse { status: 200, record }))
}

pub async fn delete_illness_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(entry_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let entry = state
        .db
        .find_illness(user_id, entry_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Illness record not found."))?;

    state.db.delete_illness(entry.id).await?;
    Ok(Json(serde_json::json!({
        "status": 200,
        "message": "Illness record deleted."
    })))
}

fn clean_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .collect()
}
