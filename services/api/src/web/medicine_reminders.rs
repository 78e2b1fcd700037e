//! services/api/src/web/medicine_reminders.rs
//!
//! Medicine reminder endpoints: the per-day adherence listing (which may
//! backfill missed logs for past slots), explicit slot status changes,
//! and reminder CRUD with its paired medication record.
//!
//! The day resolution itself is pure (`household_core::adherence`); this
//! module loads the inputs, performs the backfill writes the plan asks
//! for, and shapes the response.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::CallerId;
use crate::web::state::AppState;
use household_core::adherence::{
    combine_date_and_time, day_bounds, format_time_of_day, normalize_time_value, plan_day,
    scheduled_times,
};
use household_core::domain::{LogStatus, Medication, MedicationLog, MedicineReminder};
use household_core::ports::MedicationStore;

//=========================================================================================
// Wire types
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRemindersQuery {
    pub profile_id: Option<Uuid>,
    pub date: Option<String>,
}

/// One scheduled slot with its adherence status for the requested day.
/// `status` is `null` while the slot is still pending.
#[derive(Serialize, ToSchema)]
pub struct SlotView {
    pub time: String,
    #[schema(value_type = Option<String>)]
    pub status: Option<LogStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedReminder {
    #[serde(flatten)]
    pub reminder: MedicineReminder,
    pub status: Option<LogStatus>,
    pub start_date: DateTime<Utc>,
    pub slots: Vec<SlotView>,
}

#[derive(Serialize)]
pub struct RemindersResponse {
    pub status: u16,
    pub reminders: Vec<ResolvedReminder>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDetail {
    #[serde(flatten)]
    pub reminder: MedicineReminder,
    pub start_date: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ReminderResponse {
    pub status: u16,
    pub reminder: ReminderDetail,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderRequest {
    pub profile_id: Option<Uuid>,
    pub medicine_name: Option<String>,
    pub unit: Option<String>,
    pub dosage: Option<f64>,
    pub frequency: Option<String>,
    pub time: Option<String>,
    pub times: Option<Vec<String>>,
    pub duration: Option<String>,
    pub intake_method: Option<String>,
    pub notes: Option<String>,
    pub start_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderRequest {
    pub medicine_name: Option<String>,
    pub unit: Option<String>,
    pub dosage: Option<f64>,
    pub frequency: Option<String>,
    pub time: Option<String>,
    pub times: Option<Vec<String>>,
    pub duration: Option<String>,
    pub intake_method: Option<String>,
    pub notes: Option<String>,
    pub active: Option<bool>,
    pub start_date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub status: String,
    pub date: Option<String>,
    pub time: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SetStatusResponse {
    pub status: u16,
    #[schema(value_type = Option<Object>)]
    pub log: Option<MedicationLog>,
    pub time: String,
}

//=========================================================================================
// Date handling
//=========================================================================================

/// Lenient reference-date parsing: RFC 3339, a bare date, or a date-time
/// without zone all work; anything else falls back to "now" upstream.
pub fn parse_reference_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

//=========================================================================================
// Day resolution (orchestration around the pure plan)
//=========================================================================================

/// Resolves every reminder of a profile against the reference day and
/// writes the missed-log backfills the plans call for.
///
/// Listing is observably a read with a side effect: past slots without a
/// log gain a `missed` row here. The unique log index makes re-running
/// (or racing) this harmless.
pub async fn resolve_reminders_for_day<S>(
    store: &S,
    now: DateTime<Utc>,
    profile_id: Uuid,
    reference: DateTime<Utc>,
) -> ApiResult<Vec<ResolvedReminder>>
where
    S: MedicationStore + ?Sized,
{
    let (day_start, day_end) = day_bounds(reference);
    let mut resolved = Vec::new();

    for reminder in store.list_reminders(profile_id).await? {
        let medication = match reminder.medication_id {
            Some(id) => store.find_medication(id).await?,
            None => None,
        };
        let day_logs = match reminder.medication_id {
            Some(id) => store.logs_between(id, day_start, day_end).await?,
            None => Vec::new(),
        };

        let start = medication.as_ref().map(|m| m.start_date);
        let Some(plan) = plan_day(&reminder, start, &day_logs, reference, now) else {
            continue;
        };

        if let Some(medication_id) = reminder.medication_id {
            for occurred_at in plan.backfill_times() {
                store
                    .insert_log(MedicationLog {
                        id: Uuid::new_v4(),
                        medication_id,
                        occurred_at,
                        status: LogStatus::Missed,
                    })
                    .await?;
            }
        }

        let slots = plan
            .slots
            .iter()
            .map(|slot| SlotView {
                time: slot.time.clone(),
                status: slot.resolved_status(),
            })
            .collect();

        resolved.push(ResolvedReminder {
            status: plan.rollup(),
            start_date: plan.start_date,
            slots,
            reminder,
        });
    }

    Ok(resolved)
}

/// Applies an explicit slot status change to a reminder.
///
/// The log lookup uses the same rule as the day resolution (day window +
/// formatted time-of-day), so a log created by either path is always
/// found by the other.
pub async fn apply_status<S>(
    store: &S,
    now: DateTime<Utc>,
    reminder: &MedicineReminder,
    request: &SetStatusRequest,
) -> ApiResult<(Option<MedicationLog>, String)>
where
    S: MedicationStore + ?Sized,
{
    let medication_id = reminder
        .medication_id
        .ok_or_else(|| ApiError::not_found("Reminder not found."))?;

    let action = match request.status.as_str() {
        "taken" => Some(LogStatus::Taken),
        "missed" => Some(LogStatus::Missed),
        "pending" => None,
        _ => {
            return Err(ApiError::bad_request(
                "Invalid status. Use taken, missed, or pending.",
            ))
        }
    };

    let schedule = scheduled_times(reminder);
    let normalized = request
        .time
        .as_deref()
        .and_then(normalize_time_value)
        .or_else(|| schedule.first().cloned())
        .filter(|t| schedule.contains(t))
        .ok_or_else(|| ApiError::bad_request("Invalid time slot for this reminder."))?;

    let reference = parse_reference_date(request.date.as_deref()).unwrap_or(now);
    let log_date_time = combine_date_and_time(reference.date_naive(), Some(&normalized));

    let (day_start, day_end) = day_bounds(reference);
    let day_logs = store.logs_between(medication_id, day_start, day_end).await?;
    let existing = day_logs
        .into_iter()
        .find(|log| format_time_of_day(log.occurred_at) == normalized);

    let log = match (action, existing) {
        (None, Some(log)) => {
            store.delete_log(log.id).await?;
            None
        }
        (None, None) => None,
        (Some(status), Some(log)) => Some(store.update_log_status(log.id, status).await?),
        (Some(status), None) => Some(
            store
                .insert_log(MedicationLog {
                    id: Uuid::new_v4(),
                    medication_id,
                    occurred_at: log_date_time,
                    status,
                })
                .await?,
        ),
    };

    Ok((log, normalized))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List a profile's reminders for a day, with per-slot adherence status.
#[utoipa::path(
    get,
    path = "/api/v1/medicine-reminders",
    params(
        ("profileId" = Uuid, Query, description = "Profile whose reminders to list"),
        ("date" = Option<String>, Query, description = "Reference date; defaults to now")
    ),
    responses(
        (status = 200, description = "Reminders with slot statuses"),
        (status = 400, description = "Missing profileId"),
        (status = 404, description = "Profile not found for current user")
    )
)]
pub async fn list_reminders_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ListRemindersQuery>,
) -> ApiResult<impl IntoResponse> {
    let profile_id = query
        .profile_id
        .ok_or_else(|| ApiError::bad_request("profileId query parameter is required."))?;

    let profile = state
        .db
        .find_profile(user_id, Some(profile_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found for current user."))?;

    let now = state.clock.now();
    let reference = parse_reference_date(query.date.as_deref()).unwrap_or(now);
    let reminders =
        resolve_reminders_for_day(state.db.as_ref(), now, profile.id, reference).await?;

    Ok(Json(RemindersResponse {
        status: 200,
        reminders,
    }))
}

pub async fn get_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let reminder = state
        .db
        .find_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found."))?;

    let start_date = match reminder.medication_id {
        Some(id) => state
            .db
            .find_medication(id)
            .await?
            .map(|m| m.start_date)
            .unwrap_or(reminder.created_at),
        None => reminder.created_at,
    };

    Ok(Json(ReminderResponse {
        status: 200,
        reminder: ReminderDetail {
            reminder,
            start_date,
        },
    }))
}

pub async fn create_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let (profile_id, medicine_name, frequency) =
        match (&req.profile_id, &req.medicine_name, &req.frequency) {
            (Some(p), Some(m), Some(f)) if !m.trim().is_empty() && !f.trim().is_empty() => {
                (*p, m.clone(), f.clone())
            }
            _ => {
                return Err(ApiError::bad_request(
                    "profileId, medicineName and frequency are required.",
                ))
            }
        };

    let start_date = match req.start_date.as_deref() {
        Some(raw) => Some(
            parse_reference_date(Some(raw))
                .ok_or_else(|| ApiError::bad_request("Invalid startDate format."))?,
        ),
        None => None,
    };

    let profile = state
        .db
        .find_profile(user_id, Some(profile_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found for current user."))?;

    let schedule = normalize_schedule(req.times.as_deref(), req.time.as_deref());
    let now = state.clock.now();
    let dosage = req.dosage.unwrap_or(1.0);

    let medication = state
        .db
        .create_medication(Medication {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            name: medicine_name.clone(),
            dosage: dosage_label(dosage, req.unit.as_deref()),
            instructions: req.intake_method.clone().unwrap_or_default(),
            start_date: start_date.unwrap_or(now),
        })
        .await?;

    let reminder = state
        .db
        .create_reminder(MedicineReminder {
            id: Uuid::new_v4(),
            profile_id: profile.id,
            medication_id: Some(medication.id),
            medicine_name,
            unit: req.unit,
            dosage,
            frequency,
            time: schedule.first().cloned(),
            times: schedule,
            duration: req.duration,
            intake_method: req.intake_method,
            notes: req.notes,
            active: true,
            created_at: now,
        })
        .await?;

    let start_date = start_date.unwrap_or(reminder.created_at);
    Ok((
        StatusCode::CREATED,
        Json(ReminderResponse {
            status: 201,
            reminder: ReminderDetail {
                reminder,
                start_date,
            },
        }),
    ))
}

pub async fn update_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
    Json(req): Json<UpdateReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut reminder = state
        .db
        .find_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found."))?;

    if let Some(name) = &req.medicine_name {
        reminder.medicine_name = name.clone();
    }
    if let Some(unit) = &req.unit {
        reminder.unit = Some(unit.clone());
    }
    if let Some(dosage) = req.dosage {
        reminder.dosage = dosage;
    }
    if let Some(frequency) = &req.frequency {
        reminder.frequency = frequency.clone();
    }
    if let Some(time) = &req.time {
        reminder.time = Some(time.clone());
    }
    if let Some(duration) = &req.duration {
        reminder.duration = Some(duration.clone());
    }
    if let Some(intake) = &req.intake_method {
        reminder.intake_method = Some(intake.clone());
    }
    if let Some(notes) = &req.notes {
        reminder.notes = Some(notes.clone());
    }
    if let Some(active) = req.active {
        reminder.active = active;
    }
    if let Some(times) = &req.times {
        let normalized: Vec<String> = times
            .iter()
            .filter_map(|t| normalize_time_value(t))
            .collect();
        if let Some(first) = normalized.first() {
            reminder.time = Some(first.clone());
        }
        reminder.times = normalized;
    }

    // Keep the paired medication in step with the reminder edit.
    if let Some(medication_id) = reminder.medication_id {
        if let Some(mut medication) = state.db.find_medication(medication_id).await? {
            if let Some(name) = &req.medicine_name {
                medication.name = name.clone();
            }
            if let Some(intake) = &req.intake_method {
                medication.instructions = intake.clone();
            }
            if req.dosage.is_some() || req.unit.is_some() {
                medication.dosage = dosage_label(reminder.dosage, reminder.unit.as_deref());
            }
            if let Some(raw) = req.start_date.as_deref() {
                if let Some(parsed) = parse_reference_date(Some(raw)) {
                    medication.start_date = parsed;
                }
            }
            state.db.update_medication(medication).await?;
        }
    }

    let reminder = state.db.update_reminder(reminder).await?;
    Ok(Json(serde_json::json!({
        "status": 200,
        "reminder": reminder
    })))
}

pub async fn delete_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let reminder = state
        .db
        .find_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found."))?;

    state.db.delete_reminder(reminder.id).await?;
    if let Some(medication_id) = reminder.medication_id {
        state.db.delete_medication(medication_id).await?;
    }

    Ok(Json(serde_json::json!({
        "status": 200,
        "message": "Reminder deleted successfully."
    })))
}

/// Record (or clear) one slot's adherence status.
#[utoipa::path(
    post,
    path = "/api/v1/medicine-reminders/{id}/logs",
    request_body = SetStatusRequest,
    params(("id" = Uuid, Path, description = "Reminder id")),
    responses(
        (status = 200, description = "Status applied", body = SetStatusResponse),
        (status = 400, description = "Invalid status or time slot"),
        (status = 404, description = "Reminder not found")
    )
)]
pub async fn set_reminder_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let reminder = state
        .db
        .find_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found."))?;

    let (log, time) = apply_status(state.db.as_ref(), state.clock.now(), &reminder, &req).await?;

    Ok(Json(SetStatusResponse {
        status: 200,
        log,
        time,
    }))
}

fn normalize_schedule(times: Option<&[String]>, single: Option<&str>) -> Vec<String> {
    let normalized: Vec<String> = times
        .unwrap_or_default()
        .iter()
        .filter_map(|t| normalize_time_value(t))
        .collect();
    if !normalized.is_empty() {
        return normalized;
    }
    single
        .and_then(normalize_time_value)
        .map(|t| vec![t])
        .unwrap_or_default()
}

fn dosage_label(dosage: f64, unit: Option<&str>) -> String {
    format!("{} {}", dosage, unit.unwrap_or("")).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_dates_parse_leniently() {
        assert!(parse_reference_date(Some("2024-03-04")).is_some());
        assert!(parse_reference_date(Some("2024-03-04T08:30:00Z")).is_some());
        assert!(parse_reference_date(Some("2024-03-04T08:30:00")).is_some());
        assert_eq!(parse_reference_date(Some("next tuesday")), None);
        assert_eq!(parse_reference_date(Some("")), None);
        assert_eq!(parse_reference_date(None), None);
    }

    #[test]
    fn schedule_normalization_prefers_times_over_legacy_time() {
        assert_eq!(
            normalize_schedule(Some(&["8".into(), "20:15".into()]), Some("12:00")),
            vec!["08:00".to_string(), "20:15".to_string()]
        );
        assert_eq!(
            normalize_schedule(Some(&["bedtime".into()]), Some("7")),
            vec!["07:00".to_string()]
        );
        assert!(normalize_schedule(None, None).is_empty());
    }

    #[test]
    fn dosage_labels_trim_missing_units() {
        assert_eq!(dosage_label(500.0, Some("mg")), "500 mg");
        assert_eq!(dosage_label(1.5, None), "1.5");
    }
}
