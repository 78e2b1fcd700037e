//! services/api/src/web/vehicles.rs
//!
//! Vehicle endpoints: the garage itself, service history, and upcoming
//! maintenance reminders. Vehicle create/update accept multipart forms so
//! a photo can be attached; everything else is JSON.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::medical_records::{collect_multipart, parse_string_list, UploadedFile};
use crate::web::medicine_reminders::parse_reference_date;
use crate::web::middleware::CallerId;
use crate::web::state::AppState;
use household_core::domain::{MaintenanceRecord, Vehicle, VehicleReminder};

const VEHICLES_FOLDER: &str = "vehicles";

#[derive(Serialize)]
pub struct VehicleResponse {
    pub status: u16,
    pub vehicle: Vehicle,
}

#[derive(Serialize)]
pub struct VehiclesResponse {
    pub status: u16,
    pub vehicles: Vec<Vehicle>,
}

#[derive(Serialize)]
pub struct MaintenanceResponse {
    pub status: u16,
    pub record: MaintenanceRecord,
}

#[derive(Serialize)]
pub struct MaintenanceListResponse {
    pub status: u16,
    pub records: Vec<MaintenanceRecord>,
}

#[derive(Serialize)]
pub struct VehicleReminderResponse {
    pub status: u16,
    pub reminder: VehicleReminder,
}

#[derive(Serialize)]
pub struct VehicleRemindersResponse {
    pub status: u16,
    pub reminders: Vec<VehicleReminder>,
}

async fn stored_image_url(
    state: &AppState,
    uploads: Vec<UploadedFile>,
) -> ApiResult<Option<String>> {
    match uploads.into_iter().next() {
        Some(upload) => {
            let url = state
                .files
                .save(VEHICLES_FOLDER, &upload.original_name, &upload.bytes)
                .await?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

fn parse_int(fields: &HashMap<String, String>, key: &str) -> Option<i32> {
    fields.get(key).and_then(|v| v.trim().parse().ok())
}

fn parse_date(fields: &HashMap<String, String>, key: &str) -> Option<DateTime<Utc>> {
    fields.get(key).and_then(|v| parse_reference_date(Some(v)))
}

//=========================================================================================
// Vehicles
//=========================================================================================

pub async fn create_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (fields, uploads) = collect_multipart(multipart, 1).await?;

    let make = fields.get("make").filter(|v| !v.trim().is_empty());
    let model = fields.get("model").filter(|v| !v.trim().is_empty());
    let (make, model) = match (make, model) {
        (Some(make), Some(model)) => (make.clone(), model.clone()),
        _ => return Err(ApiError::bad_request("make and model are required")),
    };

    let image_url = match stored_image_url(&state, uploads).await? {
        Some(url) => Some(url),
        None => fields.get("imageUrl").cloned(),
    };

    let vehicle = state
        .db
        .create_vehicle(Vehicle {
            id: Uuid::new_v4(),
            user_id,
            make,
            model,
            year: parse_int(&fields, "year"),
            color: fields.get("color").cloned(),
            license_plate: fields.get("licensePlate").cloned(),
            registration_expiry_date: parse_date(&fields, "registrationExpiryDate"),
            vin: fields.get("vin").cloned(),
            vehicle_type: fields
                .get("vehicleType")
                .cloned()
                .unwrap_or_else(|| "CAR".to_string()),
            purchase_date: parse_date(&fields, "purchaseDate"),
            current_mileage: parse_int(&fields, "currentMileage"),
            image_url,
            notes: fields.get("notes").cloned(),
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(VehicleResponse {
            status: 201,
            vehicle,
        }),
    ))
}

pub async fn list_vehicles_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
) -> ApiResult<impl IntoResponse> {
    let vehicles = state.db.list_vehicles(user_id).await?;
    Ok(Json(VehiclesResponse {
        status: 200,
        vehicles,
    }))
}

pub async fn get_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(vehicle_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let vehicle = state
        .db
        .find_vehicle(user_id, vehicle_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;
    Ok(Json(VehicleResponse {
        status: 200,
        vehicle,
    }))
}

pub async fn update_vehicle_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(vehicle_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut vehicle = state
        .db
        .find_vehicle(user_id, vehicle_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    let (fields, uploads) = collect_multipart(multipart, 1).await?;

    if let Some(make) = fields.get("make") {
        vehicle.make = make.clone();
    }
    if let Some(model) = fields.get("model") {
        vehicle.model = model.clone();
    }
    if fields.contains_key("year") {
        vehicle.year = parse_int(&fields, "year");
    }
    if let Some(color) = fields.get("color") {
        vehicle.color = Some(color.clone());
    }
    if let Some(plate) = fields.get("licensePlate") {
        vehicle.license_plate = Some(plate.clone());
    }
    if let Some(expiry) = parse_date(&fields, "registrationExpiryDate") {
        vehicle.registration_expiry_date = Some(expiry);
    }
    if let Some(vin) = fields.get("vin") {
        vehicle.vin = Some(vin.clone());
    }
    if let Some(vehicle_type) = fields.get("vehicleType") {
        vehicle.vehicle_type = vehicle_type.clone();
    }
    if let Some(purchased) = parse_date(&fields, "purchaseDate") {
        vehicle.purchase_date = Some(purchased);
    }
    if fields.contains_key("currentMileage") {
        vehicle.current_mileage = parse_int(&fields, "currentMileage");
    }
    if let Some(notes) = fields.get("notes") {
        vehicle.notes = Some(notes.clone());
    }
    if let Some(url) = stored_image_url(&state, uploads).await? {
        vehicle.image_url = Some(url);
    } else if let Some(url) = fields.get("imageUrl") {
        vehicle.image_url = Some(url.clone());
    }

    let vehicle = state.db.update_vehicle(vehicle).await?;
    Ok(Json(VehicleResponse {
        status: 200,
        vehicle,
    }))
}

//=========================================================================================
// Maintenance records
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceListQuery {
    pub vehicle_id: Option<Uuid>,
    pub search: Option<String>,
}

pub async fn list_maintenance_records_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<MaintenanceListQuery>,
) -> ApiResult<impl IntoResponse> {
    let owned = state.db.owned_vehicle_ids(user_id).await?;
    if let Some(vehicle_id) = query.vehicle_id {
        if !owned.contains(&vehicle_id) {
            return Err(ApiError::not_found("Vehicle not found for current user"));
        }
    }
    let filter_ids: Vec<Uuid> = match query.vehicle_id {
        Some(id) => vec![id],
        None => owned,
    };

    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let records = state
        .db
        .list_maintenance_records(&filter_ids, search)
        .await?;

    Ok(Json(MaintenanceListResponse {
        status: 200,
        records,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    pub vehicle_id: Option<Uuid>,
    pub maintenance_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub service_date: Option<String>,
    pub mileage_at_service: Option<i32>,
    pub serviced_by: Option<String>,
    pub location: Option<String>,
    pub cost: Option<f64>,
    pub currency: Option<String>,
    pub parts_used: Option<String>,
    pub labor_hours: Option<f64>,
    pub receipt_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn create_maintenance_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateMaintenanceRequest>,
) -> ApiResult<impl IntoResponse> {
    let maintenance_type = req
        .maintenance_type
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("OTHER")
        .to_string();
    let title = req
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| maintenance_type.clone());

    let (vehicle_id, service_date) = match (
        req.vehicle_id,
        req.service_date
            .as_deref()
            .and_then(|raw| parse_reference_date(Some(raw))),
    ) {
        (Some(v), Some(d)) => (v, d),
        _ => {
            return Err(ApiError::bad_request(
                "vehicleId, maintenanceType/title, and serviceDate are required",
            ))
        }
    };

    let vehicle = state
        .db
        .find_vehicle(user_id, vehicle_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found for current user"))?;

    let record = state
        .db
        .create_maintenance_record(MaintenanceRecord {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            maintenance_type,
            title,
            description: req.description,
            service_date,
            mileage_at_service: req.mileage_at_service,
            serviced_by: req.serviced_by,
            location: req.location,
            cost: req.cost,
            currency: req.currency.unwrap_or_else(|| "USD".to_string()),
            parts_used: req.parts_used,
            labor_hours: req.labor_hours,
            receipt_url: req.receipt_url,
            tags: req
                .tags
                .map(|tags| {
                    tags.iter()
                        .flat_map(|t| parse_string_list(t))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default(),
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MaintenanceResponse {
            status: 201,
            record,
        }),
    ))
}

pub async fn get_maintenance_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(record_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .db
        .find_maintenance_record(user_id, record_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Maintenance record not found"))?;
    Ok(Json(MaintenanceResponse {
        status: 200,
        record,
    }))
}

pub async fn delete_maintenance_record_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(record_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .db
        .find_maintenance_record(user_id, record_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Maintenance record not found"))?;

    state.db.delete_maintenance_record(record.id).await?;
    Ok(Json(serde_json::json!({
        "status": 200,
        "message": "Maintenance record deleted"
    })))
}

//=========================================================================================
// Vehicle reminders
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderListQuery {
    pub vehicle_id: Option<Uuid>,
}

pub async fn list_vehicle_reminders_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Query(query): Query<ReminderListQuery>,
) -> ApiResult<impl IntoResponse> {
    let owned = state.db.owned_vehicle_ids(user_id).await?;
    if owned.is_empty() {
        return Ok(Json(VehicleRemindersResponse {
            status: 200,
            reminders: Vec::new(),
        }));
    }
    let filter_ids: Vec<Uuid> = match query.vehicle_id {
        Some(id) if owned.contains(&id) => vec![id],
        Some(_) => Vec::new(),
        None => owned,
    };

    let reminders = state.db.list_vehicle_reminders(&filter_ids).await?;
    Ok(Json(VehicleRemindersResponse {
        status: 200,
        reminders,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleReminderRequest {
    pub vehicle_id: Option<Uuid>,
    pub maintenance_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub due_mileage: Option<i32>,
    pub notify_in_advance: Option<i32>,
}

pub async fn create_vehicle_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CreateVehicleReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let vehicle_id = req
        .vehicle_id
        .ok_or_else(|| ApiError::bad_request("vehicleId is required"))?;
    let label = req
        .maintenance_type
        .clone()
        .or_else(|| req.title.clone())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("maintenanceType is required"))?;

    let vehicle = state
        .db
        .find_vehicle(user_id, vehicle_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Vehicle not found"))?;

    let reminder = state
        .db
        .create_vehicle_reminder(VehicleReminder {
            id: Uuid::new_v4(),
            vehicle_id: vehicle.id,
            maintenance_type: label.clone(),
            title: req.title.unwrap_or(label),
            description: req.description,
            due_date: req
                .due_date
                .as_deref()
                .and_then(|raw| parse_reference_date(Some(raw))),
            due_mileage: req.due_mileage,
            notify_in_advance: req.notify_in_advance,
            completed: false,
            completed_at: None,
            active: true,
            created_at: state.clock.now(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(VehicleReminderResponse {
            status: 201,
            reminder,
        }),
    ))
}

pub async fn get_vehicle_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let reminder = state
        .db
        .find_vehicle_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found"))?;
    Ok(Json(VehicleReminderResponse {
        status: 200,
        reminder,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleReminderRequest {
    pub maintenance_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub due_mileage: Option<i32>,
    pub notify_in_advance: Option<i32>,
    pub completed: Option<bool>,
    pub active: Option<bool>,
}

pub async fn update_vehicle_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
    Json(req): Json<UpdateVehicleReminderRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut reminder = state
        .db
        .find_vehicle_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found"))?;

    if let Some(maintenance_type) = req.maintenance_type {
        reminder.maintenance_type = maintenance_type;
    }
    if let Some(title) = req.title {
        reminder.title = title;
    }
    if let Some(description) = req.description {
        reminder.description = Some(description);
    }
    if let Some(raw) = req.due_date.as_deref() {
        reminder.due_date = parse_reference_date(Some(raw));
    }
    if let Some(due_mileage) = req.due_mileage {
        reminder.due_mileage = Some(due_mileage);
    }
    if let Some(notify) = req.notify_in_advance {
        reminder.notify_in_advance = Some(notify);
    }
    if let Some(active) = req.active {
        reminder.active = active;
    }
    if let Some(completed) = req.completed {
        reminder.completed = completed;
        reminder.completed_at = completed.then(|| state.clock.now());
    }

    let reminder = state.db.update_vehicle_reminder(reminder).await?;
    Ok(Json(VehicleReminderResponse {
        status: 200,
        reminder,
    }))
}

pub async fn delete_vehicle_reminder_handler(
    State(state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(reminder_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let reminder = state
        .db
        .find_vehicle_reminder(user_id, reminder_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Reminder not found"))?;

    state.db.delete_vehicle_reminder(reminder.id).await?;
    Ok(Json(serde_json::json!({
        "status": 200,
        "deleted": true
    })))
}
