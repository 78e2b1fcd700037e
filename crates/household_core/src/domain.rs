//! crates/household_core/src/domain.rs
//!
//! Pure data structures for every record domain the service manages.
//! These structs are independent of the database layer; the api service's
//! adapters convert rows into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Users and auth
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Health profiles
//=========================================================================================

/// A health-record subject owned by one user: the user themselves or a
/// family member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: String,
    pub relation_to_user: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VitalKind {
    BloodPressure,
    BloodGlucose,
    Weight,
}

impl VitalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BloodPressure => "BLOOD_PRESSURE",
            Self::BloodGlucose => "BLOOD_GLUCOSE",
            Self::Weight => "WEIGHT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "BLOOD_PRESSURE" => Some(Self::BloodPressure),
            "BLOOD_GLUCOSE" => Some(Self::BloodGlucose),
            "WEIGHT" => Some(Self::Weight),
            _ => None,
        }
    }
}

/// One measurement: blood pressure carries systolic/diastolic, the scalar
/// kinds carry `value`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalEntry {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub kind: VitalKind,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub value: Option<f64>,
    pub unit: String,
    pub context: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IllnessSeverity {
    Mild,
    Moderate,
    Severe,
}

impl IllnessSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "MILD",
            Self::Moderate => "MODERATE",
            Self::Severe => "SEVERE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_enum_input(value).as_str() {
            "MILD" => Some(Self::Mild),
            "MODERATE" => Some(Self::Moderate),
            "SEVERE" => Some(Self::Severe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IllnessStatus {
    Ongoing,
    Recovering,
    Recovered,
}

impl IllnessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ONGOING",
            Self::Recovering => "RECOVERING",
            Self::Recovered => "RECOVERED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_enum_input(value).as_str() {
            "ONGOING" => Some(Self::Ongoing),
            "RECOVERING" => Some(Self::Recovering),
            "RECOVERED" => Some(Self::Recovered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IllnessEntry {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub body_temperature: Option<f64>,
    pub temperature_unit: String,
    pub severity: IllnessSeverity,
    pub status: IllnessStatus,
    pub medications: Vec<String>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

//=========================================================================================
// Medical records and attachments
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    LabReport,
    Prescription,
    Imaging,
    Vaccination,
    DischargeSummary,
    Other,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LabReport => "LAB_REPORT",
            Self::Prescription => "PRESCRIPTION",
            Self::Imaging => "IMAGING",
            Self::Vaccination => "VACCINATION",
            Self::DischargeSummary => "DISCHARGE_SUMMARY",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_enum_input(value).as_str() {
            "LAB_REPORT" => Some(Self::LabReport),
            "PRESCRIPTION" => Some(Self::Prescription),
            "IMAGING" => Some(Self::Imaging),
            "VACCINATION" => Some(Self::Vaccination),
            "DISCHARGE_SUMMARY" => Some(Self::DischargeSummary),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    /// Free-form client input falls back to `Other` instead of erroring.
    pub fn from_input(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Other)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAsset {
    pub id: Uuid,
    pub record_id: Uuid,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub title: String,
    pub record_type: RecordType,
    pub record_date: DateTime<Utc>,
    pub provider_name: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub files: Vec<FileAsset>,
}

//=========================================================================================
// Medications and reminders
//=========================================================================================

/// A prescribed course tied to a profile, created alongside its reminder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub instructions: String,
    pub start_date: DateTime<Utc>,
}

/// Recurring schedule definition for a medication.
///
/// `times` is always normalized to `HH:MM` 24-hour strings; the singular
/// `time` field is legacy and mirrors the first element.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineReminder {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub medication_id: Option<Uuid>,
    pub medicine_name: String,
    pub unit: Option<String>,
    pub dosage: f64,
    pub frequency: String,
    pub time: Option<String>,
    pub times: Vec<String>,
    pub duration: Option<String>,
    pub intake_method: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Stored adherence outcome. "Pending" is the absence of a log, never a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Taken,
    Missed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taken => "taken",
            Self::Missed => "missed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "taken" => Some(Self::Taken),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub status: LogStatus,
}

//=========================================================================================
// Vehicles
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
    pub registration_expiry_date: Option<DateTime<Utc>>,
    pub vin: Option<String>,
    pub vehicle_type: String,
    pub purchase_date: Option<DateTime<Utc>>,
    pub current_mileage: Option<i32>,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub maintenance_type: String,
    pub title: String,
    pub description: Option<String>,
    pub service_date: DateTime<Utc>,
    pub mileage_at_service: Option<i32>,
    pub serviced_by: Option<String>,
    pub location: Option<String>,
    pub cost: Option<f64>,
    pub currency: String,
    pub parts_used: Option<String>,
    pub labor_hours: Option<f64>,
    pub receipt_url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleReminder {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub maintenance_type: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub due_mileage: Option<i32>,
    pub notify_in_advance: Option<i32>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Expenses and budgets
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    EWallet,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Card => "CARD",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::EWallet => "E_WALLET",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_enum_input(value).as_str() {
            "CASH" => Some(Self::Cash),
            "CARD" => Some(Self::Card),
            "BANK_TRANSFER" => Some(Self::BankTransfer),
            "E_WALLET" => Some(Self::EWallet),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn from_input(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Cash)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseFrequency {
    OneTime,
    Weekly,
    Monthly,
    Yearly,
}

impl ExpenseFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "ONE_TIME",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_enum_input(value).as_str() {
            "ONE_TIME" => Some(Self::OneTime),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    pub fn from_input(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::OneTime)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub expense_date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub payment_method: PaymentMethod,
    pub payment_account: Option<String>,
    pub vendor: Option<String>,
    pub location: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub frequency: ExpenseFrequency,
    pub recurring_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub spent: f64,
    pub alert_threshold: Option<f64>,
    pub alert_enabled: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub currency: String,
    pub target_date: Option<DateTime<Utc>>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSchedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expense_id: Option<Uuid>,
    pub title: String,
    pub amount: f64,
    pub currency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub frequency: ExpenseFrequency,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: ExpenseFrequency,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub last_billed_at: Option<DateTime<Utc>>,
    pub category_id: Option<Uuid>,
    pub vendor: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_account: Option<String>,
    pub active: bool,
    pub auto_pay: bool,
    pub cancel_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub institution: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub currency: String,
    pub balance: f64,
    pub is_default: bool,
    pub archived: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCurrency {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Client enum inputs arrive as "bank transfer", "bank-transfer" or
/// "BANK_TRANSFER"; all collapse to the canonical form.
fn normalize_enum_input(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last_sep = false;
    for c in value.trim().chars() {
        if c == ' ' || c == '-' || c == '_' {
            if !last_sep && !out.is_empty() {
                out.push('_');
            }
            last_sep = true;
        } else {
            out.extend(c.to_uppercase());
            last_sep = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_inputs_accept_loose_spelling() {
        assert_eq!(PaymentMethod::parse("bank transfer"), Some(PaymentMethod::BankTransfer));
        assert_eq!(PaymentMethod::parse("Bank-Transfer"), Some(PaymentMethod::BankTransfer));
        assert_eq!(PaymentMethod::from_input("gold doubloons"), PaymentMethod::Cash);
        assert_eq!(ExpenseFrequency::parse("one time"), Some(ExpenseFrequency::OneTime));
        assert_eq!(ExpenseFrequency::from_input("fortnightly"), ExpenseFrequency::OneTime);
        assert_eq!(RecordType::from_input("lab report"), RecordType::LabReport);
        assert_eq!(RecordType::from_input("karaoke receipt"), RecordType::Other);
    }

    #[test]
    fn illness_enums_round_trip() {
        for severity in [IllnessSeverity::Mild, IllnessSeverity::Moderate, IllnessSeverity::Severe] {
            assert_eq!(IllnessSeverity::parse(severity.as_str()), Some(severity));
        }
        for status in [IllnessStatus::Ongoing, IllnessStatus::Recovering, IllnessStatus::Recovered] {
            assert_eq!(IllnessStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(IllnessSeverity::parse("severe"), Some(IllnessSeverity::Severe));
        assert_eq!(IllnessStatus::parse("under the weather"), None);
    }
}
