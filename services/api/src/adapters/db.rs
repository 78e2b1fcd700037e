//! services/api/src/adapters/db.rs
//!
//! The database adapter: the concrete implementation of every store port
//! from the core crate, backed by PostgreSQL through `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use household_core::domain::{
    Account, Budget, Expense, ExpenseCategory, ExpenseFrequency, ExpenseSchedule, FileAsset,
    FinancialGoal, IllnessEntry, IllnessSeverity, IllnessStatus, LogStatus, MaintenanceRecord,
    MedicalRecord, Medication, MedicationLog, MedicineReminder, PaymentMethod, Profile,
    RecordType, Subscription, User, UserCredentials, UserCurrency, Vehicle, VehicleReminder,
    VitalEntry, VitalKind,
};
use household_core::ports::{
    AuthStore, ExpenseFilter, ExpenseStore, MedicalRecordStore, MedicationStore, PortError,
    PortResult, ProfileStore, VehicleStore, VitalsStore,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter implementing the store ports over a connection pool.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the embedded migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn bad_enum(column: &str, value: &str) -> PortError {
    PortError::Unexpected(format!("stored {column} value '{value}' is not recognized"))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
    created_at: DateTime<Utc>,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            email: self.email,
            hashed_password: self.hashed_password,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    id: Uuid,
    user_id: Uuid,
    display_name: String,
    relation_to_user: Option<String>,
    date_of_birth: Option<DateTime<Utc>>,
    gender: Option<String>,
    blood_group: Option<String>,
    allergies: Option<String>,
    chronic_conditions: Option<String>,
    created_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            id: self.id,
            user_id: self.user_id,
            display_name: self.display_name,
            relation_to_user: self.relation_to_user,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            blood_group: self.blood_group,
            allergies: self.allergies,
            chronic_conditions: self.chronic_conditions,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct VitalRecord {
    id: Uuid,
    profile_id: Uuid,
    kind: String,
    systolic: Option<f64>,
    diastolic: Option<f64>,
    value: Option<f64>,
    unit: String,
    context: Option<String>,
    recorded_at: DateTime<Utc>,
    notes: Option<String>,
}
impl VitalRecord {
    fn to_domain(self) -> PortResult<VitalEntry> {
        let kind = VitalKind::parse(&self.kind).ok_or_else(|| bad_enum("kind", &self.kind))?;
        Ok(VitalEntry {
            id: self.id,
            profile_id: self.profile_id,
            kind,
            systolic: self.systolic,
            diastolic: self.diastolic,
            value: self.value,
            unit: self.unit,
            context: self.context,
            recorded_at: self.recorded_at,
            notes: self.notes,
        })
    }
}

#[derive(FromRow)]
struct IllnessRecord {
    id: Uuid,
    profile_id: Uuid,
    diagnosis: String,
    symptoms: Vec<String>,
    body_temperature: Option<f64>,
    temperature_unit: String,
    severity: String,
    status: String,
    medications: Vec<String>,
    notes: Option<String>,
    recorded_at: DateTime<Utc>,
}
impl IllnessRecord {
    fn to_domain(self) -> PortResult<IllnessEntry> {
        let severity = IllnessSeverity::parse(&self.severity)
            .ok_or_else(|| bad_enum("severity", &self.severity))?;
        let status =
            IllnessStatus::parse(&self.status).ok_or_else(|| bad_enum("status", &self.status))?;
        Ok(IllnessEntry {
            id: self.id,
            profile_id: self.profile_id,
            diagnosis: self.diagnosis,
            symptoms: self.symptoms,
            body_temperature: self.body_temperature,
            temperature_unit: self.temperature_unit,
            severity,
            status,
            medications: self.medications,
            notes: self.notes,
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(FromRow)]
struct MedicalRecordRow {
    id: Uuid,
    profile_id: Uuid,
    title: String,
    record_type: String,
    record_date: DateTime<Utc>,
    provider_name: Option<String>,
    notes: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}
impl MedicalRecordRow {
    fn to_domain(self, files: Vec<FileAsset>) -> PortResult<MedicalRecord> {
        let record_type = RecordType::parse(&self.record_type)
            .ok_or_else(|| bad_enum("record_type", &self.record_type))?;
        Ok(MedicalRecord {
            id: self.id,
            profile_id: self.profile_id,
            title: self.title,
            record_type,
            record_date: self.record_date,
            provider_name: self.provider_name,
            notes: self.notes,
            tags: self.tags,
            created_at: self.created_at,
            files,
        })
    }
}

#[derive(FromRow)]
struct FileAssetRecord {
    id: Uuid,
    record_id: Uuid,
    url: String,
    mime_type: String,
    size_bytes: i64,
    original_name: String,
}
impl FileAssetRecord {
    fn to_domain(self) -> FileAsset {
        FileAsset {
            id: self.id,
            record_id: self.record_id,
            url: self.url,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            original_name: self.original_name,
        }
    }
}

#[derive(FromRow)]
struct MedicationRecord {
    id: Uuid,
    profile_id: Uuid,
    name: String,
    dosage: String,
    instructions: String,
    start_date: DateTime<Utc>,
}
impl MedicationRecord {
    fn to_domain(self) -> Medication {
        Medication {
            id: self.id,
            profile_id: self.profile_id,
            name: self.name,
            dosage: self.dosage,
            instructions: self.instructions,
            start_date: self.start_date,
        }
    }
}

#[derive(FromRow)]
struct ReminderRecord {
    id: Uuid,
    profile_id: Uuid,
    medication_id: Option<Uuid>,
    medicine_name: String,
    unit: Option<String>,
    dosage: f64,
    frequency: String,
    time: Option<String>,
    times: Vec<String>,
    duration: Option<String>,
    intake_method: Option<String>,
    notes: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}
impl ReminderRecord {
    fn to_domain(self) -> MedicineReminder {
        MedicineReminder {
            id: self.id,
            profile_id: self.profile_id,
            medication_id: self.medication_id,
            medicine_name: self.medicine_name,
            unit: self.unit,
            dosage: self.dosage,
            frequency: self.frequency,
            time: self.time,
            times: self.times,
            duration: self.duration,
            intake_method: self.intake_method,
            notes: self.notes,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct LogRecord {
    id: Uuid,
    medication_id: Uuid,
    occurred_at: DateTime<Utc>,
    status: String,
}
impl LogRecord {
    fn to_domain(self) -> PortResult<MedicationLog> {
        let status =
            LogStatus::parse(&self.status).ok_or_else(|| bad_enum("status", &self.status))?;
        Ok(MedicationLog {
            id: self.id,
            medication_id: self.medication_id,
            occurred_at: self.occurred_at,
            status,
        })
    }
}

#[derive(FromRow)]
struct VehicleRecord {
    id: Uuid,
    user_id: Uuid,
    make: String,
    model: String,
    year: Option<i32>,
    color: Option<String>,
    license_plate: Option<String>,
    registration_expiry_date: Option<DateTime<Utc>>,
    vin: Option<String>,
    vehicle_type: String,
    purchase_date: Option<DateTime<Utc>>,
    current_mileage: Option<i32>,
    image_url: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}
impl VehicleRecord {
    fn to_domain(self) -> Vehicle {
        Vehicle {
            id: self.id,
            user_id: self.user_id,
            make: self.make,
            model: self.model,
            year: self.year,
            color: self.color,
            license_plate: self.license_plate,
            registration_expiry_date: self.registration_expiry_date,
            vin: self.vin,
            vehicle_type: self.vehicle_type,
            purchase_date: self.purchase_date,
            current_mileage: self.current_mileage,
            image_url: self.image_url,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MaintenanceRecordRow {
    id: Uuid,
    vehicle_id: Uuid,
    maintenance_type: String,
    title: String,
    description: Option<String>,
    service_date: DateTime<Utc>,
    mileage_at_service: Option<i32>,
    serviced_by: Option<String>,
    location: Option<String>,
    cost: Option<f64>,
    currency: String,
    parts_used: Option<String>,
    labor_hours: Option<f64>,
    receipt_url: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}
impl MaintenanceRecordRow {
    fn to_domain(self) -> MaintenanceRecord {
        MaintenanceRecord {
            id: self.id,
            vehicle_id: self.vehicle_id,
            maintenance_type: self.maintenance_type,
            title: self.title,
            description: self.description,
            service_date: self.service_date,
            mileage_at_service: self.mileage_at_service,
            serviced_by: self.serviced_by,
            location: self.location,
            cost: self.cost,
            currency: self.currency,
            parts_used: self.parts_used,
            labor_hours: self.labor_hours,
            receipt_url: self.receipt_url,
            tags: self.tags,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct VehicleReminderRecord {
    id: Uuid,
    vehicle_id: Uuid,
    maintenance_type: String,
    title: String,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
    due_mileage: Option<i32>,
    notify_in_advance: Option<i32>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}
impl VehicleReminderRecord {
    fn to_domain(self) -> VehicleReminder {
        VehicleReminder {
            id: self.id,
            vehicle_id: self.vehicle_id,
            maintenance_type: self.maintenance_type,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            due_mileage: self.due_mileage,
            notify_in_advance: self.notify_in_advance,
            completed: self.completed,
            completed_at: self.completed_at,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ExpenseRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    amount: f64,
    currency: String,
    expense_date: DateTime<Utc>,
    category_id: Option<Uuid>,
    subcategory: Option<String>,
    tags: Vec<String>,
    payment_method: String,
    payment_account: Option<String>,
    vendor: Option<String>,
    location: Option<String>,
    receipt_url: Option<String>,
    notes: Option<String>,
    is_recurring: bool,
    frequency: String,
    recurring_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}
impl ExpenseRecord {
    fn to_domain(self) -> PortResult<Expense> {
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or_else(|| bad_enum("payment_method", &self.payment_method))?;
        let frequency = ExpenseFrequency::parse(&self.frequency)
            .ok_or_else(|| bad_enum("frequency", &self.frequency))?;
        Ok(Expense {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            amount: self.amount,
            currency: self.currency,
            expense_date: self.expense_date,
            category_id: self.category_id,
            subcategory: self.subcategory,
            tags: self.tags,
            payment_method,
            payment_account: self.payment_account,
            vendor: self.vendor,
            location: self.location,
            receipt_url: self.receipt_url,
            notes: self.notes,
            is_recurring: self.is_recurring,
            frequency,
            recurring_until: self.recurring_until,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CategoryRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    color: Option<String>,
    icon: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}
impl CategoryRecord {
    fn to_domain(self) -> ExpenseCategory {
        ExpenseCategory {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            color: self.color,
            icon: self.icon,
            is_default: self.is_default,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct BudgetRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    amount: f64,
    currency: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    category_id: Option<Uuid>,
    spent: f64,
    alert_threshold: Option<f64>,
    alert_enabled: bool,
    active: bool,
    created_at: DateTime<Utc>,
}
impl BudgetRecord {
    fn to_domain(self) -> Budget {
        Budget {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            amount: self.amount,
            currency: self.currency,
            start_date: self.start_date,
            end_date: self.end_date,
            category_id: self.category_id,
            spent: self.spent,
            alert_threshold: self.alert_threshold,
            alert_enabled: self.alert_enabled,
            active: self.active,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct GoalRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    target_amount: f64,
    current_amount: f64,
    currency: String,
    target_date: Option<DateTime<Utc>>,
    color: Option<String>,
    icon: Option<String>,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}
impl GoalRecord {
    fn to_domain(self) -> FinancialGoal {
        FinancialGoal {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            target_amount: self.target_amount,
            current_amount: self.current_amount,
            currency: self.currency,
            target_date: self.target_date,
            color: self.color,
            icon: self.icon,
            completed: self.completed,
            completed_at: self.completed_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ScheduleRecord {
    id: Uuid,
    user_id: Uuid,
    expense_id: Option<Uuid>,
    title: String,
    amount: f64,
    currency: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    frequency: String,
    next_run_at: Option<DateTime<Utc>>,
    last_run_at: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}
impl ScheduleRecord {
    fn to_domain(self) -> PortResult<ExpenseSchedule> {
        let frequency = ExpenseFrequency::parse(&self.frequency)
            .ok_or_else(|| bad_enum("frequency", &self.frequency))?;
        Ok(ExpenseSchedule {
            id: self.id,
            user_id: self.user_id,
            expense_id: self.expense_id,
            title: self.title,
            amount: self.amount,
            currency: self.currency,
            start_date: self.start_date,
            end_date: self.end_date,
            frequency,
            next_run_at: self.next_run_at,
            last_run_at: self.last_run_at,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SubscriptionRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    amount: f64,
    currency: String,
    billing_cycle: String,
    next_billing_date: Option<DateTime<Utc>>,
    last_billed_at: Option<DateTime<Utc>>,
    category_id: Option<Uuid>,
    vendor: Option<String>,
    payment_method: String,
    payment_account: Option<String>,
    active: bool,
    auto_pay: bool,
    cancel_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}
impl SubscriptionRecord {
    fn to_domain(self) -> PortResult<Subscription> {
        let billing_cycle = ExpenseFrequency::parse(&self.billing_cycle)
            .ok_or_else(|| bad_enum("billing_cycle", &self.billing_cycle))?;
        let payment_method = PaymentMethod::parse(&self.payment_method)
            .ok_or_else(|| bad_enum("payment_method", &self.payment_method))?;
        Ok(Subscription {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            amount: self.amount,
            currency: self.currency,
            billing_cycle,
            next_billing_date: self.next_billing_date,
            last_billed_at: self.last_billed_at,
            category_id: self.category_id,
            vendor: self.vendor,
            payment_method,
            payment_account: self.payment_account,
            active: self.active,
            auto_pay: self.auto_pay,
            cancel_at: self.cancel_at,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    institution: Option<String>,
    kind: Option<String>,
    currency: String,
    balance: f64,
    is_default: bool,
    archived: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}
impl AccountRecord {
    fn to_domain(self) -> Account {
        Account {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            institution: self.institution,
            kind: self.kind,
            currency: self.currency,
            balance: self.balance,
            is_default: self.is_default,
            archived: self.archived,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CurrencyRecord {
    id: Uuid,
    user_id: Uuid,
    code: String,
    name: Option<String>,
    symbol: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}
impl CurrencyRecord {
    fn to_domain(self) -> UserCurrency {
        UserCurrency {
            id: self.id,
            user_id: self.user_id,
            code: self.code,
            name: self.name,
            symbol: self.symbol,
            is_default: self.is_default,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// AuthStore
//=========================================================================================

#[async_trait]
impl AuthStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, email, hashed_password) VALUES ($1, $2, $3)
             RETURNING id, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|d| matches!(d.kind(), sqlx::error::ErrorKind::UniqueViolation))
            {
                PortError::Validation("email is already registered".to_string())
            } else {
                unexpected(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE token = $1 AND expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(|(user_id,)| user_id).ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// ProfileStore
//=========================================================================================

const PROFILE_COLUMNS: &str = "id, user_id, display_name, relation_to_user, date_of_birth, \
                               gender, blood_group, allergies, chronic_conditions, created_at";

#[async_trait]
impl ProfileStore for DbAdapter {
    async fn create_profile(&self, profile: Profile) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(&format!(
            "INSERT INTO profiles ({PROFILE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id)
        .bind(profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.relation_to_user)
        .bind(profile.date_of_birth)
        .bind(&profile.gender)
        .bind(&profile.blood_group)
        .bind(&profile.allergies)
        .bind(&profile.chronic_conditions)
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_profiles(&self, user_id: Uuid) -> PortResult<Vec<Profile>> {
        let records = sqlx::query_as::<_, ProfileRecord>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ProfileRecord::to_domain).collect())
    }

    async fn find_profile(
        &self,
        user_id: Uuid,
        profile_id: Option<Uuid>,
    ) -> PortResult<Option<Profile>> {
        let record = match profile_id {
            Some(id) => {
                sqlx::query_as::<_, ProfileRecord>(&format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1 AND user_id = $2"
                ))
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, ProfileRecord>(&format!(
                    "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1
                     ORDER BY created_at ASC LIMIT 1"
                ))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        Ok(record.map(ProfileRecord::to_domain))
    }
}

//=========================================================================================
// VitalsStore
//=========================================================================================

const VITAL_COLUMNS: &str =
    "id, profile_id, kind, systolic, diastolic, value, unit, context, recorded_at, notes";

const ILLNESS_COLUMNS: &str = "id, profile_id, diagnosis, symptoms, body_temperature, \
                               temperature_unit, severity, status, medications, notes, recorded_at";

#[async_trait]
impl VitalsStore for DbAdapter {
    async fn create_vital(&self, entry: VitalEntry) -> PortResult<VitalEntry> {
        let record = sqlx::query_as::<_, VitalRecord>(&format!(
            "INSERT INTO vital_entries ({VITAL_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {VITAL_COLUMNS}"
        ))
        .bind(entry.id)
        .bind(entry.profile_id)
        .bind(entry.kind.as_str())
        .bind(entry.systolic)
        .bind(entry.diastolic)
        .bind(entry.value)
        .bind(&entry.unit)
        .bind(&entry.context)
        .bind(entry.recorded_at)
        .bind(&entry.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_vitals(&self, profile_id: Uuid, kind: VitalKind) -> PortResult<Vec<VitalEntry>> {
        let records = sqlx::query_as::<_, VitalRecord>(&format!(
            "SELECT {VITAL_COLUMNS} FROM vital_entries
             WHERE profile_id = $1 AND kind = $2 ORDER BY recorded_at ASC"
        ))
        .bind(profile_id)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(VitalRecord::to_domain).collect()
    }

    async fn find_vital(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<Option<VitalEntry>> {
        let record = sqlx::query_as::<_, VitalRecord>(
            "SELECT e.id, e.profile_id, e.kind, e.systolic, e.diastolic, e.value, e.unit,
                    e.context, e.recorded_at, e.notes
             FROM vital_entries e
             JOIN profiles p ON p.id = e.profile_id
             WHERE e.id = $1 AND p.user_id = $2",
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(VitalRecord::to_domain).transpose()
    }

    async fn update_vital(&self, entry: VitalEntry) -> PortResult<VitalEntry> {
        let record = sqlx::query_as::<_, VitalRecord>(&format!(
            "UPDATE vital_entries SET systolic = $2, diastolic = $3, value = $4, unit = $5,
                    context = $6, recorded_at = $7, notes = $8
             WHERE id = $1
             RETURNING {VITAL_COLUMNS}"
        ))
        .bind(entry.id)
        .bind(entry.systolic)
        .bind(entry.diastolic)
        .bind(entry.value)
        .bind(&entry.unit)
        .bind(&entry.context)
        .bind(entry.recorded_at)
        .bind(&entry.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn create_illness(&self, entry: IllnessEntry) -> PortResult<IllnessEntry> {
        let record = sqlx::query_as::<_, IllnessRecord>(&format!(
            "INSERT INTO illness_entries ({ILLNESS_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ILLNESS_COLUMNS}"
        ))
        .bind(entry.id)
        .bind(entry.profile_id)
        .bind(&entry.diagnosis)
        .bind(&entry.symptoms)
        .bind(entry.body_temperature)
        .bind(&entry.temperature_unit)
        .bind(entry.severity.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.medications)
        .bind(&entry.notes)
        .bind(entry.recorded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn list_illnesses(&self, profile_id: Uuid) -> PortResult<Vec<IllnessEntry>> {
        let records = sqlx::query_as::<_, IllnessRecord>(&format!(
            "SELECT {ILLNESS_COLUMNS} FROM illness_entries
             WHERE profile_id = $1 ORDER BY recorded_at DESC"
        ))
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(IllnessRecord::to_domain).collect()
    }

    async fn find_illness(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
    ) -> PortResult<Option<IllnessEntry>> {
        let record = sqlx::query_as::<_, IllnessRecord>(
            "SELECT e.id, e.profile_id, e.diagnosis, e.symptoms, e.body_temperature,
                    e.temperature_unit, e.severity, e.status, e.medications, e.notes,
                    e.recorded_at
             FROM illness_entries e
             JOIN profiles p ON p.id = e.profile_id
             WHERE e.id = $1 AND p.user_id = $2",
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(IllnessRecord::to_domain).transpose()
    }

    async fn update_illness(&self, entry: IllnessEntry) -> PortResult<IllnessEntry> {
        let record = sqlx::query_as::<_, IllnessRecord>(&format!(
            "UPDATE illness_entries SET diagnosis = $2, symptoms = $3, body_temperature = $4,
                    temperature_unit = $5, severity = $6, status = $7, medications = $8,
                    notes = $9, recorded_at = $10
             WHERE id = $1
             RETURNING {ILLNESS_COLUMNS}"
        ))
        .bind(entry.id)
        .bind(&entry.diagnosis)
        .bind(&entry.symptoms)
        .bind(entry.body_temperature)
        .bind(&entry.temperature_unit)
        .bind(entry.severity.as_str())
        .bind(entry.status.as_str())
        .bind(&entry.medications)
        .bind(&entry.notes)
        .bind(entry.recorded_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_illness(&self, entry_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM illness_entries WHERE id = $1")
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// MedicalRecordStore
//=========================================================================================

const MEDICAL_RECORD_COLUMNS: &str =
    "id, profile_id, title, record_type, record_date, provider_name, notes, tags, created_at";

const FILE_COLUMNS: &str = "id, record_id, url, mime_type, size_bytes, original_name";

impl DbAdapter {
    async fn files_for_records(&self, record_ids: &[Uuid]) -> PortResult<Vec<FileAsset>> {
        if record_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, FileAssetRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM file_assets WHERE record_id = ANY($1)"
        ))
        .bind(record_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(FileAssetRecord::to_domain).collect())
    }
}

#[async_trait]
impl MedicalRecordStore for DbAdapter {
    async fn create_medical_record(&self, record: MedicalRecord) -> PortResult<MedicalRecord> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let row = sqlx::query_as::<_, MedicalRecordRow>(&format!(
            "INSERT INTO medical_records ({MEDICAL_RECORD_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {MEDICAL_RECORD_COLUMNS}"
        ))
        .bind(record.id)
        .bind(record.profile_id)
        .bind(&record.title)
        .bind(record.record_type.as_str())
        .bind(record.record_date)
        .bind(&record.provider_name)
        .bind(&record.notes)
        .bind(&record.tags)
        .bind(record.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        for file in &record.files {
            sqlx::query(&format!(
                "INSERT INTO file_assets ({FILE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            ))
            .bind(file.id)
            .bind(row.id)
            .bind(&file.url)
            .bind(&file.mime_type)
            .bind(file.size_bytes)
            .bind(&file.original_name)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        tx.commit().await.map_err(unexpected)?;

        let files = self.files_for_records(&[record.id]).await?;
        row.to_domain(files)
    }

    async fn list_medical_records(&self, profile_id: Uuid) -> PortResult<Vec<MedicalRecord>> {
        let rows = sqlx::query_as::<_, MedicalRecordRow>(&format!(
            "SELECT {MEDICAL_RECORD_COLUMNS} FROM medical_records
             WHERE profile_id = $1 ORDER BY record_date DESC"
        ))
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut files = self.files_for_records(&ids).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let (own, rest): (Vec<FileAsset>, Vec<FileAsset>) =
                files.into_iter().partition(|f| f.record_id == row.id);
            files = rest;
            records.push(row.to_domain(own)?);
        }
        Ok(records)
    }

    async fn find_medical_record(
        &self,
        user_id: Uuid,
        record_id: Uuid,
    ) -> PortResult<Option<MedicalRecord>> {
        let row = sqlx::query_as::<_, MedicalRecordRow>(
            "SELECT r.id, r.profile_id, r.title, r.record_type, r.record_date, r.provider_name,
                    r.notes, r.tags, r.created_at
             FROM medical_records r
             JOIN profiles p ON p.id = r.profile_id
             WHERE r.id = $1 AND p.user_id = $2",
        )
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match row {
            Some(row) => {
                let files = self.files_for_records(&[row.id]).await?;
                row.to_domain(files).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn update_medical_record(&self, record: MedicalRecord) -> PortResult<MedicalRecord> {
        let row = sqlx::query_as::<_, MedicalRecordRow>(&format!(
            "UPDATE medical_records SET title = $2, record_type = $3, record_date = $4,
                    provider_name = $5, notes = $6, tags = $7
             WHERE id = $1
             RETURNING {MEDICAL_RECORD_COLUMNS}"
        ))
        .bind(record.id)
        .bind(&record.title)
        .bind(record.record_type.as_str())
        .bind(record.record_date)
        .bind(&record.provider_name)
        .bind(&record.notes)
        .bind(&record.tags)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let files = self.files_for_records(&[record.id]).await?;
        row.to_domain(files)
    }

    async fn add_record_files(&self, record_id: Uuid, files: Vec<FileAsset>) -> PortResult<()> {
        for file in files {
            sqlx::query(&format!(
                "INSERT INTO file_assets ({FILE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            ))
            .bind(file.id)
            .bind(record_id)
            .bind(&file.url)
            .bind(&file.mime_type)
            .bind(file.size_bytes)
            .bind(&file.original_name)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        }
        Ok(())
    }

    async fn remove_record_files(
        &self,
        record_id: Uuid,
        file_ids: &[Uuid],
    ) -> PortResult<Vec<FileAsset>> {
        let removed = sqlx::query_as::<_, FileAssetRecord>(&format!(
            "DELETE FROM file_assets WHERE record_id = $1 AND id = ANY($2)
             RETURNING {FILE_COLUMNS}"
        ))
        .bind(record_id)
        .bind(file_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(removed.into_iter().map(FileAssetRecord::to_domain).collect())
    }

    async fn delete_medical_record(&self, record_id: Uuid) -> PortResult<Vec<FileAsset>> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let files = sqlx::query_as::<_, FileAssetRecord>(&format!(
            "DELETE FROM file_assets WHERE record_id = $1 RETURNING {FILE_COLUMNS}"
        ))
        .bind(record_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(unexpected)?;
        sqlx::query("DELETE FROM medical_records WHERE id = $1")
            .bind(record_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(files.into_iter().map(FileAssetRecord::to_domain).collect())
    }
}

//=========================================================================================
// MedicationStore
//=========================================================================================

const MEDICATION_COLUMNS: &str = "id, profile_id, name, dosage, instructions, start_date";

const REMINDER_COLUMNS: &str = "id, profile_id, medication_id, medicine_name, unit, dosage, \
                                frequency, time, times, duration, intake_method, notes, active, \
                                created_at";

const LOG_COLUMNS: &str = "id, medication_id, occurred_at, status";

#[async_trait]
impl MedicationStore for DbAdapter {
    async fn create_medication(&self, medication: Medication) -> PortResult<Medication> {
        let record = sqlx::query_as::<_, MedicationRecord>(&format!(
            "INSERT INTO medications ({MEDICATION_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {MEDICATION_COLUMNS}"
        ))
        .bind(medication.id)
        .bind(medication.profile_id)
        .bind(&medication.name)
        .bind(&medication.dosage)
        .bind(&medication.instructions)
        .bind(medication.start_date)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_medication(&self, medication_id: Uuid) -> PortResult<Option<Medication>> {
        let record = sqlx::query_as::<_, MedicationRecord>(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = $1"
        ))
        .bind(medication_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(MedicationRecord::to_domain))
    }

    async fn update_medication(&self, medication: Medication) -> PortResult<Medication> {
        let record = sqlx::query_as::<_, MedicationRecord>(&format!(
            "UPDATE medications SET name = $2, dosage = $3, instructions = $4, start_date = $5
             WHERE id = $1
             RETURNING {MEDICATION_COLUMNS}"
        ))
        .bind(medication.id)
        .bind(&medication.name)
        .bind(&medication.dosage)
        .bind(&medication.instructions)
        .bind(medication.start_date)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_medication(&self, medication_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM medications WHERE id = $1")
            .bind(medication_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_reminder(&self, reminder: MedicineReminder) -> PortResult<MedicineReminder> {
        let record = sqlx::query_as::<_, ReminderRecord>(&format!(
            "INSERT INTO medicine_reminders ({REMINDER_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(reminder.id)
        .bind(reminder.profile_id)
        .bind(reminder.medication_id)
        .bind(&reminder.medicine_name)
        .bind(&reminder.unit)
        .bind(reminder.dosage)
        .bind(&reminder.frequency)
        .bind(&reminder.time)
        .bind(&reminder.times)
        .bind(&reminder.duration)
        .bind(&reminder.intake_method)
        .bind(&reminder.notes)
        .bind(reminder.active)
        .bind(reminder.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_reminders(&self, profile_id: Uuid) -> PortResult<Vec<MedicineReminder>> {
        let records = sqlx::query_as::<_, ReminderRecord>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM medicine_reminders
             WHERE profile_id = $1 ORDER BY created_at DESC"
        ))
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ReminderRecord::to_domain).collect())
    }

    async fn find_reminder(
        &self,
        user_id: Uuid,
        reminder_id: Uuid,
    ) -> PortResult<Option<MedicineReminder>> {
        let record = sqlx::query_as::<_, ReminderRecord>(
            "SELECT r.id, r.profile_id, r.medication_id, r.medicine_name, r.unit, r.dosage,
                    r.frequency, r.time, r.times, r.duration, r.intake_method, r.notes,
                    r.active, r.created_at
             FROM medicine_reminders r
             JOIN profiles p ON p.id = r.profile_id
             WHERE r.id = $1 AND p.user_id = $2",
        )
        .bind(reminder_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(ReminderRecord::to_domain))
    }

    async fn update_reminder(&self, reminder: MedicineReminder) -> PortResult<MedicineReminder> {
        let record = sqlx::query_as::<_, ReminderRecord>(&format!(
            "UPDATE medicine_reminders SET medicine_name = $2, unit = $3, dosage = $4,
                    frequency = $5, time = $6, times = $7, duration = $8, intake_method = $9,
                    notes = $10, active = $11
             WHERE id = $1
             RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(reminder.id)
        .bind(&reminder.medicine_name)
        .bind(&reminder.unit)
        .bind(reminder.dosage)
        .bind(&reminder.frequency)
        .bind(&reminder.time)
        .bind(&reminder.times)
        .bind(&reminder.duration)
        .bind(&reminder.intake_method)
        .bind(&reminder.notes)
        .bind(reminder.active)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_reminder(&self, reminder_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM medicine_reminders WHERE id = $1")
            .bind(reminder_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn logs_between(
        &self,
        medication_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<MedicationLog>> {
        let records = sqlx::query_as::<_, LogRecord>(&format!(
            "SELECT {LOG_COLUMNS} FROM medication_logs
             WHERE medication_id = $1 AND occurred_at >= $2 AND occurred_at <= $3
             ORDER BY occurred_at ASC"
        ))
        .bind(medication_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(LogRecord::to_domain).collect()
    }

    async fn insert_log(&self, log: MedicationLog) -> PortResult<MedicationLog> {
        // The unique (medication_id, occurred_at) index makes concurrent
        // backfills race-safe: the loser adopts the winner's row.
        let inserted = sqlx::query_as::<_, LogRecord>(&format!(
            "INSERT INTO medication_logs ({LOG_COLUMNS}) VALUES ($1, $2, $3, $4)
             ON CONFLICT (medication_id, occurred_at) DO NOTHING
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(log.id)
        .bind(log.medication_id)
        .bind(log.occurred_at)
        .bind(log.status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match inserted {
            Some(record) => record.to_domain(),
            None => {
                let existing = sqlx::query_as::<_, LogRecord>(&format!(
                    "SELECT {LOG_COLUMNS} FROM medication_logs
                     WHERE medication_id = $1 AND occurred_at = $2"
                ))
                .bind(log.medication_id)
                .bind(log.occurred_at)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
                existing.to_domain()
            }
        }
    }

    async fn update_log_status(
        &self,
        log_id: Uuid,
        status: LogStatus,
    ) -> PortResult<MedicationLog> {
        let record = sqlx::query_as::<_, LogRecord>(&format!(
            "UPDATE medication_logs SET status = $2 WHERE id = $1 RETURNING {LOG_COLUMNS}"
        ))
        .bind(log_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_log(&self, log_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM medication_logs WHERE id = $1")
            .bind(log_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// VehicleStore
//=========================================================================================

const VEHICLE_COLUMNS: &str = "id, user_id, make, model, year, color, license_plate, \
                               registration_expiry_date, vin, vehicle_type, purchase_date, \
                               current_mileage, image_url, notes, created_at";

const MAINTENANCE_COLUMNS: &str = "id, vehicle_id, maintenance_type, title, description, \
                                   service_date, mileage_at_service, serviced_by, location, \
                                   cost, currency, parts_used, labor_hours, receipt_url, tags, \
                                   created_at";

const VEHICLE_REMINDER_COLUMNS: &str = "id, vehicle_id, maintenance_type, title, description, \
                                        due_date, due_mileage, notify_in_advance, completed, \
                                        completed_at, active, created_at";

#[async_trait]
impl VehicleStore for DbAdapter {
    async fn create_vehicle(&self, vehicle: Vehicle) -> PortResult<Vehicle> {
        let record = sqlx::query_as::<_, VehicleRecord>(&format!(
            "INSERT INTO vehicles ({VEHICLE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(vehicle.id)
        .bind(vehicle.user_id)
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(&vehicle.color)
        .bind(&vehicle.license_plate)
        .bind(vehicle.registration_expiry_date)
        .bind(&vehicle.vin)
        .bind(&vehicle.vehicle_type)
        .bind(vehicle.purchase_date)
        .bind(vehicle.current_mileage)
        .bind(&vehicle.image_url)
        .bind(&vehicle.notes)
        .bind(vehicle.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_vehicles(&self, user_id: Uuid) -> PortResult<Vec<Vehicle>> {
        let records = sqlx::query_as::<_, VehicleRecord>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(VehicleRecord::to_domain).collect())
    }

    async fn find_vehicle(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<Option<Vehicle>> {
        let record = sqlx::query_as::<_, VehicleRecord>(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 AND user_id = $2"
        ))
        .bind(vehicle_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(VehicleRecord::to_domain))
    }

    async fn update_vehicle(&self, vehicle: Vehicle) -> PortResult<Vehicle> {
        let record = sqlx::query_as::<_, VehicleRecord>(&format!(
            "UPDATE vehicles SET make = $2, model = $3, year = $4, color = $5,
                    license_plate = $6, registration_expiry_date = $7, vin = $8,
                    vehicle_type = $9, purchase_date = $10, current_mileage = $11,
                    image_url = $12, notes = $13
             WHERE id = $1
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(vehicle.id)
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(&vehicle.color)
        .bind(&vehicle.license_plate)
        .bind(vehicle.registration_expiry_date)
        .bind(&vehicle.vin)
        .bind(&vehicle.vehicle_type)
        .bind(vehicle.purchase_date)
        .bind(vehicle.current_mileage)
        .bind(&vehicle.image_url)
        .bind(&vehicle.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn owned_vehicle_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM vehicles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn create_maintenance_record(
        &self,
        record: MaintenanceRecord,
    ) -> PortResult<MaintenanceRecord> {
        let row = sqlx::query_as::<_, MaintenanceRecordRow>(&format!(
            "INSERT INTO maintenance_records ({MAINTENANCE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             RETURNING {MAINTENANCE_COLUMNS}"
        ))
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(&record.maintenance_type)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.service_date)
        .bind(record.mileage_at_service)
        .bind(&record.serviced_by)
        .bind(&record.location)
        .bind(record.cost)
        .bind(&record.currency)
        .bind(&record.parts_used)
        .bind(record.labor_hours)
        .bind(&record.receipt_url)
        .bind(&record.tags)
        .bind(record.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.to_domain())
    }

    async fn list_maintenance_records(
        &self,
        vehicle_ids: &[Uuid],
        search: Option<&str>,
    ) -> PortResult<Vec<MaintenanceRecord>> {
        let rows = match search {
            Some(term) => {
                let pattern = format!("%{}%", term);
                sqlx::query_as::<_, MaintenanceRecordRow>(&format!(
                    "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records
                     WHERE vehicle_id = ANY($1)
                       AND (maintenance_type ILIKE $2 OR title ILIKE $2
                            OR description ILIKE $2)
                     ORDER BY service_date DESC"
                ))
                .bind(vehicle_ids)
                .bind(pattern)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, MaintenanceRecordRow>(&format!(
                    "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records
                     WHERE vehicle_id = ANY($1)
                     ORDER BY service_date DESC"
                ))
                .bind(vehicle_ids)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(MaintenanceRecordRow::to_domain).collect())
    }

    async fn find_maintenance_record(
        &self,
        user_id: Uuid,
        record_id: Uuid,
    ) -> PortResult<Option<MaintenanceRecord>> {
        let row = sqlx::query_as::<_, MaintenanceRecordRow>(
            "SELECT m.id, m.vehicle_id, m.maintenance_type, m.title, m.description,
                    m.service_date, m.mileage_at_service, m.serviced_by, m.location, m.cost,
                    m.currency, m.parts_used, m.labor_hours, m.receipt_url, m.tags, m.created_at
             FROM maintenance_records m
             JOIN vehicles v ON v.id = m.vehicle_id
             WHERE m.id = $1 AND v.user_id = $2",
        )
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(row.map(MaintenanceRecordRow::to_domain))
    }

    async fn delete_maintenance_record(&self, record_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM maintenance_records WHERE id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_vehicle_reminder(
        &self,
        reminder: VehicleReminder,
    ) -> PortResult<VehicleReminder> {
        let record = sqlx::query_as::<_, VehicleReminderRecord>(&format!(
            "INSERT INTO vehicle_reminders ({VEHICLE_REMINDER_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {VEHICLE_REMINDER_COLUMNS}"
        ))
        .bind(reminder.id)
        .bind(reminder.vehicle_id)
        .bind(&reminder.maintenance_type)
        .bind(&reminder.title)
        .bind(&reminder.description)
        .bind(reminder.due_date)
        .bind(reminder.due_mileage)
        .bind(reminder.notify_in_advance)
        .bind(reminder.completed)
        .bind(reminder.completed_at)
        .bind(reminder.active)
        .bind(reminder.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_vehicle_reminders(
        &self,
        vehicle_ids: &[Uuid],
    ) -> PortResult<Vec<VehicleReminder>> {
        let records = sqlx::query_as::<_, VehicleReminderRecord>(&format!(
            "SELECT {VEHICLE_REMINDER_COLUMNS} FROM vehicle_reminders
             WHERE vehicle_id = ANY($1)
             ORDER BY due_date ASC NULLS LAST, created_at DESC"
        ))
        .bind(vehicle_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(VehicleReminderRecord::to_domain)
            .collect())
    }

    async fn find_vehicle_reminder(
        &self,
        user_id: Uuid,
        reminder_id: Uuid,
    ) -> PortResult<Option<VehicleReminder>> {
        let record = sqlx::query_as::<_, VehicleReminderRecord>(
            "SELECT r.id, r.vehicle_id, r.maintenance_type, r.title, r.description, r.due_date,
                    r.due_mileage, r.notify_in_advance, r.completed, r.completed_at, r.active,
                    r.created_at
             FROM vehicle_reminders r
             JOIN vehicles v ON v.id = r.vehicle_id
             WHERE r.id = $1 AND v.user_id = $2",
        )
        .bind(reminder_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(VehicleReminderRecord::to_domain))
    }

    async fn update_vehicle_reminder(
        &self,
        reminder: VehicleReminder,
    ) -> PortResult<VehicleReminder> {
        let record = sqlx::query_as::<_, VehicleReminderRecord>(&format!(
            "UPDATE vehicle_reminders SET maintenance_type = $2, title = $3, description = $4,
                    due_date = $5, due_mileage = $6, notify_in_advance = $7, completed = $8,
                    completed_at = $9, active = $10
             WHERE id = $1
             RETURNING {VEHICLE_REMINDER_COLUMNS}"
        ))
        .bind(reminder.id)
        .bind(&reminder.maintenance_type)
        .bind(&reminder.title)
        .bind(&reminder.description)
        .bind(reminder.due_date)
        .bind(reminder.due_mileage)
        .bind(reminder.notify_in_advance)
        .bind(reminder.completed)
        .bind(reminder.completed_at)
        .bind(reminder.active)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_vehicle_reminder(&self, reminder_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM vehicle_reminders WHERE id = $1")
            .bind(reminder_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// ExpenseStore
//=========================================================================================

const EXPENSE_COLUMNS: &str = "id, user_id, title, description, amount, currency, expense_date, \
                               category_id, subcategory, tags, payment_method, payment_account, \
                               vendor, location, receipt_url, notes, is_recurring, frequency, \
                               recurring_until, created_at";

const CATEGORY_COLUMNS: &str = "id, user_id, name, color, icon, is_default, created_at";

const BUDGET_COLUMNS: &str = "id, user_id, name, amount, currency, start_date, end_date, \
                              category_id, spent, alert_threshold, alert_enabled, active, \
                              created_at";

const GOAL_COLUMNS: &str = "id, user_id, title, description, target_amount, current_amount, \
                            currency, target_date, color, icon, completed, completed_at, \
                            created_at";

const SCHEDULE_COLUMNS: &str = "id, user_id, expense_id, title, amount, currency, start_date, \
                                end_date, frequency, next_run_at, last_run_at, active, created_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, title, description, amount, currency, \
                                    billing_cycle, next_billing_date, last_billed_at, \
                                    category_id, vendor, payment_method, payment_account, \
                                    active, auto_pay, cancel_at, notes, created_at";

const ACCOUNT_COLUMNS: &str = "id, user_id, name, institution, kind, currency, balance, \
                               is_default, archived, notes, created_at";

const CURRENCY_COLUMNS: &str = "id, user_id, code, name, symbol, is_default, created_at";

/// Adds `amount` to the `spent` total of every active budget whose window
/// covers `expense_date`. With a category: that category's budgets plus
/// uncategorized ones. With an explicit budget id: only that budget.
async fn bump_budget_spent(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    amount: f64,
    expense_date: DateTime<Utc>,
    category_id: Option<Uuid>,
    budget_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    match budget_id {
        Some(id) => {
            sqlx::query(
                "UPDATE budgets SET spent = spent + $1
                 WHERE id = $2 AND user_id = $3 AND active = TRUE
                   AND start_date <= $4 AND end_date >= $4",
            )
            .bind(amount)
            .bind(id)
            .bind(user_id)
            .bind(expense_date)
            .execute(&mut **tx)
            .await?;
        }
        None => {
            sqlx::query(
                "UPDATE budgets SET spent = spent + $1
                 WHERE user_id = $2 AND active = TRUE
                   AND start_date <= $3 AND end_date >= $3
                   AND (category_id IS NULL OR category_id = $4)",
            )
            .bind(amount)
            .bind(user_id)
            .bind(expense_date)
            .bind(category_id)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

async fn insert_expense_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    expense: &Expense,
) -> Result<ExpenseRecord, sqlx::Error> {
    sqlx::query_as::<_, ExpenseRecord>(&format!(
        "INSERT INTO expenses ({EXPENSE_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                 $18, $19, $20)
         RETURNING {EXPENSE_COLUMNS}"
    ))
    .bind(expense.id)
    .bind(expense.user_id)
    .bind(&expense.title)
    .bind(&expense.description)
    .bind(expense.amount)
    .bind(&expense.currency)
    .bind(expense.expense_date)
    .bind(expense.category_id)
    .bind(&expense.subcategory)
    .bind(&expense.tags)
    .bind(expense.payment_method.as_str())
    .bind(&expense.payment_account)
    .bind(&expense.vendor)
    .bind(&expense.location)
    .bind(&expense.receipt_url)
    .bind(&expense.notes)
    .bind(expense.is_recurring)
    .bind(expense.frequency.as_str())
    .bind(expense.recurring_until)
    .bind(expense.created_at)
    .fetch_one(&mut **tx)
    .await
}

#[async_trait]
impl ExpenseStore for DbAdapter {
    async fn list_expenses(
        &self,
        user_id: Uuid,
        filter: ExpenseFilter,
    ) -> PortResult<Vec<Expense>> {
        let records = sqlx::query_as::<_, ExpenseRecord>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE user_id = $1
               AND ($2::uuid IS NULL OR category_id = $2)
               AND ($3::timestamptz IS NULL OR expense_date >= $3)
               AND ($4::timestamptz IS NULL OR expense_date <= $4)
               AND ($5::boolean IS NULL OR is_recurring = $5)
             ORDER BY expense_date DESC"
        ))
        .bind(user_id)
        .bind(filter.category_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.is_recurring)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ExpenseRecord::to_domain).collect()
    }

    async fn find_expense(&self, user_id: Uuid, expense_id: Uuid) -> PortResult<Option<Expense>> {
        let record = sqlx::query_as::<_, ExpenseRecord>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2"
        ))
        .bind(expense_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ExpenseRecord::to_domain).transpose()
    }

    async fn create_expense(
        &self,
        expense: Expense,
        budget_id: Option<Uuid>,
    ) -> PortResult<Expense> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let record = insert_expense_row(&mut tx, &expense).await.map_err(unexpected)?;
        bump_budget_spent(
            &mut tx,
            expense.user_id,
            expense.amount,
            expense.expense_date,
            expense.category_id,
            budget_id,
        )
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_expense(&self, expense: Expense) -> PortResult<Expense> {
        let record = sqlx::query_as::<_, ExpenseRecord>(&format!(
            "UPDATE expenses SET title = $2, description = $3, amount = $4, currency = $5,
                    expense_date = $6, category_id = $7, subcategory = $8, tags = $9,
                    payment_method = $10, payment_account = $11, vendor = $12, location = $13,
                    receipt_url = $14, notes = $15, is_recurring = $16, frequency = $17,
                    recurring_until = $18
             WHERE id = $1
             RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(expense.id)
        .bind(&expense.title)
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(&expense.currency)
        .bind(expense.expense_date)
        .bind(expense.category_id)
        .bind(&expense.subcategory)
        .bind(&expense.tags)
        .bind(expense.payment_method.as_str())
        .bind(&expense.payment_account)
        .bind(&expense.vendor)
        .bind(&expense.location)
        .bind(&expense.receipt_url)
        .bind(&expense.notes)
        .bind(expense.is_recurring)
        .bind(expense.frequency.as_str())
        .bind(expense.recurring_until)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_expense(&self, expense: &Expense) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        if expense.amount > 0.0 {
            // Roll the amount back out, never below zero.
            sqlx::query(
                "UPDATE budgets SET spent = GREATEST(0, spent - $1)
                 WHERE user_id = $2 AND active = TRUE
                   AND start_date <= $3 AND end_date >= $3
                   AND (category_id IS NULL OR category_id = $4)",
            )
            .bind(expense.amount)
            .bind(expense.user_id)
            .bind(expense.expense_date)
            .bind(expense.category_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(expense.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn sum_expenses(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category_id: Option<Uuid>,
    ) -> PortResult<f64> {
        let (total,): (Option<f64>,) = sqlx::query_as(
            "SELECT SUM(amount) FROM expenses
             WHERE user_id = $1 AND expense_date >= $2 AND expense_date <= $3
               AND ($4::uuid IS NULL OR category_id = $4)",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(total.unwrap_or(0.0))
    }

    async fn list_categories(&self, user_id: Uuid) -> PortResult<Vec<ExpenseCategory>> {
        let records = sqlx::query_as::<_, CategoryRecord>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM expense_categories
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CategoryRecord::to_domain).collect())
    }

    async fn find_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> PortResult<Option<ExpenseCategory>> {
        let record = sqlx::query_as::<_, CategoryRecord>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM expense_categories WHERE id = $1 AND user_id = $2"
        ))
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CategoryRecord::to_domain))
    }

    async fn create_category(&self, category: ExpenseCategory) -> PortResult<ExpenseCategory> {
        let record = sqlx::query_as::<_, CategoryRecord>(&format!(
            "INSERT INTO expense_categories ({CATEGORY_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(category.id)
        .bind(category.user_id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.icon)
        .bind(category.is_default)
        .bind(category.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_category(&self, category: ExpenseCategory) -> PortResult<ExpenseCategory> {
        let record = sqlx::query_as::<_, CategoryRecord>(&format!(
            "UPDATE expense_categories SET name = $2, color = $3, icon = $4, is_default = $5
             WHERE id = $1
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.icon)
        .bind(category.is_default)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_category(&self, category_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM expense_categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_budgets(&self, user_id: Uuid) -> PortResult<Vec<Budget>> {
        let records = sqlx::query_as::<_, BudgetRecord>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE user_id = $1 ORDER BY start_date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(BudgetRecord::to_domain).collect())
    }

    async fn find_budget(&self, user_id: Uuid, budget_id: Uuid) -> PortResult<Option<Budget>> {
        let record = sqlx::query_as::<_, BudgetRecord>(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets WHERE id = $1 AND user_id = $2"
        ))
        .bind(budget_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(BudgetRecord::to_domain))
    }

    async fn create_budget(&self, budget: Budget) -> PortResult<Budget> {
        let record = sqlx::query_as::<_, BudgetRecord>(&format!(
            "INSERT INTO budgets ({BUDGET_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {BUDGET_COLUMNS}"
        ))
        .bind(budget.id)
        .bind(budget.user_id)
        .bind(&budget.name)
        .bind(budget.amount)
        .bind(&budget.currency)
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.category_id)
        .bind(budget.spent)
        .bind(budget.alert_threshold)
        .bind(budget.alert_enabled)
        .bind(budget.active)
        .bind(budget.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_budget(&self, budget: Budget) -> PortResult<Budget> {
        let record = sqlx::query_as::<_, BudgetRecord>(&format!(
            "UPDATE budgets SET name = $2, amount = $3, currency = $4, start_date = $5,
                    end_date = $6, category_id = $7, alert_threshold = $8, alert_enabled = $9,
                    active = $10
             WHERE id = $1
             RETURNING {BUDGET_COLUMNS}"
        ))
        .bind(budget.id)
        .bind(&budget.name)
        .bind(budget.amount)
        .bind(&budget.currency)
        .bind(budget.start_date)
        .bind(budget.end_date)
        .bind(budget.category_id)
        .bind(budget.alert_threshold)
        .bind(budget.alert_enabled)
        .bind(budget.active)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_budget(&self, budget_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM budgets WHERE id = $1")
            .bind(budget_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_goals(&self, user_id: Uuid) -> PortResult<Vec<FinancialGoal>> {
        let records = sqlx::query_as::<_, GoalRecord>(&format!(
            "SELECT {GOAL_COLUMNS} FROM financial_goals
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(GoalRecord::to_domain).collect())
    }

    async fn find_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<Option<FinancialGoal>> {
        let record = sqlx::query_as::<_, GoalRecord>(&format!(
            "SELECT {GOAL_COLUMNS} FROM financial_goals WHERE id = $1 AND user_id = $2"
        ))
        .bind(goal_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(GoalRecord::to_domain))
    }

    async fn create_goal(&self, goal: FinancialGoal) -> PortResult<FinancialGoal> {
        let record = sqlx::query_as::<_, GoalRecord>(&format!(
            "INSERT INTO financial_goals ({GOAL_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {GOAL_COLUMNS}"
        ))
        .bind(goal.id)
        .bind(goal.user_id)
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.target_amount)
        .bind(goal.current_amount)
        .bind(&goal.currency)
        .bind(goal.target_date)
        .bind(&goal.color)
        .bind(&goal.icon)
        .bind(goal.completed)
        .bind(goal.completed_at)
        .bind(goal.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_goal(&self, goal: FinancialGoal) -> PortResult<FinancialGoal> {
        let record = sqlx::query_as::<_, GoalRecord>(&format!(
            "UPDATE financial_goals SET title = $2, description = $3, target_amount = $4,
                    current_amount = $5, currency = $6, target_date = $7, color = $8, icon = $9,
                    completed = $10, completed_at = $11
             WHERE id = $1
             RETURNING {GOAL_COLUMNS}"
        ))
        .bind(goal.id)
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.target_amount)
        .bind(goal.current_amount)
        .bind(&goal.currency)
        .bind(goal.target_date)
        .bind(&goal.color)
        .bind(&goal.icon)
        .bind(goal.completed)
        .bind(goal.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM financial_goals WHERE id = $1")
            .bind(goal_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_schedules(&self, user_id: Uuid) -> PortResult<Vec<ExpenseSchedule>> {
        let records = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM expense_schedules
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ScheduleRecord::to_domain).collect()
    }

    async fn find_schedule(
        &self,
        user_id: Uuid,
        schedule_id: Uuid,
    ) -> PortResult<Option<ExpenseSchedule>> {
        let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM expense_schedules WHERE id = $1 AND user_id = $2"
        ))
        .bind(schedule_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ScheduleRecord::to_domain).transpose()
    }

    async fn create_schedule(&self, schedule: ExpenseSchedule) -> PortResult<ExpenseSchedule> {
        let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "INSERT INTO expense_schedules ({SCHEDULE_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(schedule.id)
        .bind(schedule.user_id)
        .bind(schedule.expense_id)
        .bind(&schedule.title)
        .bind(schedule.amount)
        .bind(&schedule.currency)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.frequency.as_str())
        .bind(schedule.next_run_at)
        .bind(schedule.last_run_at)
        .bind(schedule.active)
        .bind(schedule.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_schedule(&self, schedule: ExpenseSchedule) -> PortResult<ExpenseSchedule> {
        let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
            "UPDATE expense_schedules SET expense_id = $2, title = $3, amount = $4,
                    currency = $5, start_date = $6, end_date = $7, frequency = $8,
                    next_run_at = $9, last_run_at = $10, active = $11
             WHERE id = $1
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(schedule.id)
        .bind(schedule.expense_id)
        .bind(&schedule.title)
        .bind(schedule.amount)
        .bind(&schedule.currency)
        .bind(schedule.start_date)
        .bind(schedule.end_date)
        .bind(schedule.frequency.as_str())
        .bind(schedule.next_run_at)
        .bind(schedule.last_run_at)
        .bind(schedule.active)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_schedule(&self, schedule_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM expense_schedules WHERE id = $1")
            .bind(schedule_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_schedule_paid(
        &self,
        schedule: &ExpenseSchedule,
        expense: Expense,
        follow_up: Option<ExpenseSchedule>,
    ) -> PortResult<(Expense, Option<ExpenseSchedule>)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let expense_record = insert_expense_row(&mut tx, &expense).await.map_err(unexpected)?;
        bump_budget_spent(
            &mut tx,
            expense.user_id,
            expense.amount,
            expense.expense_date,
            expense.category_id,
            None,
        )
        .await
        .map_err(unexpected)?;

        sqlx::query("DELETE FROM expense_schedules WHERE id = $1")
            .bind(schedule.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let next = match &follow_up {
            Some(next) => {
                let record = sqlx::query_as::<_, ScheduleRecord>(&format!(
                    "INSERT INTO expense_schedules ({SCHEDULE_COLUMNS})
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                     RETURNING {SCHEDULE_COLUMNS}"
                ))
                .bind(next.id)
                .bind(next.user_id)
                .bind(next.expense_id)
                .bind(&next.title)
                .bind(next.amount)
                .bind(&next.currency)
                .bind(next.start_date)
                .bind(next.end_date)
                .bind(next.frequency.as_str())
                .bind(next.next_run_at)
                .bind(next.last_run_at)
                .bind(next.active)
                .bind(next.created_at)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
                Some(record.to_domain()?)
            }
            None => None,
        };
        tx.commit().await.map_err(unexpected)?;
        Ok((expense_record.to_domain()?, next))
    }

    async fn list_subscriptions(&self, user_id: Uuid) -> PortResult<Vec<Subscription>> {
        let records = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
             WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records
            .into_iter()
            .map(SubscriptionRecord::to_domain)
            .collect()
    }

    async fn find_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> PortResult<Option<Subscription>> {
        let record = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1 AND user_id = $2"
        ))
        .bind(subscription_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(SubscriptionRecord::to_domain).transpose()
    }

    async fn create_subscription(&self, subscription: Subscription) -> PortResult<Subscription> {
        let record = insert_subscription_row(&self.pool, &subscription)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn update_subscription(&self, subscription: Subscription) -> PortResult<Subscription> {
        let record = sqlx::query_as::<_, SubscriptionRecord>(&format!(
            "UPDATE subscriptions SET title = $2, description = $3, amount = $4, currency = $5,
                    billing_cycle = $6, next_billing_date = $7, last_billed_at = $8,
                    category_id = $9, vendor = $10, payment_method = $11, payment_account = $12,
                    active = $13, auto_pay = $14, cancel_at = $15, notes = $16
             WHERE id = $1
             RETURNING {SUBSCRIPTION_COLUMNS}"
        ))
        .bind(subscription.id)
        .bind(&subscription.title)
        .bind(&subscription.description)
        .bind(subscription.amount)
        .bind(&subscription.currency)
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.next_billing_date)
        .bind(subscription.last_billed_at)
        .bind(subscription.category_id)
        .bind(&subscription.vendor)
        .bind(subscription.payment_method.as_str())
        .bind(&subscription.payment_account)
        .bind(subscription.active)
        .bind(subscription.auto_pay)
        .bind(subscription.cancel_at)
        .bind(&subscription.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_subscription(&self, subscription_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(subscription_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn mark_subscription_paid(
        &self,
        subscription: &Subscription,
        expense: Expense,
        successor: Subscription,
    ) -> PortResult<(Expense, Subscription)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let expense_record = insert_expense_row(&mut tx, &expense).await.map_err(unexpected)?;
        bump_budget_spent(
            &mut tx,
            expense.user_id,
            expense.amount,
            expense.expense_date,
            subscription.category_id,
            None,
        )
        .await
        .map_err(unexpected)?;

        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(subscription.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        let successor_record = insert_subscription_row(&mut *tx, &successor)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok((expense_record.to_domain()?, successor_record.to_domain()?))
    }

    async fn list_accounts(&self, user_id: Uuid) -> PortResult<Vec<Account>> {
        let records = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE user_id = $1 AND archived = FALSE ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(AccountRecord::to_domain).collect())
    }

    async fn find_account(&self, user_id: Uuid, account_id: Uuid) -> PortResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 AND user_id = $2"
        ))
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(AccountRecord::to_domain))
    }

    async fn create_account(&self, account: Account) -> PortResult<Account> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        if account.is_default {
            sqlx::query(
                "UPDATE accounts SET is_default = FALSE WHERE user_id = $1 AND is_default",
            )
            .bind(account.user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account.id)
        .bind(account.user_id)
        .bind(&account.name)
        .bind(&account.institution)
        .bind(&account.kind)
        .bind(&account.currency)
        .bind(account.balance)
        .bind(account.is_default)
        .bind(account.archived)
        .bind(&account.notes)
        .bind(account.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_account(&self, account: Account) -> PortResult<Account> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        if account.is_default {
            sqlx::query(
                "UPDATE accounts SET is_default = FALSE
                 WHERE user_id = $1 AND is_default AND id <> $2",
            )
            .bind(account.user_id)
            .bind(account.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "UPDATE accounts SET name = $2, institution = $3, kind = $4, currency = $5,
                    balance = $6, is_default = $7, archived = $8, notes = $9
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.institution)
        .bind(&account.kind)
        .bind(&account.currency)
        .bind(account.balance)
        .bind(account.is_default)
        .bind(account.archived)
        .bind(&account.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_account(&self, account_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_currencies(&self, user_id: Uuid) -> PortResult<Vec<UserCurrency>> {
        let records = sqlx::query_as::<_, CurrencyRecord>(&format!(
            "SELECT {CURRENCY_COLUMNS} FROM user_currencies
             WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(CurrencyRecord::to_domain).collect())
    }

    async fn find_currency(
        &self,
        user_id: Uuid,
        currency_id: Uuid,
    ) -> PortResult<Option<UserCurrency>> {
        let record = sqlx::query_as::<_, CurrencyRecord>(&format!(
            "SELECT {CURRENCY_COLUMNS} FROM user_currencies WHERE id = $1 AND user_id = $2"
        ))
        .bind(currency_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.map(CurrencyRecord::to_domain))
    }

    async fn create_currency(&self, currency: UserCurrency) -> PortResult<UserCurrency> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        if currency.is_default {
            sqlx::query(
                "UPDATE user_currencies SET is_default = FALSE WHERE user_id = $1 AND is_default",
            )
            .bind(currency.user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        let record = sqlx::query_as::<_, CurrencyRecord>(&format!(
            "INSERT INTO user_currencies ({CURRENCY_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CURRENCY_COLUMNS}"
        ))
        .bind(currency.id)
        .bind(currency.user_id)
        .bind(&currency.code)
        .bind(&currency.name)
        .bind(&currency.symbol)
        .bind(currency.is_default)
        .bind(currency.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_currency(&self, currency: UserCurrency) -> PortResult<UserCurrency> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        if currency.is_default {
            sqlx::query(
                "UPDATE user_currencies SET is_default = FALSE
                 WHERE user_id = $1 AND is_default AND id <> $2",
            )
            .bind(currency.user_id)
            .bind(currency.id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }
        let record = sqlx::query_as::<_, CurrencyRecord>(&format!(
            "UPDATE user_currencies SET code = $2, name = $3, symbol = $4, is_default = $5
             WHERE id = $1
             RETURNING {CURRENCY_COLUMNS}"
        ))
        .bind(currency.id)
        .bind(&currency.code)
        .bind(&currency.name)
        .bind(&currency.symbol)
        .bind(currency.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn delete_currency(&self, currency_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM user_currencies WHERE id = $1")
            .bind(currency_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

async fn insert_subscription_row<'e, E>(
    executor: E,
    subscription: &Subscription,
) -> Result<SubscriptionRecord, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_as::<_, SubscriptionRecord>(&format!(
        "INSERT INTO subscriptions ({SUBSCRIPTION_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
         RETURNING {SUBSCRIPTION_COLUMNS}"
    ))
    .bind(subscription.id)
    .bind(subscription.user_id)
    .bind(&subscription.title)
    .bind(&subscription.description)
    .bind(subscription.amount)
    .bind(&subscription.currency)
    .bind(subscription.billing_cycle.as_str())
    .bind(subscription.next_billing_date)
    .bind(subscription.last_billed_at)
    .bind(subscription.category_id)
    .bind(&subscription.vendor)
    .bind(subscription.payment_method.as_str())
    .bind(&subscription.payment_account)
    .bind(subscription.active)
    .bind(subscription.auto_pay)
    .bind(subscription.cancel_at)
    .bind(&subscription.notes)
    .bind(subscription.created_at)
    .fetch_one(executor)
    .await
}
