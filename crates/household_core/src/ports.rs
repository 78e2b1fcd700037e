//! crates/household_core/src/ports.rs
//!
//! Service contracts (traits) at the boundary of the core. The api service
//! provides the concrete implementations (PostgreSQL, local disk, system
//! clock); tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, Budget, Expense, ExpenseCategory, ExpenseSchedule, FileAsset, FinancialGoal,
    IllnessEntry, LogStatus, MaintenanceRecord, MedicalRecord, Medication, MedicationLog,
    MedicineReminder, Profile, Subscription, User, UserCredentials, UserCurrency, VehicleReminder,
    Vehicle, VitalEntry, VitalKind,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations, abstracting away the
/// specific failures of the backing services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Capabilities
//=========================================================================================

/// The wall clock as a capability, so "now" can be fixed in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Attachment storage. Returns public URLs that the HTTP layer serves.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists `bytes` under the given folder and returns the public URL.
    async fn save(&self, folder: &str, original_name: &str, bytes: &[u8]) -> PortResult<String>;

    /// Removes a previously stored file. Missing files are not an error.
    async fn remove(&self, url: &str) -> PortResult<()>;
}

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a bearer token to its user id; expired or unknown tokens
    /// fail with `Unauthorized`.
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, token: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create_profile(&self, profile: Profile) -> PortResult<Profile>;

    async fn list_profiles(&self, user_id: Uuid) -> PortResult<Vec<Profile>>;

    /// With an id: that profile, if owned by the user. Without: the user's
    /// oldest profile. `None` when nothing matches.
    async fn find_profile(
        &self,
        user_id: Uuid,
        profile_id: Option<Uuid>,
    ) -> PortResult<Option<Profile>>;
}

#[async_trait]
pub trait VitalsStore: Send + Sync {
    async fn create_vital(&self, entry: VitalEntry) -> PortResult<VitalEntry>;

    async fn list_vitals(&self, profile_id: Uuid, kind: VitalKind) -> PortResult<Vec<VitalEntry>>;

    async fn find_vital(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<Option<VitalEntry>>;

    async fn update_vital(&self, entry: VitalEntry) -> PortResult<VitalEntry>;

    async fn create_illness(&self, entry: IllnessEntry) -> PortResult<IllnessEntry>;

    async fn list_illnesses(&self, profile_id: Uuid) -> PortResult<Vec<IllnessEntry>>;

    async fn find_illness(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
    ) -> PortResult<Option<IllnessEntry>>;

    async fn update_illness(&self, entry: IllnessEntry) -> PortResult<IllnessEntry>;

    async fn delete_illness(&self, entry_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait MedicalRecordStore: Send + Sync {
    /// Inserts the record together with any attached files.
    async fn create_medical_record(&self, record: MedicalRecord) -> PortResult<MedicalRecord>;

    async fn list_medical_records(&self, profile_id: Uuid) -> PortResult<Vec<MedicalRecord>>;

    async fn find_medical_record(
        &self,
        user_id: Uuid,
        record_id: Uuid,
    ) -> PortResult<Option<MedicalRecord>>;

    /// Updates record fields only; attachments are managed separately.
    async fn update_medical_record(&self, record: MedicalRecord) -> PortResult<MedicalRecord>;

    async fn add_record_files(&self, record_id: Uuid, files: Vec<FileAsset>) -> PortResult<()>;

    /// Deletes the named attachments and returns them so the caller can
    /// remove the stored bytes.
    async fn remove_record_files(
        &self,
        record_id: Uuid,
        file_ids: &[Uuid],
    ) -> PortResult<Vec<FileAsset>>;

    /// Deletes the record and returns its attachments for cleanup.
    async fn delete_medical_record(&self, record_id: Uuid) -> PortResult<Vec<FileAsset>>;
}

#[async_trait]
pub trait MedicationStore: Send + Sync {
    async fn create_medication(&self, medication: Medication) -> PortResult<Medication>;

    async fn find_medication(&self, medication_id: Uuid) -> PortResult<Option<Medication>>;

    async fn update_medication(&self, medication: Medication) -> PortResult<Medication>;

    async fn delete_medication(&self, medication_id: Uuid) -> PortResult<()>;

    async fn create_reminder(&self, reminder: MedicineReminder) -> PortResult<MedicineReminder>;

    /// Newest first.
    async fn list_reminders(&self, profile_id: Uuid) -> PortResult<Vec<MedicineReminder>>;

    async fn find_reminder(
        &self,
        user_id: Uuid,
        reminder_id: Uuid,
    ) -> PortResult<Option<MedicineReminder>>;

    async fn update_reminder(&self, reminder: MedicineReminder) -> PortResult<MedicineReminder>;

    async fn delete_reminder(&self, reminder_id: Uuid) -> PortResult<()>;

    /// Logs whose `occurred_at` lies in `[start, end]`, both inclusive.
    async fn logs_between(
        &self,
        medication_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<MedicationLog>>;

    /// Inserts a log. If a row already exists at the same
    /// `(medication_id, occurred_at)` the existing row is returned
    /// unchanged; concurrent backfills therefore never duplicate.
    async fn insert_log(&self, log: MedicationLog) -> PortResult<MedicationLog>;

    async fn update_log_status(
        &self,
        log_id: Uuid,
        status: LogStatus,
    ) -> PortResult<MedicationLog>;

    async fn delete_log(&self, log_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait VehicleStore: Send + Sync {
    async fn create_vehicle(&self, vehicle: Vehicle) -> PortResult<Vehicle>;

    async fn list_vehicles(&self, user_id: Uuid) -> PortResult<Vec<Vehicle>>;

    async fn find_vehicle(&self, user_id: Uuid, vehicle_id: Uuid) -> PortResult<Option<Vehicle>>;

    async fn update_vehicle(&self, vehicle: Vehicle) -> PortResult<Vehicle>;

    /// Ids of every vehicle the user owns, for cross-vehicle listings.
    async fn owned_vehicle_ids(&self, user_id: Uuid) -> PortResult<Vec<Uuid>>;

    async fn create_maintenance_record(
        &self,
        record: MaintenanceRecord,
    ) -> PortResult<MaintenanceRecord>;

    /// Records for the given vehicles, newest service first, optionally
    /// filtered by a case-insensitive search over type/title/description.
    async fn list_maintenance_records(
        &self,
        vehicle_ids: &[Uuid],
        search: Option<&str>,
    ) -> PortResult<Vec<MaintenanceRecord>>;

    async fn find_maintenance_record(
        &self,
        user_id: Uuid,
        record_id: Uuid,
    ) -> PortResult<Option<MaintenanceRecord>>;

    async fn delete_maintenance_record(&self, record_id: Uuid) -> PortResult<()>;

    async fn create_vehicle_reminder(
        &self,
        reminder: VehicleReminder,
    ) -> PortResult<VehicleReminder>;

    /// Due date ascending, then newest created.
    async fn list_vehicle_reminders(
        &self,
        vehicle_ids: &[Uuid],
    ) -> PortResult<Vec<VehicleReminder>>;

    async fn find_vehicle_reminder(
        &self,
        user_id: Uuid,
        reminder_id: Uuid,
    ) -> PortResult<Option<VehicleReminder>>;

    async fn update_vehicle_reminder(
        &self,
        reminder: VehicleReminder,
    ) -> PortResult<VehicleReminder>;

    async fn delete_vehicle_reminder(&self, reminder_id: Uuid) -> PortResult<()>;
}

/// Optional filters for expense listings.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub category_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_recurring: Option<bool>,
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    // --- Expenses ---
    async fn list_expenses(
        &self,
        user_id: Uuid,
        filter: ExpenseFilter,
    ) -> PortResult<Vec<Expense>>;

    async fn find_expense(&self, user_id: Uuid, expense_id: Uuid) -> PortResult<Option<Expense>>;

    /// Inserts the expense and bumps the `spent` total of every matching
    /// active budget in the same transaction. When `budget_id` is given,
    /// only that budget is bumped.
    async fn create_expense(
        &self,
        expense: Expense,
        budget_id: Option<Uuid>,
    ) -> PortResult<Expense>;

    async fn update_expense(&self, expense: Expense) -> PortResult<Expense>;

    /// Deletes the expense and rolls its amount back out of matching
    /// budgets (floored at zero).
    async fn delete_expense(&self, expense: &Expense) -> PortResult<()>;

    /// Sum of expense amounts in the window, optionally per category.
    async fn sum_expenses(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category_id: Option<Uuid>,
    ) -> PortResult<f64>;

    // --- Categories ---
    async fn list_categories(&self, user_id: Uuid) -> PortResult<Vec<ExpenseCategory>>;

    async fn find_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
    ) -> PortResult<Option<ExpenseCategory>>;

    async fn create_category(&self, category: ExpenseCategory) -> PortResult<ExpenseCategory>;

    async fn update_category(&self, category: ExpenseCategory) -> PortResult<ExpenseCategory>;

    async fn delete_category(&self, category_id: Uuid) -> PortResult<()>;

    // --- Budgets ---
    async fn list_budgets(&self, user_id: Uuid) -> PortResult<Vec<Budget>>;

    async fn find_budget(&self, user_id: Uuid, budget_id: Uuid) -> PortResult<Option<Budget>>;

    async fn create_budget(&self, budget: Budget) -> PortResult<Budget>;

    async fn update_budget(&self, budget: Budget) -> PortResult<Budget>;

    async fn delete_budget(&self, budget_id: Uuid) -> PortResult<()>;

    // --- Financial goals ---
    async fn list_goals(&self, user_id: Uuid) -> PortResult<Vec<FinancialGoal>>;

    async fn find_goal(&self, user_id: Uuid, goal_id: Uuid) -> PortResult<Option<FinancialGoal>>;

    async fn create_goal(&self, goal: FinancialGoal) -> PortResult<FinancialGoal>;

    async fn update_goal(&self, goal: FinancialGoal) -> PortResult<FinancialGoal>;

    async fn delete_goal(&self, goal_id: Uuid) -> PortResult<()>;

    // --- Recurring schedules ---
    async fn list_schedules(&self, user_id: Uuid) -> PortResult<Vec<ExpenseSchedule>>;

    async fn find_schedule(
        &self,
        user_id: Uuid,
        schedule_id: Uuid,
    ) -> PortResult<Option<ExpenseSchedule>>;

    async fn create_schedule(&self, schedule: ExpenseSchedule) -> PortResult<ExpenseSchedule>;

    async fn update_schedule(&self, schedule: ExpenseSchedule) -> PortResult<ExpenseSchedule>;

    async fn delete_schedule(&self, schedule_id: Uuid) -> PortResult<()>;

    /// Atomically: creates the paid expense, bumps matching budgets,
    /// retires the schedule, and returns the rolled-forward follow-up
    /// (none for one-time schedules).
    async fn mark_schedule_paid(
        &self,
        schedule: &ExpenseSchedule,
        expense: Expense,
        follow_up: Option<ExpenseSchedule>,
    ) -> PortResult<(Expense, Option<ExpenseSchedule>)>;

    // --- Subscriptions ---
    async fn list_subscriptions(&self, user_id: Uuid) -> PortResult<Vec<Subscription>>;

    async fn find_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> PortResult<Option<Subscription>>;

    async fn create_subscription(&self, subscription: Subscription) -> PortResult<Subscription>;

    async fn update_subscription(&self, subscription: Subscription) -> PortResult<Subscription>;

    async fn delete_subscription(&self, subscription_id: Uuid) -> PortResult<()>;

    /// Atomically: creates the paid expense, bumps matching budgets, and
    /// replaces the subscription with its rolled-forward successor.
    async fn mark_subscription_paid(
        &self,
        subscription: &Subscription,
        expense: Expense,
        successor: Subscription,
    ) -> PortResult<(Expense, Subscription)>;

    // --- Accounts ---
    async fn list_accounts(&self, user_id: Uuid) -> PortResult<Vec<Account>>;

    async fn find_account(&self, user_id: Uuid, account_id: Uuid) -> PortResult<Option<Account>>;

    /// A default account clears the flag on every other account in the
    /// same transaction.
    async fn create_account(&self, account: Account) -> PortResult<Account>;

    async fn update_account(&self, account: Account) -> PortResult<Account>;

    async fn delete_account(&self, account_id: Uuid) -> PortResult<()>;

    // --- Currencies ---
    async fn list_currencies(&self, user_id: Uuid) -> PortResult<Vec<UserCurrency>>;

    async fn find_currency(
        &self,
        user_id: Uuid,
        currency_id: Uuid,
    ) -> PortResult<Option<UserCurrency>>;

    /// A default currency clears the flag on every other currency in the
    /// same transaction.
    async fn create_currency(&self, currency: UserCurrency) -> PortResult<UserCurrency>;

    async fn update_currency(&self, currency: UserCurrency) -> PortResult<UserCurrency>;

    async fn delete_currency(&self, currency_id: Uuid) -> PortResult<()>;
}

/// The full persistence surface, one object implementing every store.
pub trait DatabaseService:
    AuthStore
    + ProfileStore
    + VitalsStore
    + MedicalRecordStore
    + MedicationStore
    + VehicleStore
    + ExpenseStore
{
}

impl<T> DatabaseService for T where
    T: AuthStore
        + ProfileStore
        + VitalsStore
        + MedicalRecordStore
        + MedicationStore
        + VehicleStore
        + ExpenseStore
{
}
