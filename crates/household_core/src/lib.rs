pub mod adherence;
pub mod domain;
pub mod ports;
pub mod recurrence;

pub use domain::{
    Account, Budget, Expense, ExpenseCategory, ExpenseFrequency, ExpenseSchedule,
    FileAsset, FinancialGoal, IllnessEntry, IllnessSeverity, IllnessStatus, LogStatus,
    MaintenanceRecord, MedicalRecord, Medication, MedicationLog, MedicineReminder, PaymentMethod,
    Profile, RecordType, Subscription, User, UserCredentials, UserCurrency, Vehicle,
    VehicleReminder, VitalEntry, VitalKind,
};
pub use ports::{
    AuthStore, Clock, DatabaseService, ExpenseFilter, ExpenseStore, FileStore, MedicalRecordStore,
    MedicationStore, PortError, PortResult, ProfileStore, VehicleStore, VitalsStore,
};
