//! Shared test fixtures: an in-memory medication store and builders for
//! the medication/reminder pair the resolver works on.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use household_core::domain::{LogStatus, Medication, MedicationLog, MedicineReminder};
use household_core::ports::{MedicationStore, PortError, PortResult};

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
        .and_utc()
}

/// Medication-side store backed by vectors, mirroring the relational
/// adapter's contracts (including the unique log constraint).
#[derive(Default)]
pub struct InMemoryStore {
    pub medications: Mutex<Vec<Medication>>,
    pub reminders: Mutex<Vec<MedicineReminder>>,
    pub logs: Mutex<Vec<MedicationLog>>,
}

impl InMemoryStore {
    pub fn with_reminder(medication: Medication, reminder: MedicineReminder) -> Self {
        let store = Self::default();
        store.medications.lock().unwrap().push(medication);
        store.reminders.lock().unwrap().push(reminder);
        store
    }

    pub fn log_count(&self) -> usize {
        self.logs.lock().unwrap().len()
    }

    pub fn logs_snapshot(&self) -> Vec<MedicationLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MedicationStore for InMemoryStore {
    async fn create_medication(&self, medication: Medication) -> PortResult<Medication> {
        self.medications.lock().unwrap().push(medication.clone());
        Ok(medication)
    }

    async fn find_medication(&self, medication_id: Uuid) -> PortResult<Option<Medication>> {
        Ok(self
            .medications
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == medication_id)
            .cloned())
    }

    async fn update_medication(&self, medication: Medication) -> PortResult<Medication> {
        let mut medications = self.medications.lock().unwrap();
        let slot = medications
            .iter_mut()
            .find(|m| m.id == medication.id)
            .ok_or_else(|| PortError::NotFound("medication".into()))?;
        *slot = medication.clone();
        Ok(medication)
    }

    async fn delete_medication(&self, medication_id: Uuid) -> PortResult<()> {
        self.medications
            .lock()
            .unwrap()
            .retain(|m| m.id != medication_id);
        Ok(())
    }

    async fn create_reminder(&self, reminder: MedicineReminder) -> PortResult<MedicineReminder> {
        self.reminders.lock().unwrap().push(reminder.clone());
        Ok(reminder)
    }

    async fn list_reminders(&self, profile_id: Uuid) -> PortResult<Vec<MedicineReminder>> {
        let mut reminders: Vec<MedicineReminder> = self
            .reminders
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.profile_id == profile_id)
            .cloned()
            .collect();
        reminders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reminders)
    }

    async fn find_reminder(
        &self,
        _user_id: Uuid,
        reminder_id: Uuid,
    ) -> PortResult<Option<MedicineReminder>> {
        Ok(self
            .reminders
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == reminder_id)
            .cloned())
    }

    async fn update_reminder(&self, reminder: MedicineReminder) -> PortResult<MedicineReminder> {
        let mut reminders = self.reminders.lock().unwrap();
        let slot = reminders
            .iter_mut()
            .find(|r| r.id == reminder.id)
            .ok_or_else(|| PortError::NotFound("reminder".into()))?;
        *slot = reminder.clone();
        Ok(reminder)
    }

    async fn delete_reminder(&self, reminder_id: Uuid) -> PortResult<()> {
        self.reminders
            .lock()
            .unwrap()
            .retain(|r| r.id != reminder_id);
        Ok(())
    }

    async fn logs_between(
        &self,
        medication_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<MedicationLog>> {
        let mut logs: Vec<MedicationLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.medication_id == medication_id && l.occurred_at >= start && l.occurred_at <= end
            })
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.occurred_at);
        Ok(logs)
    }

    async fn insert_log(&self, log: MedicationLog) -> PortResult<MedicationLog> {
        let mut logs = self.logs.lock().unwrap();
        if let Some(existing) = logs
            .iter()
            .find(|l| l.medication_id == log.medication_id && l.occurred_at == log.occurred_at)
        {
            return Ok(existing.clone());
        }
        logs.push(log.clone());
        Ok(log)
    }

    async fn update_log_status(
        &self,
        log_id: Uuid,
        status: LogStatus,
    ) -> PortResult<MedicationLog> {
        let mut logs = self.logs.lock().unwrap();
        let log = logs
            .iter_mut()
            .find(|l| l.id == log_id)
            .ok_or_else(|| PortError::NotFound("log".into()))?;
        log.status = status;
        Ok(log.clone())
    }

    async fn delete_log(&self, log_id: Uuid) -> PortResult<()> {
        self.logs.lock().unwrap().retain(|l| l.id != log_id);
        Ok(())
    }
}

/// A medication/reminder pair starting on `start_date` with the given
/// schedule and duration.
pub fn reminder_fixture(
    times: &[&str],
    duration: Option<&str>,
    start_date: DateTime<Utc>,
) -> (Medication, MedicineReminder) {
    let profile_id = Uuid::new_v4();
    let medication = Medication {
        id: Uuid::new_v4(),
        profile_id,
        name: "Amoxicillin".to_string(),
        dosage: "500 mg".to_string(),
        instructions: "after meals".to_string(),
        start_date,
    };
    let reminder = MedicineReminder {
        id: Uuid::new_v4(),
        profile_id,
        medication_id: Some(medication.id),
        medicine_name: medication.name.clone(),
        unit: Some("mg".to_string()),
        dosage: 500.0,
        frequency: "daily".to_string(),
        time: times.first().map(|t| t.to_string()),
        times: times.iter().map(|t| t.to_string()).collect(),
        duration: duration.map(str::to_owned),
        intake_method: Some("oral".to_string()),
        notes: None,
        active: true,
        created_at: start_date,
    };
    (medication, reminder)
}
