//! crates/household_core/src/adherence.rs
//!
//! Pure scheduling logic for medicine reminders: time normalization, the
//! active-window computation, and the per-day slot resolution that decides
//! which scheduled doses were taken, missed, or are still pending.
//!
//! This module never touches storage or the wall clock. Callers load the
//! day's logs, pass `now` in, and get back a plan that names the slots
//! still needing a missed-log backfill; performing those writes is the
//! caller's job.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{LogStatus, MedicationLog, MedicineReminder};

/// Fallback hour for a reminder slot with no usable time string.
const DEFAULT_SLOT_TIME: (u32, u32) = (8, 0);

fn time_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})(?::(\d{1,2}))?$").expect("valid time pattern"))
}

fn leading_int_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").expect("valid integer pattern"))
}

/// Normalizes `H`, `H:M`, `HH:MM` inputs to a canonical `HH:MM` 24-hour
/// string, clamping the hour into [0,23] and the minute into [0,59].
/// Anything else is rejected.
pub fn normalize_time_value(value: &str) -> Option<String> {
    let caps = time_pattern().captures(value.trim())?;
    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let hours = hours.min(23);
    let minutes = minutes.min(59);
    Some(format!("{hours:02}:{minutes:02}"))
}

/// Combines a civil date with a normalized `HH:MM` string into a UTC
/// instant. A missing or unparseable time lands on the default slot time.
pub fn combine_date_and_time(date: NaiveDate, time: Option<&str>) -> DateTime<Utc> {
    let (hours, minutes) = time
        .and_then(|t| {
            let mut parts = t.splitn(2, ':');
            let h: u32 = parts.next()?.parse().ok()?;
            let m: u32 = parts.next().unwrap_or("0").parse().ok()?;
            Some((h, m))
        })
        .unwrap_or(DEFAULT_SLOT_TIME);
    let time = NaiveTime::from_hms_opt(hours.min(23), minutes.min(59), 0)
        .expect("clamped time is valid");
    date.and_time(time).and_utc()
}

/// Formats an instant back to the `HH:MM` form used for slot matching.
pub fn format_time_of_day(at: DateTime<Utc>) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

/// Inclusive bounds of the civil day containing `reference`.
pub fn day_bounds(reference: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let date = reference.date_naive();
    let start = date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc();
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("end of day is valid")
        .and_utc();
    (start, end)
}

/// Free-text duration with its parsed day count, e.g. `"5 days"` -> 5.
/// The display text is preserved; the parsed value drives the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationSpec {
    pub raw: Option<String>,
    pub days: u64,
}

impl DurationSpec {
    /// First integer substring is the day count; absent or unparseable
    /// input means a single day. Zero is rounded up to one.
    pub fn parse(raw: Option<&str>) -> Self {
        let days = raw
            .and_then(|text| leading_int_pattern().captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .map(|d| d.max(1))
            .unwrap_or(1);
        Self {
            raw: raw.map(str::to_owned),
            days,
        }
    }
}

/// The inclusive date range during which a reminder is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReminderWindow {
    pub fn new(start: NaiveDate, duration: &DurationSpec) -> Self {
        let end = start
            .checked_add_days(Days::new(duration.days - 1))
            .unwrap_or(start);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What the resolver decided about one scheduled slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotDisposition {
    /// A log for this time-of-day already exists.
    Logged(LogStatus),
    /// The slot is in the past with no log; the caller should record a
    /// missed dose at `occurred_at`.
    NeedsBackfill,
    /// Future slot, or the reminder has no linked medication.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPlan {
    pub time: String,
    pub occurred_at: DateTime<Utc>,
    pub disposition: SlotDisposition,
}

impl SlotPlan {
    /// Slot status as it will appear once any backfill has been written.
    pub fn resolved_status(&self) -> Option<LogStatus> {
        match self.disposition {
            SlotDisposition::Logged(status) => Some(status),
            SlotDisposition::NeedsBackfill => Some(LogStatus::Missed),
            SlotDisposition::Pending => None,
        }
    }
}

/// A reminder's resolved schedule for one reference day.
#[derive(Debug, Clone)]
pub struct DayPlan {
    /// The raw instant the window was derived from; surfaced to clients
    /// as the reminder's `startDate`.
    pub start_date: DateTime<Utc>,
    pub window: ReminderWindow,
    pub slots: Vec<SlotPlan>,
}

impl DayPlan {
    /// Distinct instants that still need a missed log written.
    pub fn backfill_times(&self) -> Vec<DateTime<Utc>> {
        let mut times = Vec::new();
        for slot in &self.slots {
            if slot.disposition == SlotDisposition::NeedsBackfill
                && !times.contains(&slot.occurred_at)
            {
                times.push(slot.occurred_at);
            }
        }
        times
    }

    /// Reminder-level summary once backfills are applied: `taken` when
    /// every slot is taken, `missed` when every slot is missed, otherwise
    /// none (mixed, pending, or no slots at all).
    pub fn rollup(&self) -> Option<LogStatus> {
        rollup_status(self.slots.iter().map(SlotPlan::resolved_status))
    }
}

pub fn rollup_status(
    statuses: impl IntoIterator<Item = Option<LogStatus>>,
) -> Option<LogStatus> {
    let mut any = false;
    let mut all_taken = true;
    let mut all_missed = true;
    for status in statuses {
        any = true;
        all_taken &= status == Some(LogStatus::Taken);
        all_missed &= status == Some(LogStatus::Missed);
    }
    if !any {
        return None;
    }
    if all_taken {
        Some(LogStatus::Taken)
    } else if all_missed {
        Some(LogStatus::Missed)
    } else {
        None
    }
}

/// The reminder's scheduled times, normalized: `times` when any entry
/// survives normalization, else the legacy single `time`, else empty.
pub fn scheduled_times(reminder: &MedicineReminder) -> Vec<String> {
    let normalized: Vec<String> = reminder
        .times
        .iter()
        .filter_map(|t| normalize_time_value(t))
        .collect();
    if !normalized.is_empty() {
        return normalized;
    }
    reminder
        .time
        .as_deref()
        .and_then(normalize_time_value)
        .map(|t| vec![t])
        .unwrap_or_default()
}

/// Resolves one reminder against one reference day.
///
/// Returns `None` when the reference date falls outside the reminder's
/// active window; such reminders are dropped from listings entirely.
///
/// `day_logs` must already be restricted to the reference day. Matching is
/// by formatted time-of-day, not exact timestamp, so logs written with a
/// differing second/millisecond component still count.
pub fn plan_day(
    reminder: &MedicineReminder,
    medication_start: Option<DateTime<Utc>>,
    day_logs: &[MedicationLog],
    reference: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<DayPlan> {
    let start_date = medication_start.unwrap_or(reminder.created_at);
    let duration = DurationSpec::parse(reminder.duration.as_deref());
    let window = ReminderWindow::new(start_date.date_naive(), &duration);

    let reference_day = reference.date_naive();
    if !window.contains(reference_day) {
        return None;
    }

    let today = now.date_naive();
    let is_past_date = reference_day < today;
    let is_today = reference_day == today;

    let mut slots = Vec::new();
    for time in scheduled_times(reminder) {
        let occurred_at = combine_date_and_time(reference_day, Some(&time));
        let matched = day_logs
            .iter()
            .find(|log| format_time_of_day(log.occurred_at) == time);

        let disposition = match matched {
            Some(log) => SlotDisposition::Logged(log.status),
            None => {
                let slot_elapsed = is_past_date || (is_today && occurred_at < now);
                if reminder.medication_id.is_some() && slot_elapsed {
                    SlotDisposition::NeedsBackfill
                } else {
                    SlotDisposition::Pending
                }
            }
        };

        slots.push(SlotPlan {
            time,
            occurred_at,
            disposition,
        });
    }

    Some(DayPlan {
        start_date,
        window,
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
            .and_utc()
    }

    fn reminder(times: &[&str], duration: Option<&str>) -> MedicineReminder {
        MedicineReminder {
            id: Uuid::new_v4(),
            profile_id: Uuid::new_v4(),
            medication_id: Some(Uuid::new_v4()),
            medicine_name: "Amoxicillin".into(),
            unit: Some("mg".into()),
            dosage: 500.0,
            frequency: "daily".into(),
            time: times.first().map(|t| t.to_string()),
            times: times.iter().map(|t| t.to_string()).collect(),
            duration: duration.map(str::to_owned),
            intake_method: None,
            notes: None,
            active: true,
            created_at: utc(2024, 3, 1, 9, 30),
        }
    }

    fn log_at(at: DateTime<Utc>, status: LogStatus) -> MedicationLog {
        MedicationLog {
            id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            occurred_at: at,
            status,
        }
    }

    #[test]
    fn normalization_is_idempotent_and_clamps() {
        for input in ["8", "08:00", "8:5", "23:59", "99:99", " 7:30 "] {
            let once = normalize_time_value(input).unwrap();
            let twice = normalize_time_value(&once).unwrap();
            assert_eq!(once, twice, "normalize must be idempotent for {input:?}");
        }
        assert_eq!(normalize_time_value("8").as_deref(), Some("08:00"));
        assert_eq!(normalize_time_value("8:5").as_deref(), Some("08:05"));
        assert_eq!(normalize_time_value("99:99").as_deref(), Some("23:59"));
        assert_eq!(normalize_time_value("25:10").as_deref(), Some("23:10"));
        assert_eq!(normalize_time_value("bedtime"), None);
        assert_eq!(normalize_time_value("8:15pm"), None);
        assert_eq!(normalize_time_value(""), None);
    }

    #[test]
    fn duration_parses_leading_integer_with_one_day_floor() {
        assert_eq!(DurationSpec::parse(Some("5 days")).days, 5);
        assert_eq!(DurationSpec::parse(Some("take for 10 days then stop")).days, 10);
        assert_eq!(DurationSpec::parse(Some("0 days")).days, 1);
        assert_eq!(DurationSpec::parse(Some("a fortnight")).days, 1);
        assert_eq!(DurationSpec::parse(None).days, 1);
        let parsed = DurationSpec::parse(Some("5 days"));
        assert_eq!(parsed.raw.as_deref(), Some("5 days"));
    }

    #[test]
    fn window_inclusion_covers_duration_days() {
        let rem = reminder(&["08:00"], Some("5 days"));
        let start = utc(2024, 3, 10, 0, 0);
        let now = utc(2024, 3, 1, 12, 0);

        for offset in 0..5u64 {
            let reference = start + chrono::Duration::days(offset as i64);
            assert!(
                plan_day(&rem, Some(start), &[], reference, now).is_some(),
                "day D+{offset} should be in scope"
            );
        }
        let before = start - chrono::Duration::days(1);
        let after = start + chrono::Duration::days(5);
        assert!(plan_day(&rem, Some(start), &[], before, now).is_none());
        assert!(plan_day(&rem, Some(start), &[], after, now).is_none());
    }

    #[test]
    fn window_falls_back_to_reminder_creation() {
        let rem = reminder(&["08:00"], None);
        // No medication start date: the single-day window sits on created_at.
        assert!(plan_day(&rem, None, &[], utc(2024, 3, 1, 12, 0), utc(2024, 3, 1, 12, 0)).is_some());
        assert!(plan_day(&rem, None, &[], utc(2024, 3, 2, 12, 0), utc(2024, 3, 2, 12, 0)).is_none());
    }

    #[test]
    fn rollup_requires_unanimous_slots() {
        use LogStatus::*;
        assert_eq!(rollup_status([Some(Taken), Some(Taken)]), Some(Taken));
        assert_eq!(rollup_status([Some(Missed), Some(Missed)]), Some(Missed));
        assert_eq!(rollup_status([Some(Taken), Some(Missed)]), None);
        assert_eq!(rollup_status([Some(Taken), None]), None);
        assert_eq!(rollup_status([]), None);
    }

    #[test]
    fn past_day_slots_request_backfill() {
        let rem = reminder(&["08:00", "20:00"], Some("7 days"));
        let start = utc(2024, 3, 1, 0, 0);
        let yesterday = utc(2024, 3, 3, 0, 0);
        let now = utc(2024, 3, 4, 10, 0);

        let plan = plan_day(&rem, Some(start), &[], yesterday, now).unwrap();
        assert_eq!(plan.slots.len(), 2);
        assert!(plan
            .slots
            .iter()
            .all(|s| s.disposition == SlotDisposition::NeedsBackfill));
        assert_eq!(
            plan.backfill_times(),
            vec![utc(2024, 3, 3, 8, 0), utc(2024, 3, 3, 20, 0)]
        );
        assert_eq!(plan.rollup(), Some(LogStatus::Missed));
    }

    #[test]
    fn future_slots_stay_pending_without_logs() {
        let rem = reminder(&["08:00"], Some("7 days"));
        let start = utc(2024, 3, 1, 0, 0);
        let tomorrow = utc(2024, 3, 5, 0, 0);
        let now = utc(2024, 3, 4, 10, 0);

        let plan = plan_day(&rem, Some(start), &[], tomorrow, now).unwrap();
        assert_eq!(plan.slots[0].disposition, SlotDisposition::Pending);
        assert!(plan.backfill_times().is_empty());
        assert_eq!(plan.rollup(), None);
    }

    #[test]
    fn same_day_splits_on_the_current_instant() {
        let rem = reminder(&["08:00", "20:00"], Some("7 days"));
        let start = utc(2024, 3, 1, 0, 0);
        let now = utc(2024, 3, 4, 12, 0);

        let plan = plan_day(&rem, Some(start), &[], now, now).unwrap();
        assert_eq!(plan.slots[0].disposition, SlotDisposition::NeedsBackfill);
        assert_eq!(plan.slots[1].disposition, SlotDisposition::Pending);
        assert_eq!(plan.rollup(), None);
    }

    #[test]
    fn logs_match_by_time_of_day_not_exact_timestamp() {
        let rem = reminder(&["08:00"], Some("7 days"));
        let start = utc(2024, 3, 1, 0, 0);
        let now = utc(2024, 3, 4, 12, 0);
        // Log written with a stray seconds component still matches.
        let log = MedicationLog {
            occurred_at: NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_milli_opt(8, 0, 42, 137)
                .unwrap()
                .and_utc(),
            ..log_at(utc(2024, 3, 4, 8, 0), LogStatus::Taken)
        };

        let plan = plan_day(&rem, Some(start), &[log], now, now).unwrap();
        assert_eq!(
            plan.slots[0].disposition,
            SlotDisposition::Logged(LogStatus::Taken)
        );
        assert_eq!(plan.rollup(), Some(LogStatus::Taken));
    }

    #[test]
    fn unlinked_reminder_never_backfills() {
        let mut rem = reminder(&["08:00"], Some("7 days"));
        rem.medication_id = None;
        let start = utc(2024, 3, 1, 0, 0);
        let now = utc(2024, 3, 4, 12, 0);

        let plan = plan_day(&rem, Some(start), &[], utc(2024, 3, 2, 0, 0), now).unwrap();
        assert_eq!(plan.slots[0].disposition, SlotDisposition::Pending);
    }

    #[test]
    fn empty_schedule_yields_empty_plan_with_null_rollup() {
        let mut rem = reminder(&[], Some("7 days"));
        rem.time = None;
        let start = utc(2024, 3, 1, 0, 0);
        let now = utc(2024, 3, 4, 12, 0);

        let plan = plan_day(&rem, Some(start), &[], now, now).unwrap();
        assert!(plan.slots.is_empty());
        assert_eq!(plan.rollup(), None);
    }

    #[test]
    fn legacy_single_time_is_used_when_times_is_empty() {
        let mut rem = reminder(&[], Some("7 days"));
        rem.time = Some("9:5".into());
        let start = utc(2024, 3, 1, 0, 0);
        let now = utc(2024, 3, 4, 12, 0);

        let plan = plan_day(&rem, Some(start), &[], now, now).unwrap();
        assert_eq!(plan.slots.len(), 1);
        assert_eq!(plan.slots[0].time, "09:05");
    }

    #[test]
    fn duplicate_times_backfill_once() {
        let rem = reminder(&["08:00", "08:00"], Some("7 days"));
        let start = utc(2024, 3, 1, 0, 0);
        let now = utc(2024, 3, 4, 12, 0);

        let plan = plan_day(&rem, Some(start), &[], utc(2024, 3, 2, 0, 0), now).unwrap();
        assert_eq!(plan.slots.len(), 2);
        assert_eq!(plan.backfill_times().len(), 1);
    }

    #[test]
    fn day_bounds_are_inclusive_millisecond_precision() {
        let (start, end) = day_bounds(utc(2024, 3, 4, 13, 45));
        assert_eq!(start, utc(2024, 3, 4, 0, 0));
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2024, 3, 4)
                .unwrap()
                .and_hms_milli_opt(23, 59, 59, 999)
                .unwrap()
                .and_utc()
        );
    }
}
