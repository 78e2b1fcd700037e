//! services/api/src/adapters/clock.rs
//!
//! The production implementation of the `Clock` port.

use chrono::{DateTime, Utc};
use household_core::ports::Clock;

/// Reads the real wall clock. Tests use a fixed clock instead.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
