//! Time and identifier capabilities.
//!
//! The engine never reads the system clock or mints identifiers directly; it
//! goes through the [`Clock`] and [`IdSource`] traits so tests can substitute
//! deterministic implementations.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MembershipError, Result};

/// Supplies the current instant, normalized to UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mints unique identifiers with a caller-supplied prefix.
///
/// Identifiers must be distinct within a process; ordering guarantees beyond
/// that are implementation-specific.
pub trait IdSource: Send + Sync {
    fn next_id(&self, prefix: &str) -> String;
}

/// Sequential ids: `sub-1`, `sub-2`, ...
///
/// Each instance owns its own counter, so an engine built with a fresh
/// `SequenceIds` produces the same ids on every test run.
#[derive(Debug)]
pub struct SequenceIds {
    counter: AtomicU64,
}

impl SequenceIds {
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            counter: AtomicU64::new(first),
        }
    }
}

impl Default for SequenceIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequenceIds {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// Random v4 uuid ids: `sub-7f8a...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4())
    }
}

/// A calendar period a plan runs for.
///
/// Adding a period to an instant lands on the same day-of-month in the target
/// month; when the target month is shorter the day is clamped to its last
/// valid day (Jan 31 + 1 month = Feb 29 in a leap year, Feb 28 otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanDuration {
    Months(u32),
    Years(u32),
}

impl PlanDuration {
    /// Total length in calendar months.
    #[must_use]
    pub fn total_months(&self) -> u32 {
        match self {
            Self::Months(m) => *m,
            Self::Years(y) => y.saturating_mul(12),
        }
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.total_months() > 0
    }

    /// Add this period to `instant`, in UTC, clamping the day-of-month.
    pub fn add_to(&self, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        instant
            .checked_add_months(Months::new(self.total_months()))
            .ok_or_else(|| {
                MembershipError::internal(format!("date overflow adding {self} to {instant}"))
            })
    }
}

impl fmt::Display for PlanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Months(1) => write!(f, "1 month"),
            Self::Months(m) => write!(f, "{m} months"),
            Self::Years(1) => write!(f, "1 year"),
            Self::Years(y) => write!(f, "{y} years"),
        }
    }
}
