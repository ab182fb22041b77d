// 🌐 Timestamps & Timezone Normalization
//
// A period boundary is either zoned (UTC) or naive (wall clock, assumed UTC).
// Awareness is explicit in the type so a mixed pair can be detected instead of
// silently coerced.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// TIMESTAMP
// ============================================================================

/// A point in time that remembers whether it carries timezone information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "awareness", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Timezone-aware, always UTC
    Zoned(DateTime<Utc>),

    /// No timezone information; interpreted as UTC wall-clock time
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn is_aware(&self) -> bool {
        matches!(self, Timestamp::Zoned(_))
    }

    pub fn is_naive(&self) -> bool {
        !self.is_aware()
    }

    /// Wall-clock fields in UTC, regardless of awareness
    pub fn naive_utc(&self) -> NaiveDateTime {
        match self {
            Timestamp::Zoned(dt) => dt.naive_utc(),
            Timestamp::Naive(dt) => *dt,
        }
    }

    /// The same instant as a zoned UTC datetime
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Zoned(dt) => *dt,
            Timestamp::Naive(dt) => Utc.from_utc_datetime(dt),
        }
    }

    /// Replace the wall-clock value, keeping this timestamp's awareness
    pub fn with_naive(&self, naive: NaiveDateTime) -> Timestamp {
        match self {
            Timestamp::Zoned(_) => Timestamp::Zoned(Utc.from_utc_datetime(&naive)),
            Timestamp::Naive(_) => Timestamp::Naive(naive),
        }
    }

    pub fn checked_add(&self, delta: Duration) -> Option<Timestamp> {
        self.naive_utc()
            .checked_add_signed(delta)
            .map(|naive| self.with_naive(naive))
    }

    pub fn checked_sub(&self, delta: Duration) -> Option<Timestamp> {
        self.naive_utc()
            .checked_sub_signed(delta)
            .map(|naive| self.with_naive(naive))
    }

    /// Drop precision below one microsecond (the store's resolution)
    pub fn trunc_micros(&self) -> Timestamp {
        self.with_naive(self.naive_utc().trunc_subsecs(6))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Zoned(dt)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Timestamp::Naive(dt)
    }
}

/// A bare calendar date becomes a naive timestamp at midnight
impl From<NaiveDate> for Timestamp {
    fn from(date: NaiveDate) -> Self {
        Timestamp::Naive(date.and_time(chrono::NaiveTime::MIN))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Zoned(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6fZ")),
            Timestamp::Naive(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.6f")),
        }
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Coerce a timestamp to the requested awareness
///
/// - zoned wanted, naive given → attach UTC
/// - naive wanted, zoned given → strip the zone (value is already UTC)
/// - otherwise unchanged
pub fn normalize(ts: Timestamp, want_zoned: bool) -> Timestamp {
    match (ts, want_zoned) {
        (Timestamp::Naive(dt), true) => Timestamp::Zoned(Utc.from_utc_datetime(&dt)),
        (Timestamp::Zoned(dt), false) => Timestamp::Naive(dt.naive_utc()),
        (ts, _) => ts,
    }
}

// ============================================================================
// TESTS
// ============================================================================
