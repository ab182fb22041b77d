// ⚠️ Period Errors - one typed error for the whole engine
//
// Lookup misses and uniqueness conflicts are NOT errors here:
// the store treats them as ordinary control flow (create / re-fetch).

use thiserror::Error;

use crate::kind::PeriodType;

/// Everything that can go wrong while resolving, creating or comparing periods
#[derive(Debug, Error)]
pub enum PeriodError {
    /// start_on and end_on disagree on timezone awareness (data corruption upstream)
    #[error("period boundaries can't mix naive and timezone-aware timestamps")]
    MixedAwareness,

    /// start_on is after end_on
    #[error("period starts after it ends ({start} > {end})")]
    InvertedBounds { start: String, end: String },

    /// Calendar arithmetic left chrono's representable range
    #[error("date arithmetic out of range while computing {0} boundaries")]
    OutOfRange(PeriodType),

    /// Custom periods carry caller-supplied bounds only
    #[error("{0} periods have no automatic boundary rule")]
    NoBoundaryRule(PeriodType),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("week {week} does not exist in {year}")]
    InvalidWeekNumber { year: i32, week: u32 },

    /// Quarter / semester ordinal outside the year
    #[error("{kind} #{ordinal} does not exist in {year}")]
    InvalidOrdinal { kind: PeriodType, year: i32, ordinal: u32 },

    /// Insert kept conflicting but the winning row could not be read back
    #[error("{kind} period {start}..{end} kept conflicting on insert but was never found")]
    Contention { kind: PeriodType, start: String, end: String },

    /// Walking to the next period landed on the same or an earlier one
    #[error("{kind} period after {after} does not advance")]
    StalledWalk { kind: PeriodType, after: String },

    #[error("unknown period type: {0}")]
    UnknownPeriodType(String),

    /// A stored row could not be decoded back into a Period
    #[error("corrupt period record: {0}")]
    CorruptRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, PeriodError>;
