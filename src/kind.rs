// 📐 Period Types & Boundary Calculator
//
// The closed set of period variants and, for each one, a static behaviour
// table: boundary rule, nominal length and the four formatters.
// Dispatch is a plain `match` on the enum, never on the type's name.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PeriodError, Result};
use crate::naming;
use crate::period::Period;
use crate::timestamp::Timestamp;

/// Smallest representable unit: end_on = start of next period − EPSILON
pub fn epsilon() -> Duration {
    Duration::microseconds(1)
}

// ============================================================================
// PERIOD TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    Month,
    Quarter,
    Semester,
    Year,
    /// Caller-supplied bounds, no boundary rule
    Custom,
}

impl PeriodType {
    pub const ALL: [PeriodType; 7] = [
        PeriodType::Day,
        PeriodType::Week,
        PeriodType::Month,
        PeriodType::Quarter,
        PeriodType::Semester,
        PeriodType::Year,
        PeriodType::Custom,
    ];

    /// Stored / serialized label
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Day => "day",
            PeriodType::Week => "week",
            PeriodType::Month => "month",
            PeriodType::Quarter => "quarter",
            PeriodType::Semester => "semester",
            PeriodType::Year => "year",
            PeriodType::Custom => "custom",
        }
    }

    /// Behaviour table for this variant
    pub fn behavior(&self) -> &'static Behavior {
        match self {
            PeriodType::Day => &DAY,
            PeriodType::Week => &WEEK,
            PeriodType::Month => &MONTH,
            PeriodType::Quarter => &QUARTER,
            PeriodType::Semester => &SEMESTER,
            PeriodType::Year => &YEAR,
            PeriodType::Custom => &CUSTOM,
        }
    }

    /// Nominal length, used to step from a midpoint into the adjacent period.
    /// Real month/quarter/year lengths come from calendar rollover in
    /// `boundaries`, not from this value.
    pub fn delta(&self) -> Duration {
        (self.behavior().delta)()
    }

    /// Canonical `(start, end)` of the period of this type containing `anchor`.
    /// The result keeps the anchor's awareness.
    pub fn boundaries(&self, anchor: Timestamp) -> Result<(Timestamp, Timestamp)> {
        let (start, end) = (self.behavior().boundaries)(anchor.naive_utc().date())?;
        Ok((anchor.with_naive(start), anchor.with_naive(end)))
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self> {
        PeriodType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PeriodError::UnknownPeriodType(s.to_string()))
    }
}

// ============================================================================
// BEHAVIOUR TABLE
// ============================================================================

/// Capability set of one variant
pub struct Behavior {
    pub kind: PeriodType,
    pub delta: fn() -> Duration,
    pub boundaries: fn(NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)>,
    pub name: fn(&Period) -> String,
    pub full_name: fn(&Period) -> String,
    pub str_id: fn(&Period) -> String,
    pub pid: fn(&Period) -> String,
}

static DAY: Behavior = Behavior {
    kind: PeriodType::Day,
    delta: || Duration::days(1),
    boundaries: day_boundaries,
    name: naming::day_name,
    full_name: naming::day_full_name,
    str_id: naming::day_str_id,
    pid: naming::day_pid,
};

static WEEK: Behavior = Behavior {
    kind: PeriodType::Week,
    delta: || Duration::days(7),
    boundaries: week_boundaries,
    name: naming::week_name,
    full_name: naming::week_full_name,
    str_id: naming::week_str_id,
    pid: naming::week_pid,
};

static MONTH: Behavior = Behavior {
    kind: PeriodType::Month,
    delta: || Duration::days(31),
    boundaries: month_boundaries,
    name: naming::month_name,
    full_name: naming::month_name,
    str_id: naming::month_str_id,
    pid: naming::month_pid,
};

static QUARTER: Behavior = Behavior {
    kind: PeriodType::Quarter,
    delta: || Duration::days(93),
    boundaries: quarter_boundaries,
    name: naming::quarter_name,
    full_name: naming::quarter_full_name,
    str_id: naming::quarter_str_id,
    pid: naming::quarter_pid,
};

static SEMESTER: Behavior = Behavior {
    kind: PeriodType::Semester,
    delta: || Duration::days(184),
    boundaries: semester_boundaries,
    name: naming::semester_name,
    full_name: naming::semester_full_name,
    str_id: naming::semester_str_id,
    pid: naming::semester_pid,
};

static YEAR: Behavior = Behavior {
    kind: PeriodType::Year,
    delta: || Duration::days(365),
    boundaries: year_boundaries,
    name: naming::year_name,
    full_name: naming::year_name,
    str_id: naming::year_str_id,
    pid: naming::year_pid,
};

static CUSTOM: Behavior = Behavior {
    kind: PeriodType::Custom,
    delta: || Duration::hours(1),
    boundaries: custom_boundaries,
    name: naming::custom_name,
    full_name: naming::custom_full_name,
    str_id: naming::custom_str_id,
    pid: naming::custom_pid,
};

// ============================================================================
// BOUNDARY RULES
// ============================================================================

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// [first, next_first − ε]
fn span(kind: PeriodType, first: NaiveDate, next_first: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let end = midnight(next_first)
        .checked_sub_signed(epsilon())
        .ok_or(PeriodError::OutOfRange(kind))?;
    Ok((midnight(first), end))
}

/// Month arithmetic with year rollover (works for negative years too)
pub(crate) fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let total = year as i64 * 12 + (month as i64 - 1) + months as i64;
    (total.div_euclid(12) as i32, total.rem_euclid(12) as u32 + 1)
}

/// Period made of `months` whole months starting at `first_month` of `year`
fn month_span(kind: PeriodType, year: i32, first_month: u32, months: u32) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let first = NaiveDate::from_ymd_opt(year, first_month, 1).ok_or(PeriodError::OutOfRange(kind))?;
    let (next_year, next_month) = add_months(year, first_month, months);
    let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or(PeriodError::OutOfRange(kind))?;
    span(kind, first, next_first)
}

fn day_boundaries(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let next = date.succ_opt().ok_or(PeriodError::OutOfRange(PeriodType::Day))?;
    span(PeriodType::Day, date, next)
}

fn week_boundaries(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let offset = date.weekday().num_days_from_monday() as u64;
    let monday = date
        .checked_sub_days(Days::new(offset))
        .ok_or(PeriodError::OutOfRange(PeriodType::Week))?;
    let next_monday = monday
        .checked_add_days(Days::new(7))
        .ok_or(PeriodError::OutOfRange(PeriodType::Week))?;
    span(PeriodType::Week, monday, next_monday)
}

fn month_boundaries(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    month_span(PeriodType::Month, date.year(), date.month(), 1)
}

fn quarter_boundaries(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let first_month = (date.month0() / 3) * 3 + 1;
    month_span(PeriodType::Quarter, date.year(), first_month, 3)
}

fn semester_boundaries(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let first_month = if date.month() <= 6 { 1 } else { 7 };
    month_span(PeriodType::Semester, date.year(), first_month, 6)
}

fn year_boundaries(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    month_span(PeriodType::Year, date.year(), 1, 12)
}

fn custom_boundaries(_date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    Err(PeriodError::NoBoundaryRule(PeriodType::Custom))
}

// ============================================================================
// TESTS
// ============================================================================
