// 📅 Period - a closed [start_on, end_on] interval tagged with its variant
//
// Equality is identity-by-pid (type sensitive), ordering only exists for
// disjoint periods. Bounds are immutable once built.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::error::{PeriodError, Result};
use crate::kind::{Behavior, PeriodType};
use crate::timestamp::{normalize, Timestamp};

// ============================================================================
// PERIOD
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Period {
    /// Surrogate id from the store (None = transient, never persisted)
    id: Option<i64>,

    start_on: Timestamp,

    /// Last representable instant of the interval
    end_on: Timestamp,

    period_type: PeriodType,
}

impl Period {
    /// Build a transient period, checking awareness and ordering
    pub fn new(start_on: Timestamp, end_on: Timestamp, period_type: PeriodType) -> Result<Self> {
        if start_on.is_aware() != end_on.is_aware() {
            return Err(PeriodError::MixedAwareness);
        }
        if start_on.naive_utc() > end_on.naive_utc() {
            return Err(PeriodError::InvertedBounds {
                start: start_on.to_string(),
                end: end_on.to_string(),
            });
        }

        Ok(Period {
            id: None,
            start_on,
            end_on,
            period_type,
        })
    }

    /// Custom period with caller-supplied bounds
    pub fn custom(start_on: Timestamp, end_on: Timestamp) -> Result<Self> {
        Self::new(start_on, end_on, PeriodType::Custom)
    }

    /// Canonical (transient) period of `period_type` containing `anchor`
    pub fn containing(anchor: Timestamp, period_type: PeriodType) -> Result<Self> {
        let (start, end) = period_type.boundaries(anchor)?;
        Self::new(start, end, period_type)
    }

    /// Attach the identity assigned by a repository
    pub(crate) fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn start_on(&self) -> Timestamp {
        self.start_on
    }

    pub fn end_on(&self) -> Timestamp {
        self.end_on
    }

    pub fn period_type(&self) -> PeriodType {
        self.period_type
    }

    // ========================================================================
    // AWARENESS
    // ========================================================================

    /// True when both bounds are zoned; errors when they disagree
    pub fn is_aware(&self) -> Result<bool> {
        match (self.start_on.is_aware(), self.end_on.is_aware()) {
            (s, e) if s == e => Ok(s),
            _ => Err(PeriodError::MixedAwareness),
        }
    }

    pub fn is_naive(&self) -> Result<bool> {
        self.is_aware().map(|aware| !aware)
    }

    /// Bring a foreign timestamp to this period's awareness
    pub fn normalize(&self, ts: Timestamp) -> Result<Timestamp> {
        Ok(normalize(ts, self.is_aware()?))
    }

    // ========================================================================
    // MIDPOINT & LENGTH
    // ========================================================================

    /// start_on + (end_on − start_on) / 2, the period's representative instant
    pub fn middle(&self) -> Timestamp {
        let start = self.start_on.naive_utc();
        let half = (self.end_on.naive_utc() - start) / 2;
        self.start_on.with_naive(start + half)
    }

    pub fn duration(&self) -> Duration {
        self.end_on.naive_utc() - self.start_on.naive_utc()
    }

    // ========================================================================
    // BEHAVIOUR (dispatch through the variant table)
    // ========================================================================

    pub fn behavior(&self) -> &'static Behavior {
        self.period_type.behavior()
    }

    /// Read-only view of this record through another variant's behaviour.
    /// The stored type is untouched.
    pub fn view_as(&self, kind: PeriodType) -> PeriodView<'_> {
        PeriodView {
            period: self,
            behavior: kind.behavior(),
        }
    }

    pub fn delta(&self) -> Duration {
        self.period_type.delta()
    }

    pub fn name(&self) -> String {
        (self.behavior().name)(self)
    }

    pub fn full_name(&self) -> String {
        (self.behavior().full_name)(self)
    }

    pub fn str_id(&self) -> String {
        (self.behavior().str_id)(self)
    }

    /// Canonical identity string; basis for `==`
    pub fn pid(&self) -> String {
        (self.behavior().pid)(self)
    }

    // ========================================================================
    // CONTAINMENT
    // ========================================================================

    /// Whether a timestamp, calendar date or bare year falls inside this period
    pub fn includes(&self, probe: impl Into<DateProbe>) -> Result<bool> {
        match probe.into() {
            DateProbe::Timestamp(ts) => self.includes_timestamp(ts),
            DateProbe::Date(date) => {
                let midday = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
                self.includes_timestamp(Timestamp::Naive(midday))
            }
            DateProbe::Year(year) => Ok(self.start_on.naive_utc().year() <= year
                && year <= self.end_on.naive_utc().year()),
        }
    }

    fn includes_timestamp(&self, ts: Timestamp) -> Result<bool> {
        let ts = self.normalize(ts)?.naive_utc();
        Ok(self.start_on.naive_utc() <= ts && ts <= self.end_on.naive_utc())
    }

    /// True when the two intervals share at least one instant
    pub fn overlaps(&self, other: &Period) -> Result<bool> {
        let other_start = self.normalize(other.start_on)?.naive_utc();
        let other_end = self.normalize(other.end_on)?.naive_utc();
        Ok(self.start_on.naive_utc() <= other_end && other_start <= self.end_on.naive_utc())
    }
}

// ============================================================================
// COMPARISON
// ============================================================================

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.pid() == other.pid()
    }
}

/// Disjoint periods order by position on the timeline; overlapping,
/// non-identical periods are not comparable (`None`).
impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }

        let other_start = self.normalize(other.start_on).ok()?.naive_utc();
        let other_end = self.normalize(other.end_on).ok()?.naive_utc();

        if self.end_on.naive_utc() < other_start {
            Some(Ordering::Less)
        } else if self.start_on.naive_utc() > other_end {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// A stored period presented through some variant's behaviour table
pub struct PeriodView<'a> {
    period: &'a Period,
    behavior: &'static Behavior,
}

impl<'a> PeriodView<'a> {
    pub fn period(&self) -> &'a Period {
        self.period
    }

    /// The variant whose behaviour is applied (not the stored type)
    pub fn kind(&self) -> PeriodType {
        self.behavior.kind
    }

    pub fn delta(&self) -> Duration {
        (self.behavior.delta)()
    }

    /// Canonical bounds this variant would give the period's midpoint
    pub fn boundaries(&self) -> Result<(Timestamp, Timestamp)> {
        self.kind().boundaries(self.period.middle())
    }

    pub fn name(&self) -> String {
        (self.behavior.name)(self.period)
    }

    pub fn full_name(&self) -> String {
        (self.behavior.full_name)(self.period)
    }

    pub fn str_id(&self) -> String {
        (self.behavior.str_id)(self.period)
    }

    pub fn pid(&self) -> String {
        (self.behavior.pid)(self.period)
    }
}

// ============================================================================
// DATE PROBE
// ============================================================================

/// The three ways a caller can ask "is X inside this period?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateProbe {
    /// Direct range test
    Timestamp(Timestamp),

    /// Promoted to midday, then range test
    Date(NaiveDate),

    /// Year overlap with the period's years
    Year(i32),
}

impl From<Timestamp> for DateProbe {
    fn from(ts: Timestamp) -> Self {
        DateProbe::Timestamp(ts)
    }
}

impl From<DateTime<Utc>> for DateProbe {
    fn from(dt: DateTime<Utc>) -> Self {
        DateProbe::Timestamp(Timestamp::Zoned(dt))
    }
}

impl From<NaiveDateTime> for DateProbe {
    fn from(dt: NaiveDateTime) -> Self {
        DateProbe::Timestamp(Timestamp::Naive(dt))
    }
}

impl From<NaiveDate> for DateProbe {
    fn from(date: NaiveDate) -> Self {
        DateProbe::Date(date)
    }
}

impl From<i32> for DateProbe {
    fn from(year: i32) -> Self {
        DateProbe::Year(year)
    }
}

// ============================================================================
// TESTS
// ============================================================================
