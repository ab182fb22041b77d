// 🔁 Period Store - find-or-create over a PeriodRepository
//
// Uniqueness of (start_on, end_on, period_type) is owned by the repository.
// A lookup miss means "create"; an insert conflict means "someone else just
// created it" and is answered by re-reading, never surfaced to the caller.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::db::{InsertOutcome, PeriodRepository};
use crate::error::{PeriodError, Result};
use crate::kind::{epsilon, PeriodType};
use crate::period::Period;
use crate::timestamp::{normalize, Timestamp};

/// Insert/re-read rounds before giving up on a row that keeps vanishing
const MAX_CREATE_ATTEMPTS: usize = 3;

// ============================================================================
// DATE SPEC
// ============================================================================

/// A possibly partial calendar reference ("2024", "2024 week 12", "2024-03-05 10:00")
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpec {
    pub year: i32,
    pub month: Option<u32>,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,

    /// Interpret `week` with ISO-8601 numbering
    pub iso_week: bool,
}

impl DateSpec {
    pub fn year(year: i32) -> Self {
        DateSpec {
            year,
            ..Self::default()
        }
    }

    pub fn month(year: i32, month: u32) -> Self {
        DateSpec {
            month: Some(month),
            ..Self::year(year)
        }
    }

    pub fn date(year: i32, month: u32, day: u32) -> Self {
        DateSpec {
            day: Some(day),
            ..Self::month(year, month)
        }
    }

    pub fn week(year: i32, week: u32, iso_week: bool) -> Self {
        DateSpec {
            week: Some(week),
            iso_week,
            ..Self::year(year)
        }
    }

    pub fn at(mut self, hour: u32, minute: u32, second: u32) -> Self {
        self.hour = Some(hour);
        self.minute = Some(minute);
        self.second = Some(second);
        self
    }

    /// Explicit UTC instant; missing fields default to month 1, day 1, 00:00:00
    pub fn to_timestamp(&self) -> Result<Timestamp> {
        let invalid = || PeriodError::InvalidDate(format!("{:?}", self));

        let date = NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
            .ok_or_else(invalid)?;
        let time = NaiveTime::from_hms_opt(
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
        )
        .ok_or_else(invalid)?;

        Ok(Timestamp::Zoned(Utc.from_utc_datetime(&date.and_time(time))))
    }
}

// ============================================================================
// WEEK NUMBERS
// ============================================================================

/// Bounds of week `week` of `year`.
///
/// Week 1 starts at the first aligned Monday: the first Monday on or after
/// Jan 1, or with `is_iso` the Monday of ISO week 1. Week 0 is the stub from
/// Jan 1 up to that Monday and only exists when Jan 1 is not aligned.
pub fn week_number_bounds(year: i32, week: u32, is_iso: bool) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let invalid = || PeriodError::InvalidWeekNumber { year, week };
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;

    let aligned = if is_iso {
        NaiveDate::from_isoywd_opt(year, 1, Weekday::Mon).ok_or_else(invalid)?
    } else {
        let shift = (7 - jan1.weekday().num_days_from_monday()) % 7;
        jan1.checked_add_days(Days::new(shift as u64)).ok_or_else(invalid)?
    };

    let (start, next) = if week == 0 {
        if aligned <= jan1 {
            return Err(invalid());
        }
        (jan1, aligned)
    } else {
        let start = if is_iso {
            NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?
        } else {
            let start = aligned
                .checked_add_days(Days::new(7 * (week as u64 - 1)))
                .ok_or_else(invalid)?;
            if start.year() != year {
                return Err(invalid());
            }
            start
        };
        (start, start.checked_add_days(Days::new(7)).ok_or_else(invalid)?)
    };

    let end = next
        .and_time(NaiveTime::MIN)
        .checked_sub_signed(epsilon())
        .ok_or_else(invalid)?;
    Ok((start.and_time(NaiveTime::MIN), end))
}

// ============================================================================
// STORE
// ============================================================================

pub struct PeriodStore<R: PeriodRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: PeriodRepository> PeriodStore<R> {
    /// Store reading "now" from the system clock
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: R, clock: Arc<dyn Clock>) -> Self {
        PeriodStore { repo, clock }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ========================================================================
    // FIND-OR-CREATE
    // ========================================================================

    /// Period with exactly these bounds and type, created if missing.
    /// Repeated calls return the same stored identity.
    pub fn find_or_create_with(
        &self,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
        kind: PeriodType,
    ) -> Result<Period> {
        let start = normalize(start.into(), true).trunc_micros();
        let end = normalize(end.into(), true).trunc_micros();
        // Validates ordering before touching the store
        Period::new(start, end, kind)?;

        let (start, end) = (start.to_utc(), end.to_utc());

        for _ in 0..MAX_CREATE_ATTEMPTS {
            if let Some(existing) = self.repo.find_exact(start, end, kind)? {
                debug!(period_type = %kind, id = ?existing.id(), "found existing period");
                return Ok(existing);
            }

            match self.repo.insert(start, end, kind)? {
                InsertOutcome::Inserted(period) => {
                    info!(
                        period_type = %kind,
                        id = ?period.id(),
                        start = %period.start_on(),
                        end = %period.end_on(),
                        "created period"
                    );
                    return Ok(period);
                }
                InsertOutcome::Conflict => {
                    debug!(period_type = %kind, "insert lost a creation race, re-reading");
                }
            }
        }

        Err(PeriodError::Contention {
            kind,
            start: Timestamp::Zoned(start).to_string(),
            end: Timestamp::Zoned(end).to_string(),
        })
    }

    /// Period of `kind` containing `date`.
    ///
    /// Existing periods are found by containment; otherwise canonical bounds
    /// are computed and the period is created, or returned unsaved when
    /// `allow_transient` is set.
    pub fn find_or_create_by_date(
        &self,
        date: impl Into<Timestamp>,
        kind: PeriodType,
        allow_transient: bool,
    ) -> Result<Period> {
        let date = normalize(date.into(), true);

        if let Some(existing) = self.repo.find_containing(date.to_utc(), kind)? {
            return Ok(existing);
        }

        let (start, end) = kind.boundaries(date)?;
        if allow_transient {
            return Period::new(start, end, kind);
        }
        self.find_or_create_with(start, end, kind)
    }

    /// Resolve a partial date reference.
    ///
    /// - year only → the Year period (whatever `kind` is)
    /// - week given → the week-number resolver (Week period)
    /// - otherwise → the `kind` period containing the explicit date
    pub fn find_or_create_from(&self, spec: &DateSpec, kind: PeriodType, allow_transient: bool) -> Result<Period> {
        match (spec.month, spec.week) {
            (None, None) => {
                let jan1 = DateSpec::year(spec.year).to_timestamp()?;
                self.find_or_create_by_date(jan1, PeriodType::Year, allow_transient)
            }
            (_, Some(week)) => {
                let (start, end) = week_number_bounds(spec.year, week, spec.iso_week)?;
                self.resolve_bounds(start, end, PeriodType::Week, allow_transient)
            }
            (Some(_), None) => self.find_or_create_by_date(spec.to_timestamp()?, kind, allow_transient),
        }
    }

    /// Week `week_number` of `year` (see `week_number_bounds`), stored as a Week
    pub fn find_or_create_by_week_number(&self, year: i32, week_number: u32, is_iso: bool) -> Result<Period> {
        let (start, end) = week_number_bounds(year, week_number, is_iso)?;
        self.find_or_create_with(start, end, PeriodType::Week)
    }

    /// Quarter 1-4 of `year`
    pub fn find_or_create_by_quarter(&self, year: i32, quarter: u32) -> Result<Period> {
        self.find_or_create_by_ordinal(PeriodType::Quarter, year, quarter, 3)
    }

    /// Semester 1-2 of `year`
    pub fn find_or_create_by_semester(&self, year: i32, semester: u32) -> Result<Period> {
        self.find_or_create_by_ordinal(PeriodType::Semester, year, semester, 6)
    }

    fn find_or_create_by_ordinal(&self, kind: PeriodType, year: i32, ordinal: u32, months: u32) -> Result<Period> {
        if ordinal == 0 || ordinal > 12 / months {
            return Err(PeriodError::InvalidOrdinal { kind, year, ordinal });
        }
        let anchor = DateSpec::month(year, (ordinal - 1) * months + 1).to_timestamp()?;
        self.find_or_create_by_date(anchor, kind, false)
    }

    /// Period of `kind` containing the clock's current instant
    pub fn current(&self, kind: PeriodType, allow_transient: bool) -> Result<Period> {
        self.find_or_create_by_date(self.clock.now(), kind, allow_transient)
    }

    fn resolve_bounds(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        kind: PeriodType,
        allow_transient: bool,
    ) -> Result<Period> {
        let start = Timestamp::Zoned(Utc.from_utc_datetime(&start));
        let end = Timestamp::Zoned(Utc.from_utc_datetime(&end));

        if allow_transient {
            if let Some(existing) = self.repo.find_exact(start.to_utc(), end.to_utc(), kind)? {
                return Ok(existing);
            }
            return Period::new(start, end, kind);
        }
        self.find_or_create_with(start, end, kind)
    }

    // ========================================================================
    // NEIGHBOURS
    // ========================================================================

    /// Next period of the same type (persisted)
    pub fn following(&self, period: &Period) -> Result<Period> {
        self.adjacent(period, true, false)
    }

    /// Previous period of the same type (persisted)
    pub fn previous(&self, period: &Period) -> Result<Period> {
        self.adjacent(period, false, false)
    }

    /// Next period of the same type, without persisting a new one
    pub fn following_transient(&self, period: &Period) -> Result<Period> {
        self.adjacent(period, true, true)
    }

    pub fn previous_transient(&self, period: &Period) -> Result<Period> {
        self.adjacent(period, false, true)
    }

    /// Shift the midpoint by the nominal length and resolve the period there
    fn adjacent(&self, period: &Period, forward: bool, allow_transient: bool) -> Result<Period> {
        let kind = period.period_type();
        let middle = period.middle();
        let target = if forward {
            middle.checked_add(kind.delta())
        } else {
            middle.checked_sub(kind.delta())
        }
        .ok_or(PeriodError::OutOfRange(kind))?;

        self.find_or_create_by_date(target, kind, allow_transient)
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn get(&self, id: i64) -> Result<Option<Period>> {
        self.repo.get(id)
    }

    /// Persisted periods of one type, oldest first
    pub fn list(&self, kind: PeriodType) -> Result<Vec<Period>> {
        self.repo.list_by_type(kind)
    }

    pub fn count(&self) -> Result<i64> {
        self.repo.count()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::SqlitePeriodRepository;
    use chrono::DateTime;
    use std::cell::Cell;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn naive(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sqlite_store() -> PeriodStore<SqlitePeriodRepository> {
        PeriodStore::new(SqlitePeriodRepository::open_in_memory().unwrap())
    }

    #[test]
    fn test_find_or_create_with_is_idempotent() {
        let store = sqlite_store();
        let start = utc(2024, 3, 1, 0);
        let end = utc(2024, 3, 10, 0);

        let first = store.find_or_create_with(start, end, PeriodType::Custom).unwrap();
        let second = store.find_or_create_with(start, end, PeriodType::Custom).unwrap();

        assert!(first.id().is_some());
        assert_eq!(first.id(), second.id());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_find_or_create_with_normalizes_naive_input() {
        let store = sqlite_store();

        let zoned = store
            .find_or_create_with(utc(2024, 3, 1, 0), utc(2024, 3, 2, 0), PeriodType::Custom)
            .unwrap();
        let naive = store
            .find_or_create_with(naive(2024, 3, 1), naive(2024, 3, 2), PeriodType::Custom)
            .unwrap();

        assert_eq!(zoned.id(), naive.id());
        assert!(naive.is_aware().unwrap());
    }

    #[test]
    fn test_find_or_create_with_rejects_inverted_bounds() {
        let store = sqlite_store();
        let result = store.find_or_create_with(utc(2024, 3, 2, 0), utc(2024, 3, 1, 0), PeriodType::Custom);

        assert!(matches!(result, Err(PeriodError::InvertedBounds { .. })));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_by_date_creates_canonical_period_once() {
        let store = sqlite_store();

        let morning = store.find_or_create_by_date(utc(2024, 1, 3, 8), PeriodType::Day, false).unwrap();
        let evening = store.find_or_create_by_date(utc(2024, 1, 3, 20), PeriodType::Day, false).unwrap();

        assert_eq!(morning.id(), evening.id());
        assert_eq!(morning.start_on().naive_utc(), naive(2024, 1, 3));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_by_date_transient_does_not_persist() {
        let store = sqlite_store();

        let month = store.find_or_create_by_date(utc(2023, 12, 15, 0), PeriodType::Month, true).unwrap();

        assert!(!month.is_persisted());
        assert_eq!(month.start_on().naive_utc(), naive(2023, 12, 1));
        assert_eq!(month.end_on().naive_utc(), naive(2024, 1, 1) - epsilon());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_by_date_prefers_existing_containing_period() {
        let store = sqlite_store();
        let stored = store.find_or_create_by_date(utc(2024, 5, 5, 0), PeriodType::Month, false).unwrap();

        // A transient lookup still returns the persisted record
        let again = store.find_or_create_by_date(utc(2024, 5, 20, 0), PeriodType::Month, true).unwrap();
        assert_eq!(again.id(), stored.id());
    }

    #[test]
    fn test_by_date_custom_needs_existing_period() {
        let store = sqlite_store();

        let missing = store.find_or_create_by_date(utc(2024, 1, 5, 0), PeriodType::Custom, false);
        assert!(matches!(missing, Err(PeriodError::NoBoundaryRule(PeriodType::Custom))));

        let custom = store
            .find_or_create_with(utc(2024, 1, 1, 0), utc(2024, 1, 10, 0), PeriodType::Custom)
            .unwrap();
        let found = store.find_or_create_by_date(utc(2024, 1, 5, 0), PeriodType::Custom, false).unwrap();
        assert_eq!(found.id(), custom.id());
    }

    #[test]
    fn test_from_year_only() {
        let store = sqlite_store();
        let year = store.find_or_create_from(&DateSpec::year(2024), PeriodType::Month, false).unwrap();

        assert_eq!(year.period_type(), PeriodType::Year);
        assert_eq!(year.start_on().naive_utc(), naive(2024, 1, 1));
        assert_eq!(year.end_on().naive_utc(), naive(2025, 1, 1) - epsilon());
    }

    #[test]
    fn test_from_explicit_date() {
        let store = sqlite_store();
        let spec = DateSpec::date(2024, 2, 29).at(18, 30, 0);

        let day = store.find_or_create_from(&spec, PeriodType::Day, false).unwrap();
        assert_eq!(day.start_on().naive_utc(), naive(2024, 2, 29));

        let month = store.find_or_create_from(&DateSpec::month(2024, 2), PeriodType::Month, true).unwrap();
        assert_eq!(month.name(), "February 2024");
        assert!(!month.is_persisted());
    }

    #[test]
    fn test_from_week() {
        let store = sqlite_store();
        let week = store.find_or_create_from(&DateSpec::week(2021, 1, true), PeriodType::Day, false).unwrap();

        assert_eq!(week.period_type(), PeriodType::Week);
        assert_eq!(week.start_on().naive_utc(), naive(2021, 1, 4));
    }

    #[test]
    fn test_from_invalid_date() {
        let store = sqlite_store();
        let result = store.find_or_create_from(&DateSpec::date(2023, 2, 29), PeriodType::Day, false);

        assert!(matches!(result, Err(PeriodError::InvalidDate(_))));
    }

    #[test]
    fn test_iso_week_one_2024() {
        let (start, end) = week_number_bounds(2024, 1, true).unwrap();

        assert_eq!(start, naive(2024, 1, 1));
        assert_eq!(end, naive(2024, 1, 8) - epsilon());
        assert_eq!(start.iso_week().week(), 1);
        assert_eq!(start.iso_week().year(), 2024);
    }

    #[test]
    fn test_iso_week_one_can_start_in_previous_year() {
        // ISO week 1 of 2025 starts on Monday 2024-12-30
        let (start, _) = week_number_bounds(2025, 1, true).unwrap();
        assert_eq!(start, naive(2024, 12, 30));

        // ...so 2025 has no stub week
        assert!(matches!(
            week_number_bounds(2025, 0, true),
            Err(PeriodError::InvalidWeekNumber { year: 2025, week: 0 })
        ));
    }

    #[test]
    fn test_week_zero_is_stub_before_first_monday() {
        // 2021-01-01 is a Friday; first Monday is 2021-01-04
        let (start, end) = week_number_bounds(2021, 0, false).unwrap();
        assert_eq!(start, naive(2021, 1, 1));
        assert_eq!(end, naive(2021, 1, 4) - epsilon());

        let (start, _) = week_number_bounds(2021, 1, false).unwrap();
        assert_eq!(start, naive(2021, 1, 4));

        let (start, _) = week_number_bounds(2021, 10, false).unwrap();
        assert_eq!(start, naive(2021, 3, 8));
    }

    #[test]
    fn test_week_numbers_past_year_end_are_rejected() {
        assert!(week_number_bounds(2021, 52, false).is_ok());
        assert!(week_number_bounds(2021, 53, false).is_err());
        assert!(week_number_bounds(2020, 53, true).is_ok());
        assert!(week_number_bounds(2021, 53, true).is_err());
    }

    #[test]
    fn test_week_number_matches_date_lookup() {
        let store = sqlite_store();

        let by_number = store.find_or_create_by_week_number(2024, 10, true).unwrap();
        let by_date = store.find_or_create_by_date(utc(2024, 3, 6, 12), PeriodType::Week, false).unwrap();

        assert_eq!(by_number.id(), by_date.id());
        assert_eq!(by_number.pid(), "W10-2024");
    }

    #[test]
    fn test_by_quarter_and_semester() {
        let store = sqlite_store();

        let q4 = store.find_or_create_by_quarter(2023, 4).unwrap();
        assert_eq!(q4.start_on().naive_utc(), naive(2023, 10, 1));
        assert_eq!(q4.end_on().naive_utc(), naive(2024, 1, 1) - epsilon());

        let s2 = store.find_or_create_by_semester(2023, 2).unwrap();
        assert_eq!(s2.start_on().naive_utc(), naive(2023, 7, 1));

        assert!(matches!(
            store.find_or_create_by_quarter(2023, 5),
            Err(PeriodError::InvalidOrdinal { ordinal: 5, .. })
        ));
        assert!(matches!(
            store.find_or_create_by_semester(2023, 0),
            Err(PeriodError::InvalidOrdinal { ordinal: 0, .. })
        ));
    }

    #[test]
    fn test_current_uses_injected_clock() {
        let clock = Arc::new(FixedClock::new(utc(2024, 2, 29, 15)));
        let store = PeriodStore::with_clock(SqlitePeriodRepository::open_in_memory().unwrap(), clock);

        let today = store.current(PeriodType::Day, true).unwrap();
        assert_eq!(today.start_on().naive_utc(), naive(2024, 2, 29));
        assert!(!today.is_persisted());

        let month = store.current(PeriodType::Month, false).unwrap();
        assert_eq!(month.name(), "February 2024");
        assert!(month.is_persisted());
    }

    #[test]
    fn test_following_and_previous() {
        let store = sqlite_store();
        let december = store.find_or_create_by_date(utc(2023, 12, 15, 0), PeriodType::Month, false).unwrap();

        let january = store.following(&december).unwrap();
        assert_eq!(january.start_on().naive_utc(), naive(2024, 1, 1));
        assert!(january.is_persisted());

        let back = store.previous(&january).unwrap();
        assert_eq!(back.id(), december.id());

        let q4 = store.find_or_create_by_quarter(2023, 4).unwrap();
        let q1 = store.following_transient(&q4).unwrap();
        assert_eq!(q1.name(), "Q1.2024");
        assert!(!q1.is_persisted());
    }

    #[test]
    fn test_previous_transient_does_not_persist() {
        let store = sqlite_store();
        let january = store.find_or_create_by_date(utc(2024, 1, 10, 0), PeriodType::Month, false).unwrap();

        let december = store.previous_transient(&january).unwrap();
        assert_eq!(december.start_on().naive_utc(), naive(2023, 12, 1));
        assert_eq!(december.end_on().naive_utc(), naive(2024, 1, 1) - epsilon());
        assert!(!december.is_persisted());
        assert_eq!(store.count().unwrap(), 1);

        // An already stored neighbour is returned as is
        let stored = store.find_or_create_by_date(utc(2023, 12, 20, 0), PeriodType::Month, false).unwrap();
        assert_eq!(store.previous_transient(&january).unwrap().id(), stored.id());
    }

    #[test]
    fn test_following_day_across_leap_day() {
        let store = sqlite_store();
        let feb28 = store.find_or_create_by_date(utc(2024, 2, 28, 0), PeriodType::Day, false).unwrap();

        let feb29 = store.following(&feb28).unwrap();
        let mar1 = store.following(&feb29).unwrap();

        assert_eq!(feb29.start_on().naive_utc(), naive(2024, 2, 29));
        assert_eq!(mar1.start_on().naive_utc(), naive(2024, 3, 1));
        assert!(feb28 < feb29 && feb29 < mar1);
    }

    /// Repository whose first exact lookup misses even when the row exists,
    /// i.e. another creator inserted between our lookup and our insert.
    struct StaleReadRepository {
        inner: SqlitePeriodRepository,
        stale_reads: Cell<usize>,
    }

    impl PeriodRepository for StaleReadRepository {
        fn find_exact(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>> {
            if self.stale_reads.get() > 0 {
                self.stale_reads.set(self.stale_reads.get() - 1);
                return Ok(None);
            }
            self.inner.find_exact(start, end, kind)
        }

        fn find_containing(&self, instant: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>> {
            if self.stale_reads.get() > 0 {
                return Ok(None);
            }
            self.inner.find_containing(instant, kind)
        }

        fn insert(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<InsertOutcome> {
            self.inner.insert(start, end, kind)
        }

        fn get(&self, id: i64) -> Result<Option<Period>> {
            self.inner.get(id)
        }

        fn list_by_type(&self, kind: PeriodType) -> Result<Vec<Period>> {
            self.inner.list_by_type(kind)
        }

        fn count(&self) -> Result<i64> {
            self.inner.count()
        }
    }

    #[test]
    fn test_lost_race_returns_winner() {
        let inner = SqlitePeriodRepository::open_in_memory().unwrap();

        // The "winner" already committed the row
        let winner = match inner
            .insert(
                utc(2024, 1, 1, 0),
                Utc.from_utc_datetime(&(naive(2024, 1, 2) - epsilon())),
                PeriodType::Day,
            )
            .unwrap()
        {
            InsertOutcome::Inserted(p) => p,
            InsertOutcome::Conflict => panic!("fresh table"),
        };

        let store = PeriodStore::new(StaleReadRepository {
            inner,
            stale_reads: Cell::new(1),
        });

        let loser = store.find_or_create_by_date(utc(2024, 1, 1, 9), PeriodType::Day, false).unwrap();

        assert_eq!(loser.id(), winner.id());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_vanishing_row_reports_contention() {
        let inner = SqlitePeriodRepository::open_in_memory().unwrap();
        inner.insert(utc(2024, 1, 1, 0), utc(2024, 1, 5, 0), PeriodType::Custom).unwrap();

        let store = PeriodStore::new(StaleReadRepository {
            inner,
            stale_reads: Cell::new(MAX_CREATE_ATTEMPTS),
        });

        let result = store.find_or_create_with(utc(2024, 1, 1, 0), utc(2024, 1, 5, 0), PeriodType::Custom);
        assert!(matches!(result, Err(PeriodError::Contention { .. })));
    }
}
