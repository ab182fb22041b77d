// 🧩 Decomposer - tile a coarse period with finer ones
//
// Walks from the coarse period's start using each finer period's own
// following() neighbour, so variable-length months and quarters never drift.
// Finer periods are resolved transiently: nothing new is persisted.

use crate::db::PeriodRepository;
use crate::error::{PeriodError, Result};
use crate::kind::PeriodType;
use crate::period::Period;
use crate::store::PeriodStore;
use crate::timestamp::{normalize, Timestamp};

enum Cursor {
    /// Same type requested: the period itself
    Whole(Period),

    /// Nothing yielded yet; resolve the finer period covering this instant
    Start(Timestamp),

    /// Last yielded period; the next one is its following()
    After(Period),

    Done,
}

/// Ordered, finite sequence of finer periods covering a coarser one.
/// Built fresh by every `subdivide` call.
pub struct Subdivisions<'a, R: PeriodRepository> {
    store: &'a PeriodStore<R>,
    finer: PeriodType,
    /// Coarse period's end, zoned
    end: Timestamp,
    cursor: Cursor,
}

impl<'a, R: PeriodRepository> Subdivisions<'a, R> {
    fn new(store: &'a PeriodStore<R>, period: &Period, finer: PeriodType) -> Self {
        let cursor = if finer == period.period_type() {
            Cursor::Whole(period.clone())
        } else {
            Cursor::Start(period.start_on())
        };

        Subdivisions {
            store,
            finer,
            end: normalize(period.end_on(), true),
            cursor,
        }
    }

    fn starts_after_end(&self, period: &Period) -> bool {
        normalize(period.start_on(), true).naive_utc() > self.end.naive_utc()
    }
}

impl<'a, R: PeriodRepository> Iterator for Subdivisions<'a, R> {
    type Item = Result<Period>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return None,
            Cursor::Whole(period) => return Some(Ok(period)),
            Cursor::Start(instant) => self.store.find_or_create_by_date(instant, self.finer, true),
            Cursor::After(previous) => match self.store.following_transient(&previous) {
                // A stored period that doesn't move forward would loop forever
                Ok(next) if next.start_on().to_utc() <= previous.start_on().to_utc() => {
                    return Some(Err(PeriodError::StalledWalk {
                        kind: self.finer,
                        after: previous.start_on().to_string(),
                    }));
                }
                other => other,
            },
        };

        match step {
            Ok(period) if self.starts_after_end(&period) => None,
            Ok(period) => {
                self.cursor = Cursor::After(period.clone());
                Some(Ok(period))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl<R: PeriodRepository> PeriodStore<R> {
    /// Lazily walk the `finer` periods covering `period`
    pub fn subdivide<'a>(&'a self, period: &Period, finer: PeriodType) -> Subdivisions<'a, R> {
        Subdivisions::new(self, period, finer)
    }

    /// All `finer` periods covering `period`, in order
    pub fn subdivide_all(&self, period: &Period, finer: PeriodType) -> Result<Vec<Period>> {
        self.subdivide(period, finer).collect()
    }

    pub fn days(&self, period: &Period) -> Result<Vec<Period>> {
        self.subdivide_all(period, PeriodType::Day)
    }

    pub fn weeks(&self, period: &Period) -> Result<Vec<Period>> {
        self.subdivide_all(period, PeriodType::Week)
    }

    pub fn months(&self, period: &Period) -> Result<Vec<Period>> {
        self.subdivide_all(period, PeriodType::Month)
    }

    pub fn quarters(&self, period: &Period) -> Result<Vec<Period>> {
        self.subdivide_all(period, PeriodType::Quarter)
    }

    pub fn semesters(&self, period: &Period) -> Result<Vec<Period>> {
        self.subdivide_all(period, PeriodType::Semester)
    }

    pub fn years(&self, period: &Period) -> Result<Vec<Period>> {
        self.subdivide_all(period, PeriodType::Year)
    }
}
