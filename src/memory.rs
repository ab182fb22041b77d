// 🧠 In-Memory Period Repository
//
// Same contract as the SQLite repository, backed by a shared vector.
// Clones share the same rows, so several stores (or threads) can race on it;
// the uniqueness check runs under the write lock.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::db::{InsertOutcome, PeriodRepository};
use crate::error::Result;
use crate::kind::PeriodType;
use crate::period::Period;
use crate::timestamp::Timestamp;

#[derive(Default)]
struct Rows {
    periods: Vec<Period>,
    next_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryPeriodRepository {
    rows: Arc<RwLock<Rows>>,
}

impl MemoryPeriodRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Rows> {
        self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Rows> {
        self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn same_row(period: &Period, start: &DateTime<Utc>, end: &DateTime<Utc>, kind: PeriodType) -> bool {
    period.period_type() == kind && period.start_on().to_utc() == *start && period.end_on().to_utc() == *end
}

impl PeriodRepository for MemoryPeriodRepository {
    fn find_exact(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>> {
        let rows = self.read();
        Ok(rows
            .periods
            .iter()
            .find(|p| same_row(p, &start, &end, kind))
            .cloned())
    }

    fn find_containing(&self, instant: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>> {
        let rows = self.read();
        Ok(rows
            .periods
            .iter()
            .filter(|p| p.period_type() == kind)
            .find(|p| p.start_on().to_utc() <= instant && instant <= p.end_on().to_utc())
            .cloned())
    }

    fn insert(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<InsertOutcome> {
        let mut rows = self.write();
        if rows.periods.iter().any(|p| same_row(p, &start, &end, kind)) {
            return Ok(InsertOutcome::Conflict);
        }

        rows.next_id += 1;
        let period = Period::new(Timestamp::Zoned(start), Timestamp::Zoned(end), kind)?.with_id(rows.next_id);
        rows.periods.push(period.clone());

        Ok(InsertOutcome::Inserted(period))
    }

    fn get(&self, id: i64) -> Result<Option<Period>> {
        let rows = self.read();
        Ok(rows.periods.iter().find(|p| p.id() == Some(id)).cloned())
    }

    fn list_by_type(&self, kind: PeriodType) -> Result<Vec<Period>> {
        let rows = self.read();
        let mut periods: Vec<Period> = rows
            .periods
            .iter()
            .filter(|p| p.period_type() == kind)
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.start_on().to_utc());
        Ok(periods)
    }

    fn count(&self) -> Result<i64> {
        Ok(self.read().periods.len() as i64)
    }
}
