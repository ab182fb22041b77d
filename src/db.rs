// 🗄️ Period Storage - repository seam + SQLite implementation
//
// The store only needs five things from persistence: exact lookup by
// (start, end, type), a containment scan filtered by type, insert with
// uniqueness-violation detection, get-by-id, and a per-type listing.
// Timestamps are persisted as zoned UTC text with microsecond precision.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{PeriodError, Result};
use crate::kind::PeriodType;
use crate::period::Period;
use crate::timestamp::Timestamp;

/// Fixed-width storage format (equal instants always encode identically)
const STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

// ============================================================================
// REPOSITORY TRAIT
// ============================================================================

/// Result of an insert attempt
#[derive(Debug)]
pub enum InsertOutcome {
    /// Row created; the period carries its new id
    Inserted(Period),

    /// An equal (start, end, type) row already exists
    Conflict,
}

/// Backing record store for periods
pub trait PeriodRepository {
    /// Row with exactly these bounds and type
    fn find_exact(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>>;

    /// First (oldest) row of `kind` with start_on <= instant <= end_on
    fn find_containing(&self, instant: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>>;

    /// Insert, reporting a uniqueness violation as `Conflict`
    fn insert(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<InsertOutcome>;

    fn get(&self, id: i64) -> Result<Option<Period>>;

    /// All rows of one type, ordered by start_on
    fn list_by_type(&self, kind: PeriodType) -> Result<Vec<Period>>;

    fn count(&self) -> Result<i64>;
}

// ============================================================================
// ENCODING
// ============================================================================

pub fn encode_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, PARSE_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| PeriodError::CorruptRecord(format!("bad timestamp '{}': {}", raw, e)))
}

/// Raw column values of one `periods` row
struct PeriodRow {
    id: i64,
    start_on: String,
    end_on: String,
    period_type: String,
}

impl PeriodRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(PeriodRow {
            id: row.get(0)?,
            start_on: row.get(1)?,
            end_on: row.get(2)?,
            period_type: row.get(3)?,
        })
    }

    fn into_period(self) -> Result<Period> {
        let kind: PeriodType = self
            .period_type
            .parse()
            .map_err(|_| PeriodError::CorruptRecord(format!("row {}: unknown type '{}'", self.id, self.period_type)))?;
        let start = Timestamp::Zoned(decode_timestamp(&self.start_on)?);
        let end = Timestamp::Zoned(decode_timestamp(&self.end_on)?);

        Period::new(start, end, kind)
            .map(|period| period.with_id(self.id))
            .map_err(|e| PeriodError::CorruptRecord(format!("row {}: {}", self.id, e)))
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode so concurrent creators don't block readers
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS periods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_on TEXT NOT NULL,
            end_on TEXT NOT NULL,
            period_type TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (start_on, end_on, period_type)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_periods_type ON periods(period_type)",
        [],
    )?;

    debug!("periods schema ready");
    Ok(())
}

// ============================================================================
// SQLITE REPOSITORY
// ============================================================================

pub struct SqlitePeriodRepository {
    conn: Connection,
}

impl SqlitePeriodRepository {
    /// Wrap an open connection, creating the schema if needed
    pub fn new(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqlitePeriodRepository { conn })
    }

    /// Open the database file named by the configuration
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_path(&config.database_path, config.busy_timeout_ms)
    }

    pub fn open_path(path: &Path, busy_timeout_ms: u64) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl PeriodRepository for SqlitePeriodRepository {
    fn find_exact(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, start_on, end_on, period_type
                 FROM periods
                 WHERE start_on = ?1 AND end_on = ?2 AND period_type = ?3",
                params![encode_timestamp(&start), encode_timestamp(&end), kind.as_str()],
                PeriodRow::from_row,
            )
            .optional()?;

        row.map(PeriodRow::into_period).transpose()
    }

    fn find_containing(&self, instant: DateTime<Utc>, kind: PeriodType) -> Result<Option<Period>> {
        // Containment is tested on decoded timestamps, not on the stored text,
        // so it stays correct for years outside 0000-9999.
        let mut stmt = self.conn.prepare(
            "SELECT id, start_on, end_on, period_type
             FROM periods
             WHERE period_type = ?1
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![kind.as_str()], PeriodRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for row in rows {
            let period = row.into_period()?;
            let start = period.start_on().to_utc();
            let end = period.end_on().to_utc();
            if start <= instant && instant <= end {
                return Ok(Some(period));
            }
        }

        Ok(None)
    }

    fn insert(&self, start: DateTime<Utc>, end: DateTime<Utc>, kind: PeriodType) -> Result<InsertOutcome> {
        let result = self.conn.execute(
            "INSERT INTO periods (start_on, end_on, period_type) VALUES (?1, ?2, ?3)",
            params![encode_timestamp(&start), encode_timestamp(&end), kind.as_str()],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                let period = Period::new(Timestamp::Zoned(start), Timestamp::Zoned(end), kind)?.with_id(id);
                Ok(InsertOutcome::Inserted(period))
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(InsertOutcome::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: i64) -> Result<Option<Period>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, start_on, end_on, period_type FROM periods WHERE id = ?1",
                params![id],
                PeriodRow::from_row,
            )
            .optional()?;

        row.map(PeriodRow::into_period).transpose()
    }

    fn list_by_type(&self, kind: PeriodType) -> Result<Vec<Period>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_on, end_on, period_type
             FROM periods
             WHERE period_type = ?1
             ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![kind.as_str()], PeriodRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut periods = rows
            .into_iter()
            .map(PeriodRow::into_period)
            .collect::<Result<Vec<_>>>()?;
        periods.sort_by_key(|p| p.start_on().to_utc());

        Ok(periods)
    }

    fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM periods", [], |row| row.get(0))?;

        Ok(count)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn end_of_day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        utc(y, m, d) + chrono::Duration::days(1) - chrono::Duration::microseconds(1)
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let repo = SqlitePeriodRepository::new(conn).unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[test]
    fn test_timestamp_encoding_round_trip() {
        let dt = end_of_day(2024, 2, 29);
        let raw = encode_timestamp(&dt);

        assert_eq!(raw, "2024-02-29T23:59:59.999999Z");
        assert_eq!(decode_timestamp(&raw).unwrap(), dt);
    }

    #[test]
    fn test_insert_then_find_exact() {
        let repo = SqlitePeriodRepository::open_in_memory().unwrap();

        let inserted = match repo.insert(utc(2024, 1, 1), end_of_day(2024, 1, 1), PeriodType::Day).unwrap() {
            InsertOutcome::Inserted(p) => p,
            InsertOutcome::Conflict => panic!("fresh table should not conflict"),
        };

        let found = repo
            .find_exact(utc(2024, 1, 1), end_of_day(2024, 1, 1), PeriodType::Day)
            .unwrap()
            .unwrap();

        assert_eq!(found.id(), inserted.id());
        assert!(found.is_aware().unwrap());

        // Same bounds, different type: no match
        let other = repo
            .find_exact(utc(2024, 1, 1), end_of_day(2024, 1, 1), PeriodType::Custom)
            .unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_duplicate_insert_is_conflict() {
        let repo = SqlitePeriodRepository::open_in_memory().unwrap();

        repo.insert(utc(2024, 1, 1), end_of_day(2024, 1, 1), PeriodType::Day).unwrap();
        let second = repo.insert(utc(2024, 1, 1), end_of_day(2024, 1, 1), PeriodType::Day).unwrap();

        assert!(matches!(second, InsertOutcome::Conflict));
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_find_containing_filters_by_type() {
        let repo = SqlitePeriodRepository::open_in_memory().unwrap();
        repo.insert(utc(2024, 1, 1), end_of_day(2024, 1, 31), PeriodType::Month).unwrap();
        repo.insert(utc(2024, 1, 15), end_of_day(2024, 1, 15), PeriodType::Day).unwrap();

        let noon = utc(2024, 1, 15) + chrono::Duration::hours(12);

        let month = repo.find_containing(noon, PeriodType::Month).unwrap().unwrap();
        assert_eq!(month.period_type(), PeriodType::Month);

        let day = repo.find_containing(noon, PeriodType::Day).unwrap().unwrap();
        assert_eq!(day.period_type(), PeriodType::Day);

        assert!(repo.find_containing(noon, PeriodType::Week).unwrap().is_none());
        assert!(repo.find_containing(utc(2024, 2, 1), PeriodType::Month).unwrap().is_none());
    }

    #[test]
    fn test_get_and_list_by_type() {
        let repo = SqlitePeriodRepository::open_in_memory().unwrap();
        repo.insert(utc(2024, 1, 3), end_of_day(2024, 1, 3), PeriodType::Day).unwrap();
        repo.insert(utc(2024, 1, 1), end_of_day(2024, 1, 1), PeriodType::Day).unwrap();
        repo.insert(utc(2024, 1, 1), end_of_day(2024, 1, 31), PeriodType::Month).unwrap();

        let days = repo.list_by_type(PeriodType::Day).unwrap();
        assert_eq!(days.len(), 2);
        assert!(days[0] < days[1]);

        let first_id = days[1].id().unwrap();
        let fetched = repo.get(first_id).unwrap().unwrap();
        assert_eq!(fetched, days[1]);

        assert!(repo.get(9_999).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let repo = SqlitePeriodRepository::open_in_memory().unwrap();
        repo.connection()
            .execute(
                "INSERT INTO periods (start_on, end_on, period_type) VALUES (?1, ?2, ?3)",
                params!["2024-01-01T00:00:00.000000Z", "2024-01-01T23:59:59.999999Z", "fortnight"],
            )
            .unwrap();

        let result = repo.get(1);
        assert!(matches!(result, Err(PeriodError::CorruptRecord(_))));
    }
}
