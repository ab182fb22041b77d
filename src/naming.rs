// 🏷️ Period Labels
//
// Four outputs per variant, all derived from the period's midpoint:
// - name()      short label          "January 2024"
// - full_name() descriptive label    "1st Quarter 2024 (January to March 2024)"
// - str_id()    sortable, URL-safe   "2024-Q1"
// - pid()       identity for equality, type-tagged so variants never collide

use chrono::{Datelike, NaiveDateTime};

use crate::period::Period;

/// Sortable compact timestamp with microseconds
const COMPACT_FORMAT: &str = "%Y%m%dT%H%M%S%6f";

fn middle(period: &Period) -> NaiveDateTime {
    period.middle().naive_utc()
}

fn epoch_seconds(period: &Period) -> i64 {
    period.middle().to_utc().timestamp()
}

/// 1 → "1st", 2 → "2nd", 11 → "11th", 22 → "22nd"
pub fn ordinal(value: u32) -> String {
    let suffix = if value % 100 / 10 == 1 {
        "th"
    } else {
        match value % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{}{}", value, suffix)
}

/// Quarter number (1-4) of a datetime
pub fn quarter_of(dt: &NaiveDateTime) -> u32 {
    dt.month0() / 3 + 1
}

/// Semester number (1-2) of a datetime
pub fn semester_of(dt: &NaiveDateTime) -> u32 {
    dt.month0() / 6 + 1
}

// ============================================================================
// DAY
// ============================================================================

pub fn day_name(period: &Period) -> String {
    middle(period).format("%-m/%d/%y").to_string()
}

pub fn day_full_name(period: &Period) -> String {
    middle(period).format("%B %d %Y").to_string()
}

pub fn day_str_id(period: &Period) -> String {
    middle(period).format("%Y-%m-%d").to_string()
}

pub fn day_pid(period: &Period) -> String {
    format!("D{}", epoch_seconds(period))
}

// ============================================================================
// WEEK (ISO week numbering)
// ============================================================================

pub fn week_name(period: &Period) -> String {
    let week = middle(period).iso_week();
    format!("{}/{}", week.week(), week.year())
}

pub fn week_full_name(period: &Period) -> String {
    format!(
        "Week {} ({} to {})",
        middle(period).iso_week().week(),
        period.start_on().naive_utc().format("%d"),
        period.end_on().naive_utc().format("%d %B %Y"),
    )
}

pub fn week_str_id(period: &Period) -> String {
    let week = middle(period).iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub fn week_pid(period: &Period) -> String {
    let week = middle(period).iso_week();
    format!("W{:02}-{}", week.week(), week.year())
}

// ============================================================================
// MONTH
// ============================================================================

pub fn month_name(period: &Period) -> String {
    middle(period).format("%B %Y").to_string()
}

pub fn month_str_id(period: &Period) -> String {
    middle(period).format("%Y-%m").to_string()
}

pub fn month_pid(period: &Period) -> String {
    middle(period).format("%m%Y").to_string()
}

// ============================================================================
// QUARTER / SEMESTER
// ============================================================================

pub fn quarter_name(period: &Period) -> String {
    let mid = middle(period);
    format!("Q{}.{}", quarter_of(&mid), mid.year())
}

pub fn quarter_full_name(period: &Period) -> String {
    spanning_full_name(period, quarter_of(&middle(period)), "Quarter")
}

pub fn quarter_str_id(period: &Period) -> String {
    let mid = middle(period);
    format!("{}-Q{}", mid.year(), quarter_of(&mid))
}

pub fn quarter_pid(period: &Period) -> String {
    let mid = middle(period);
    format!("Q{}.{}", quarter_of(&mid), mid.year())
}

pub fn semester_name(period: &Period) -> String {
    let mid = middle(period);
    format!("S{}.{}", semester_of(&mid), mid.year())
}

pub fn semester_full_name(period: &Period) -> String {
    spanning_full_name(period, semester_of(&middle(period)), "Semester")
}

pub fn semester_str_id(period: &Period) -> String {
    let mid = middle(period);
    format!("{}-S{}", mid.year(), semester_of(&mid))
}

pub fn semester_pid(period: &Period) -> String {
    let mid = middle(period);
    format!("S{}.{}", semester_of(&mid), mid.year())
}

/// "2nd Quarter 2024 (April to June 2024)"
fn spanning_full_name(period: &Period, number: u32, label: &str) -> String {
    format!(
        "{} {} {} ({} to {})",
        ordinal(number),
        label,
        middle(period).year(),
        period.start_on().naive_utc().format("%B"),
        period.end_on().naive_utc().format("%B %Y"),
    )
}

// ============================================================================
// YEAR
// ============================================================================

pub fn year_name(period: &Period) -> String {
    middle(period).year().to_string()
}

pub fn year_str_id(period: &Period) -> String {
    middle(period).format("%Y").to_string()
}

pub fn year_pid(period: &Period) -> String {
    format!("Y{}", middle(period).year())
}

// ============================================================================
// CUSTOM
// ============================================================================

pub fn custom_name(period: &Period) -> String {
    middle(period).format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn custom_full_name(period: &Period) -> String {
    format!(
        "{} to {}",
        period.start_on().naive_utc().format("%Y-%m-%d %H:%M:%S"),
        period.end_on().naive_utc().format("%Y-%m-%d %H:%M:%S"),
    )
}

/// "20240101T000000000000--20240103T000000000000", fixed width so text order
/// follows start then end
pub fn custom_str_id(period: &Period) -> String {
    format!(
        "{}--{}",
        period.start_on().naive_utc().format(COMPACT_FORMAT),
        period.end_on().naive_utc().format(COMPACT_FORMAT),
    )
}

pub fn custom_pid(period: &Period) -> String {
    format!("C{}", epoch_seconds(period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_ordinal_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
        assert_eq!(ordinal(112), "112th");
    }

    fn custom(start: (i32, u32, u32), end: (i32, u32, u32)) -> Period {
        let at = |(y, m, d): (i32, u32, u32)| {
            Timestamp::Zoned(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap())
        };
        Period::custom(at(start), at(end)).unwrap()
    }

    #[test]
    fn test_custom_str_id_sorts_like_time() {
        let early = custom((1990, 1, 1), (1990, 1, 3));
        let late = custom((2024, 1, 1), (2024, 1, 3));
        let ancient = custom((1960, 5, 1), (1960, 5, 2));

        assert!(early < late);
        assert!(early.str_id() < late.str_id());
        assert!(ancient.str_id() < early.str_id());
        assert_eq!(late.str_id(), "20240101T000000000000--20240103T000000000000");

        let mut ids = vec![late.str_id(), ancient.str_id(), early.str_id()];
        ids.sort();
        assert_eq!(ids, vec![ancient.str_id(), early.str_id(), late.str_id()]);
    }

    #[test]
    fn test_custom_str_id_tells_same_midpoint_apart() {
        let narrow = custom((2024, 1, 1), (2024, 1, 3));
        let wide = custom((2023, 12, 31), (2024, 1, 4));

        assert_eq!(narrow.middle(), wide.middle());
        assert_ne!(narrow.str_id(), wide.str_id());
    }
}
