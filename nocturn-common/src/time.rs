//! Night and timestamp utilities
//!
//! Clips are grouped by the monitoring *night* rather than the calendar date:
//! the station-local 24-hour period starting at local noon that contains a
//! given instant.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};

/// Get the night containing `time`, identified by the date of its starting
/// noon.
///
/// An instant at or after local noon belongs to that date's night; an instant
/// before noon belongs to the previous date's night.
pub fn night_of(time: NaiveDateTime) -> NaiveDate {
    if time.hour() >= 12 {
        time.date()
    } else {
        time.date() - Duration::days(1)
    }
}

/// Interpret a station-local naive timestamp as a UTC instant.
///
/// Station UTC offsets are not modeled by the import pipeline; local and UTC
/// are treated as coincident, matching the stored-instant convention of the
/// destination archive.
pub fn utc_from_naive(time: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_night_of_evening_belongs_to_same_date() {
        let night = night_of(dt(2012, 9, 15, 21, 30, 0));
        assert_eq!(night, NaiveDate::from_ymd_opt(2012, 9, 15).unwrap());
    }

    #[test]
    fn test_night_of_early_morning_belongs_to_previous_date() {
        let night = night_of(dt(2012, 9, 16, 3, 15, 0));
        assert_eq!(night, NaiveDate::from_ymd_opt(2012, 9, 15).unwrap());
    }

    #[test]
    fn test_night_of_noon_starts_new_night() {
        let night = night_of(dt(2012, 9, 16, 12, 0, 0));
        assert_eq!(night, NaiveDate::from_ymd_opt(2012, 9, 16).unwrap());
    }

    #[test]
    fn test_night_of_just_before_noon() {
        let night = night_of(dt(2012, 9, 16, 11, 59, 59));
        assert_eq!(night, NaiveDate::from_ymd_opt(2012, 9, 15).unwrap());
    }

    #[test]
    fn test_night_of_crosses_month_boundary() {
        let night = night_of(dt(2012, 10, 1, 2, 0, 0));
        assert_eq!(night, NaiveDate::from_ymd_opt(2012, 9, 30).unwrap());
    }

    #[test]
    fn test_night_of_crosses_year_boundary() {
        let night = night_of(dt(2013, 1, 1, 4, 0, 0));
        assert_eq!(night, NaiveDate::from_ymd_opt(2012, 12, 31).unwrap());
    }

    #[test]
    fn test_utc_from_naive_preserves_fields() {
        let utc = utc_from_naive(dt(2012, 1, 2, 12, 34, 56));
        assert_eq!(utc.naive_utc(), dt(2012, 1, 2, 12, 34, 56));
    }
}
