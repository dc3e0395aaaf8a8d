use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// UTC calendar month of `at` as `YYYY-MM`.
pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// UTC calendar date of `at`.
pub fn today_utc(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// First instant of the UTC month containing `at`.
pub fn month_start(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(at.year(), at.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(at)
}
