use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

/// Studio wall-clock offset. Santiago runs UTC-3 in this dataset and no
/// DST transitions are modeled.
pub fn studio_offset() -> FixedOffset {
    FixedOffset::west_opt(3 * 3600).expect("valid fixed offset")
}

/// The calendar date at the studio for a given instant.
pub fn studio_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&studio_offset()).date_naive()
}

/// UTC bounds of a studio-local calendar day: [local 00:00, next local 00:00).
pub fn day_bounds_utc(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = studio_offset();
    let start_local = date.and_hms_opt(0, 0, 0).expect("midnight exists");
    let start = offset
        .from_local_datetime(&start_local)
        .single()
        .expect("fixed offset is unambiguous")
        .with_timezone(&Utc);
    (start, start + chrono::Duration::days(1))
}

/// Convert a studio-local wall-clock datetime to UTC.
pub fn local_to_utc(local: chrono::NaiveDateTime) -> DateTime<Utc> {
    studio_offset()
        .from_local_datetime(&local)
        .single()
        .expect("fixed offset is unambiguous")
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let (start, end) = day_bounds_utc(date);
        // Local midnight at UTC-3 is 03:00 UTC.
        assert_eq!(start.to_rfc3339(), "2026-03-09T03:00:00+00:00");
        assert_eq!(end - start, chrono::Duration::days(1));
    }

    #[test]
    fn studio_date_rolls_over_at_local_midnight() {
        // 02:30 UTC is still the previous day in Santiago.
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 2, 30, 0).unwrap();
        assert_eq!(studio_date(at), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
    }
}
