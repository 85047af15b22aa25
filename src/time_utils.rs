use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::ApiError;

/// All day-boundary math runs in fixed UTC+9 (KST), never in the host
/// process timezone. A wrong day here means a wrong "yesterday" comparison
/// and a wrong recommendation downstream.
const KST_OFFSET_SECONDS: i32 = 9 * 3600;

pub fn kst_offset() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECONDS).expect("valid fixed offset")
}

/// Start and end of one civil day in KST. Start is inclusive midnight,
/// end is inclusive 23:59:59.999 of the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Parse a `YYYY-MM-DD` date string, rejecting anything malformed.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("invalid date '{raw}', expected YYYY-MM-DD")))
}

/// Day boundaries for `date` in KST.
pub fn day_window(date: NaiveDate) -> DayWindow {
    let start_local = kst_offset()
        .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"))
        .single()
        .expect("fixed offsets are unambiguous");
    let start = start_local.with_timezone(&Utc);
    DayWindow {
        start,
        end: start + Duration::days(1) - Duration::milliseconds(1),
    }
}

/// Day boundaries for the day immediately before `date`, in KST.
pub fn previous_day_window(date: NaiveDate) -> DayWindow {
    day_window(date - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_and_rejects_garbage() {
        assert_eq!(
            parse_date("2025-07-15").unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
        );
        assert_eq!(
            parse_date(" 2025-07-15 ").unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
        );
        assert!(parse_date("2025-13-01").is_err());
        assert!(parse_date("2025/07/15").is_err());
        assert!(parse_date("15-07-2025").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn day_window_is_fixed_to_kst() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let window = day_window(date);

        // Midnight KST on 2025-07-15 is 15:00 UTC the previous day.
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2025, 7, 14, 15, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2025, 7, 15, 14, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn previous_day_window_ends_exactly_at_start_of_day() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
        let current = day_window(date);
        let previous = previous_day_window(date);

        assert_eq!(previous.end + Duration::milliseconds(1), current.start);
        assert_eq!(
            previous.end - previous.start,
            Duration::days(1) - Duration::milliseconds(1)
        );
    }

    #[test]
    fn previous_day_window_crosses_month_and_year_boundaries() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let previous = previous_day_window(date);
        assert_eq!(
            previous.start,
            day_window(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()).start
        );
    }

    #[test]
    fn window_contains_both_ends() {
        let window = day_window(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
    }
}
