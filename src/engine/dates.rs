//! Shared date parsing for extracted listings.
//!
//! Accepts `YYYY-MM-DD`, `MM/DD/YYYY`, `DD-MM-YYYY`, and relative forms
//! ("today", "yesterday", "N {days|hours|weeks} ago"). Anything else parses
//! to `None` rather than erroring — callers treat a missing posted date as
//! acceptable, not a parse failure.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

static RELATIVE_AGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*(day|hour|week)s?\s+ago\s*$").unwrap()
});

/// `tz` anchors bare calendar dates (no explicit offset); relative forms
/// ("today", "N days ago") are computed directly off `now` and ignore it.
pub fn parse_date(input: &str, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    match s.to_lowercase().as_str() {
        "today" => return Some(now),
        "yesterday" => return Some(now - ChronoDuration::days(1)),
        _ => {}
    }

    if let Some(caps) = RELATIVE_AGO.captures(s) {
        let amount: i64 = caps[1].parse().ok()?;
        let unit = caps[2].to_lowercase();
        let delta = match unit.as_str() {
            "day" => ChronoDuration::days(amount),
            "hour" => ChronoDuration::hours(amount),
            "week" => ChronoDuration::weeks(amount),
            _ => return None,
        };
        return Some(now - delta);
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local_to_utc(d, tz);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return local_to_utc(d, tz);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d-%m-%Y") {
        return local_to_utc(d, tz);
    }

    None
}

fn local_to_utc(d: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let naive = d.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&naive).single().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_iso_date() {
        let d = parse_date("2026-01-02", now(), chrono_tz::UTC).unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2026-01-02");
    }

    #[test]
    fn parses_us_date() {
        let d = parse_date("01/02/2026", now(), chrono_tz::UTC).unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2026-01-02");
    }

    #[test]
    fn parses_relative_today_and_yesterday() {
        assert_eq!(parse_date("today", now(), chrono_tz::UTC).unwrap(), now());
        assert_eq!(
            parse_date("Yesterday", now(), chrono_tz::UTC).unwrap(),
            now() - ChronoDuration::days(1)
        );
    }

    #[test]
    fn parses_relative_n_units_ago() {
        let d = parse_date("3 days ago", now(), chrono_tz::UTC).unwrap();
        assert_eq!(d, now() - ChronoDuration::days(3));
        let d = parse_date("2 weeks ago", now(), chrono_tz::UTC).unwrap();
        assert_eq!(d, now() - ChronoDuration::weeks(2));
    }

    #[test]
    fn bare_date_is_interpreted_in_board_timezone() {
        let ny: chrono_tz::Tz = "America/New_York".parse().unwrap();
        let d = parse_date("2026-01-02", now(), ny).unwrap();
        // midnight Eastern on 2026-01-02 is 05:00 UTC (EST, UTC-5)
        assert_eq!(d, Utc.with_ymd_and_hms(2026, 1, 2, 5, 0, 0).unwrap());
    }

    #[test]
    fn unparseable_is_none() {
        assert!(parse_date("whenever", now(), chrono_tz::UTC).is_none());
        assert!(parse_date("", now(), chrono_tz::UTC).is_none());
    }
}
