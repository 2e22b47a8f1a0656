// ABOUTME: Parses the `--since` lower bound for the dms command.
// ABOUTME: Accepts a small fixed grammar of relative and absolute times.

use crate::error::{CliError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

const EXAMPLES: &str = "try 'today', 'yesterday', '3 days ago', '2025-10-20', or an RFC 3339 time";

/// Resolve `input` relative to `now`.
///
/// Grammar: `now`, `today`, `yesterday`, `N minute(s)|hour(s)|day(s)|week(s) ago`,
/// `YYYY-MM-DD` (midnight in `now`'s zone), or RFC 3339.
pub fn parse_since<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let text = input.trim().to_ascii_lowercase();
    let zone = now.timezone();

    match text.as_str() {
        "now" => return Ok(now.clone()),
        "today" => return midnight(&zone, now.date_naive(), input),
        "yesterday" => {
            let day = now.date_naive() - Duration::days(1);
            return midnight(&zone, day, input);
        }
        _ => {}
    }

    if let Some(span) = relative(&text) {
        return Ok(now.clone() - span);
    }
    if let Ok(day) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return midnight(&zone, day, input);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(input.trim()) {
        return Ok(at.with_timezone(&zone));
    }

    Err(unparseable(input))
}

/// `N unit(s) ago`
fn relative(text: &str) -> Option<Duration> {
    let mut words = text.split_whitespace();
    let count: i64 = words.next()?.parse().ok()?;
    let unit = words.next()?;
    if words.next()? != "ago" || words.next().is_some() || count < 0 {
        return None;
    }
    let span = match unit.strip_suffix('s').unwrap_or(unit) {
        "minute" | "min" => Duration::try_minutes(count)?,
        "hour" => Duration::try_hours(count)?,
        "day" => Duration::try_days(count)?,
        "week" => Duration::try_weeks(count)?,
        _ => return None,
    };
    Some(span)
}

fn midnight<Tz: TimeZone>(zone: &Tz, day: NaiveDate, input: &str) -> Result<DateTime<Tz>> {
    zone.from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .ok_or_else(|| unparseable(input))
}

fn unparseable(input: &str) -> CliError {
    CliError::Usage(format!("could not parse time '{}': {}", input, EXAMPLES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 22, 15, 30, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_named_days() {
        assert_eq!(parse_since("now", &now()).unwrap(), now());
        assert_eq!(parse_since("today", &now()).unwrap(), at(2025, 10, 22, 0, 0));
        assert_eq!(
            parse_since(" Yesterday ", &now()).unwrap(),
            at(2025, 10, 21, 0, 0)
        );
    }

    #[test]
    fn test_relative_spans() {
        assert_eq!(
            parse_since("3 days ago", &now()).unwrap(),
            at(2025, 10, 19, 15, 30)
        );
        assert_eq!(
            parse_since("1 hour ago", &now()).unwrap(),
            at(2025, 10, 22, 14, 30)
        );
        assert_eq!(
            parse_since("2 weeks ago", &now()).unwrap(),
            at(2025, 10, 8, 15, 30)
        );
        assert_eq!(
            parse_since("45 minutes ago", &now()).unwrap(),
            at(2025, 10, 22, 14, 45)
        );
    }

    #[test]
    fn test_absolute_dates() {
        assert_eq!(
            parse_since("2025-10-20", &now()).unwrap(),
            at(2025, 10, 20, 0, 0)
        );
        assert_eq!(
            parse_since("2025-10-20T08:15:00+02:00", &now()).unwrap(),
            at(2025, 10, 20, 6, 15)
        );
    }

    #[test]
    fn test_rejects_everything_else() {
        for input in ["", "last tuesday", "3 fortnights ago", "days ago", "3 days", "-1 days ago"] {
            let err = parse_since(input, &now()).unwrap_err();
            assert!(matches!(err, CliError::Usage(_)), "{input}");
        }
    }
}
