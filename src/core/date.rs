use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Granularity at which a stored date is known.
///
/// Stored as an integer in `field__precision` columns; the codes are part of
/// the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePrecision {
    DateAndTime,
    DateOnly,
    MonthOnly,
    YearOnly,
}

impl DatePrecision {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::DateAndTime => 0,
            Self::DateOnly => 1,
            Self::MonthOnly => 2,
            Self::YearOnly => 3,
        }
    }

    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::DateAndTime),
            1 => Some(Self::DateOnly),
            2 => Some(Self::MonthOnly),
            3 => Some(Self::YearOnly),
            _ => None,
        }
    }
}

/// Normalized date value plus inferred precision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    pub value: String,
    pub precision: DatePrecision,
}

impl ParsedDate {
    fn new(datetime: NaiveDateTime, with_time: bool, precision: DatePrecision) -> Self {
        let value = if with_time {
            datetime.format("%Y-%m-%d %H:%M:%S").to_string()
        } else {
            datetime.format("%Y-%m-%d").to_string()
        };
        Self { value, precision }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %I:%M%p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%d %B %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Parse a raw date string and infer its precision.
///
/// - all digits and shorter than 8 characters: a bare year (`YearOnly`, Jan 1st)
/// - exactly one space, `/` or `-`: year and month (`MonthOnly`, 1st of month)
/// - otherwise a full parse; for datetime fields a midnight time is downgraded
///   to `DateOnly` unless the input contains "00", "AM" or "am"
///
/// The heuristic guesses intent from punctuation and can misclassify unusual
/// inputs (e.g. "2000-01-01" as a datetime keeps `DateAndTime`). Calendar-style
/// consumers depend on these exact results.
#[must_use]
pub fn parse_date_value(raw: &str, with_time: bool) -> Option<ParsedDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit()) && s.len() < 8 {
        let year: i32 = s.parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, 1, 1)?;
        return Some(ParsedDate::new(
            date.and_time(NaiveTime::MIN),
            with_time,
            DatePrecision::YearOnly,
        ));
    }

    let separators = s.chars().filter(|c| matches!(c, ' ' | '/' | '-')).count();
    if separators == 1 {
        let date = parse_year_month(s)?;
        return Some(ParsedDate::new(
            date.and_time(NaiveTime::MIN),
            with_time,
            DatePrecision::MonthOnly,
        ));
    }

    let datetime = parse_full(s)?;
    let precision = if !with_time {
        DatePrecision::DateOnly
    } else if datetime.time() == NaiveTime::MIN
        && !s.contains("00")
        && !s.contains("AM")
        && !s.contains("am")
    {
        DatePrecision::DateOnly
    } else {
        DatePrecision::DateAndTime
    };
    Some(ParsedDate::new(datetime, with_time, precision))
}

/// "2020-06", "2020/6", "June 2020", "06/2020"
fn parse_year_month(s: &str) -> Option<NaiveDate> {
    let (a, b) = s.split_once([' ', '/', '-'])?;
    let (a, b) = (a.trim(), b.trim());

    let year_of = |part: &str| -> Option<i32> {
        if !part.is_empty() && part.len() <= 4 && part.chars().all(|c| c.is_ascii_digit()) {
            part.parse().ok()
        } else {
            None
        }
    };

    let (year, month) = match (year_of(a), month_of(b)) {
        (Some(y), Some(m)) if a.len() == 4 || month_of(a).is_none() => (y, m),
        _ => (year_of(b)?, month_of(a)?),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_of(part: &str) -> Option<u32> {
    if let Ok(n) = part.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let lower = part.trim_end_matches('.').to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(&lower))
        .map(|idx| idx as u32 + 1)
}

fn parse_full(s: &str) -> Option<NaiveDateTime> {
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_year() {
        let parsed = parse_date_value("2020", false).unwrap();
        assert_eq!(parsed.value, "2020-01-01");
        assert_eq!(parsed.precision, DatePrecision::YearOnly);
    }

    #[test]
    fn test_year_month() {
        let parsed = parse_date_value("2020-06", false).unwrap();
        assert_eq!(parsed.value, "2020-06-01");
        assert_eq!(parsed.precision, DatePrecision::MonthOnly);

        let parsed = parse_date_value("June 2020", false).unwrap();
        assert_eq!(parsed.value, "2020-06-01");
        assert_eq!(parsed.precision, DatePrecision::MonthOnly);

        let parsed = parse_date_value("06/2020", false).unwrap();
        assert_eq!(parsed.value, "2020-06-01");
    }

    #[test]
    fn test_full_datetime() {
        let parsed = parse_date_value("2020-06-15 14:30", true).unwrap();
        assert_eq!(parsed.value, "2020-06-15 14:30:00");
        assert_eq!(parsed.precision, DatePrecision::DateAndTime);
    }

    #[test]
    fn test_plain_date() {
        let parsed = parse_date_value("2020-06-15", false).unwrap();
        assert_eq!(parsed.value, "2020-06-15");
        assert_eq!(parsed.precision, DatePrecision::DateOnly);

        let parsed = parse_date_value("June 15, 2020", false).unwrap();
        assert_eq!(parsed.value, "2020-06-15");
    }

    #[test]
    fn test_datetime_at_midnight_downgrades() {
        let parsed = parse_date_value("2021-06-15", true).unwrap();
        assert_eq!(parsed.value, "2021-06-15 00:00:00");
        assert_eq!(parsed.precision, DatePrecision::DateOnly);
    }

    #[test]
    fn test_midnight_heuristic_quirks() {
        // "00" anywhere in the input keeps the time, even inside the year
        let parsed = parse_date_value("2000-01-01", true).unwrap();
        assert_eq!(parsed.precision, DatePrecision::DateAndTime);

        let parsed = parse_date_value("2021-06-15 12:00 am", true).unwrap();
        assert_eq!(parsed.precision, DatePrecision::DateAndTime);
    }

    #[test]
    fn test_date_field_drops_time() {
        let parsed = parse_date_value("2020-06-15 14:30", false).unwrap();
        assert_eq!(parsed.value, "2020-06-15");
        assert_eq!(parsed.precision, DatePrecision::DateOnly);
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_date_value("", false), None);
        assert_eq!(parse_date_value("not a date at all", false), None);
        assert_eq!(parse_date_value("2020-13", false), None);
    }

    #[test]
    fn test_precision_codes() {
        for p in [
            DatePrecision::DateAndTime,
            DatePrecision::DateOnly,
            DatePrecision::MonthOnly,
            DatePrecision::YearOnly,
        ] {
            assert_eq!(DatePrecision::from_code(p.code()), Some(p));
        }
        assert_eq!(DatePrecision::from_code(9), None);
    }
}
