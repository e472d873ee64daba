use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, Local, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Named reporting window, anchored on the moment it is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Month,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    /// Any token other than "month" or "year" resolves to `Today`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "month" => Period::Month,
            "year" => Period::Year,
            _ => Period::Today,
        }
    }

    /// Resolve against the wall clock in the local time zone.
    pub fn current_range(&self) -> DateRange {
        self.range_at(&Local::now())
    }

    /// Resolve the window containing `now`, using the calendar of `now`'s time zone.
    /// `end` is the last millisecond of the window.
    pub fn range_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateRange {
        let tz = now.timezone();
        let (first, next) = self.calendar_bounds(now.date_naive());

        let start = start_of_day(&tz, first);
        let end = start_of_day(&tz, next) - Duration::milliseconds(1);

        DateRange { start, end }
    }

    /// Bucket size the statistics view charts revenue with.
    pub fn revenue_granularity(&self) -> Granularity {
        match self {
            Period::Today | Period::Month => Granularity::Day,
            Period::Year => Granularity::Month,
        }
    }

    fn calendar_bounds(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Today => (date, date + Days::new(1)),
            Period::Month => {
                let first = date - Days::new(u64::from(date.day0()));
                (first, first + Months::new(1))
            }
            Period::Year => {
                let first = date - Days::new(u64::from(date.ordinal0()));
                (first, first + Months::new(12))
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Midnight can fall into a DST gap in a few zones; take the UTC reading then.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}

/// Inclusive timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        *at >= self.start && *at <= self.end
    }
}

/// `dd.MM.yyyy` in the given time zone.
pub fn format_date<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    at.with_timezone(tz).format("%d.%m.%Y").to_string()
}

/// `dd.MM.yyyy HH:mm` in the given time zone.
pub fn format_date_time<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: fmt::Display,
{
    at.with_timezone(tz).format("%d.%m.%Y %H:%M").to_string()
}

/// Trim a `HH:MM:SS` clock string to `HH:MM`.
pub fn format_time(clock: &str) -> &str {
    clock.get(..5).unwrap_or(clock)
}

/// Calendar granularity of a revenue series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Month => "%Y-%m",
            Granularity::Year => "%Y",
        }
    }

    /// Label of the bucket `at` falls into, in the calendar of `tz`.
    pub fn bucket_key<Tz: TimeZone>(&self, at: &DateTime<Utc>, tz: &Tz) -> String
    where
        Tz::Offset: fmt::Display,
    {
        at.with_timezone(tz).format(self.pattern()).to_string()
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            "year" => Ok(Granularity::Year),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_unknown_token_defaults_to_today() {
        assert_eq!(Period::from_token("month"), Period::Month);
        assert_eq!(Period::from_token("year"), Period::Year);
        assert_eq!(Period::from_token("today"), Period::Today);
        assert_eq!(Period::from_token("week"), Period::Today);
        assert_eq!(Period::from_token(""), Period::Today);
    }

    #[test]
    fn test_today_range() {
        let now = utc("2024-01-05T13:45:10Z");
        let range = Period::Today.range_at(&now);

        assert_eq!(range.start, utc("2024-01-05T00:00:00Z"));
        assert_eq!(range.end, utc("2024-01-05T23:59:59.999Z"));
        assert!(range.contains(&now));
    }

    #[test]
    fn test_month_range_in_december() {
        let range = Period::Month.range_at(&utc("2023-12-31T23:00:00Z"));

        assert_eq!(range.start, utc("2023-12-01T00:00:00Z"));
        assert_eq!(range.end, utc("2023-12-31T23:59:59.999Z"));
    }

    #[test]
    fn test_month_range_in_leap_february() {
        let range = Period::Month.range_at(&utc("2024-02-10T08:00:00Z"));

        assert_eq!(range.end, utc("2024-02-29T23:59:59.999Z"));
    }

    #[test]
    fn test_year_range() {
        let range = Period::Year.range_at(&utc("2024-06-15T12:00:00Z"));

        assert_eq!(range.start, utc("2024-01-01T00:00:00Z"));
        assert_eq!(range.end, utc("2024-12-31T23:59:59.999Z"));
    }

    #[test]
    fn test_range_follows_the_calendar_of_the_anchor() {
        let baku = FixedOffset::east_opt(4 * 3600).unwrap();
        let now = baku.with_ymd_and_hms(2024, 1, 5, 1, 30, 0).unwrap();
        let range = Period::Today.range_at(&now);

        assert_eq!(range.start, utc("2024-01-04T20:00:00Z"));
        assert_eq!(range.end, utc("2024-01-05T19:59:59.999Z"));
    }

    #[test]
    fn test_bucket_keys() {
        let at = utc("2024-01-05T12:00:00Z");
        assert_eq!(Granularity::Day.bucket_key(&at, &Utc), "2024-01-05");
        assert_eq!(Granularity::Month.bucket_key(&at, &Utc), "2024-01");
        assert_eq!(Granularity::Year.bucket_key(&at, &Utc), "2024");
    }

    #[test]
    fn test_bucket_key_uses_target_zone() {
        let at = utc("2024-01-05T22:30:00Z");
        let baku = FixedOffset::east_opt(4 * 3600).unwrap();
        assert_eq!(Granularity::Day.bucket_key(&at, &baku), "2024-01-06");
    }

    #[test]
    fn test_revenue_granularity() {
        assert_eq!(Period::Today.revenue_granularity(), Granularity::Day);
        assert_eq!(Period::Month.revenue_granularity(), Granularity::Day);
        assert_eq!(Period::Year.revenue_granularity(), Granularity::Month);
    }

    #[test]
    fn test_display_formats() {
        let at = utc("2024-03-07T09:05:00Z");
        let baku = FixedOffset::east_opt(4 * 3600).unwrap();
        assert_eq!(format_date(&at, &baku), "07.03.2024");
        assert_eq!(format_date_time(&at, &baku), "07.03.2024 13:05");
        assert_eq!(format_time("14:30:59"), "14:30");
        assert_eq!(format_time("9:1"), "9:1");
    }
}
