//! Dates as they appear in household spreadsheets, the fixed time zone that gives them meaning,
//! and the month and day periods that aggregation filters on.

use crate::error::Res;
use crate::model::RawCell;
use anyhow::{bail, Context};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

const SEOUL: &str = "Asia/Seoul";
const SEOUL_OFFSET_MINUTES: i32 = 9 * 60;

/// Seconds in a day, used to turn the fractional part of a serial date into a time of day.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Generic formats tried against the whole string, after RFC 3339 and RFC 2822.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// A named, fixed UTC offset. The household lives in one place, so no daylight saving rules are
/// needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ZoneFile", into = "ZoneFile")]
pub struct Zone {
    name: String,
    offset: FixedOffset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ZoneFile {
    name: String,
    utc_offset_minutes: i32,
}

impl TryFrom<ZoneFile> for Zone {
    type Error = anyhow::Error;

    fn try_from(value: ZoneFile) -> Res<Self> {
        Zone::new(value.name, value.utc_offset_minutes)
    }
}

impl From<Zone> for ZoneFile {
    fn from(value: Zone) -> Self {
        ZoneFile {
            utc_offset_minutes: value.offset.local_minus_utc() / 60,
            name: value.name,
        }
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self {
            name: SEOUL.to_string(),
            offset: FixedOffset::east_opt(SEOUL_OFFSET_MINUTES * 60).unwrap_or(Utc.fix()),
        }
    }
}

impl Zone {
    pub fn new(name: impl Into<String>, utc_offset_minutes: i32) -> Res<Self> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("UTC offset of {utc_offset_minutes} minutes is out of range"))?;
        Ok(Self {
            name: name.into(),
            offset,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Interprets a wall-clock time in this zone.
    pub fn local(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        // A fixed offset never yields an ambiguous or missing local time
        self.offset
            .from_local_datetime(&naive)
            .single()
            .unwrap_or_else(|| self.offset.from_utc_datetime(&naive))
    }

    pub fn midnight(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        self.local(date.and_time(chrono::NaiveTime::MIN))
    }
}

/// Parses a date cell, trying in order:
/// 1. a numeric spreadsheet serial (days since 1899-12-30, fraction is the time of day)
/// 2. the whole string as a generic date or date-time
/// 3. the first ten characters as `YYYY-MM-DD`
/// 4. a dotted `YYYY. M. D` pattern anywhere in the string
///
/// Returns `None` when every attempt fails.
pub fn parse_any_date(cell: &RawCell, zone: &Zone) -> Option<DateTime<FixedOffset>> {
    match cell {
        RawCell::Number(n) => serial_to_date(*n, zone),
        RawCell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            parse_generic(s, zone)
                .or_else(|| parse_leading_ymd(s, zone))
                .or_else(|| parse_dotted(s, zone))
        }
        RawCell::Empty => None,
    }
}

/// Converts a spreadsheet serial day count into a date-time in `zone`. Spreadsheets store local
/// wall-clock values, so the serial is read as local time.
pub fn serial_to_date(serial: f64, zone: &Zone) -> Option<DateTime<FixedOffset>> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor();
    let seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(chrono::NaiveTime::MIN);
    let naive = epoch
        .checked_add_signed(Duration::try_days(days as i64)?)?
        .checked_add_signed(Duration::try_seconds(seconds)?)?;
    Some(zone.local(naive))
}

/// The serial day count of a calendar date.
pub fn date_to_serial(date: NaiveDate) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (date - epoch).num_days()
}

fn parse_generic(s: &str, zone: &Zone) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&zone.offset()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&zone.offset()));
    }
    if let Some(naive) = DATE_TIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Some(zone.local(naive));
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .map(|d| zone.midnight(d))
}

fn parse_leading_ymd(s: &str, zone: &Zone) -> Option<DateTime<FixedOffset>> {
    let head = s.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .ok()
        .map(|d| zone.midnight(d))
}

fn dotted_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d{4})\.\s*(\d{1,2})\.\s*(\d{1,2})").ok())
        .as_ref()
}

fn parse_dotted(s: &str, zone: &Zone) -> Option<DateTime<FixedOffset>> {
    let caps = dotted_pattern()?.captures(s)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| zone.midnight(d))
}

/// Years a `YearMonth` may carry. Every month in range, and the month after it, has a first day
/// chrono can represent.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// A calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Res<Self> {
        if !(1..=12).contains(&month) {
            bail!("Month must be between 1 and 12, got {month}");
        }
        if !YEARS.contains(&year) {
            bail!("Year must be between 1 and 9999, got {year}");
        }
        Ok(Self { year, month })
    }

    pub fn of(date: impl Datelike) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current(zone: &Zone) -> Self {
        Self::of(zone.today())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The half-open period `[first day 00:00, first day of next month 00:00)` in `zone`.
    pub fn period(&self, zone: &Zone) -> Period {
        Period {
            start: zone.midnight(self.first_day()),
            end: zone.midnight(self.next().first_day()),
        }
    }

    /// The conventional name of the sheet tab holding this month, e.g. `9월`.
    pub fn tab_name(&self) -> String {
        format!("{}월", self.month)
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Res<Self> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .with_context(|| format!("Expected a month like 2025-09, got '{s}'"))?;
        let year = year
            .parse::<i32>()
            .with_context(|| format!("Invalid year in '{s}'"))?;
        let month = month
            .parse::<u32>()
            .with_context(|| format!("Invalid month in '{s}'"))?;
        YearMonth::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        YearMonth::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A half-open time period `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl Period {
    /// One calendar day in `zone`. `None` for the last day chrono can represent.
    pub fn day(date: NaiveDate, zone: &Zone) -> Option<Self> {
        Some(Self {
            start: zone.midnight(date),
            end: zone.midnight(date.succ_opt()?),
        })
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn contains(&self, at: &DateTime<FixedOffset>) -> bool {
        *at >= self.start && *at < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seoul() -> Zone {
        Zone::default()
    }

    fn day(cell: RawCell) -> Option<NaiveDate> {
        parse_any_date(&cell, &seoul()).map(|d| d.date_naive())
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_same_day_in_every_representation() {
        let expected = Some(ymd(2025, 9, 7));
        let serial = date_to_serial(ymd(2025, 9, 7));
        assert_eq!(serial, 45907);
        assert_eq!(day(RawCell::Number(serial as f64)), expected);
        assert_eq!(day("2025-09-07".into()), expected);
        assert_eq!(day("2025-09-07T10:30:00+09:00".into()), expected);
        assert_eq!(day("2025. 9. 7".into()), expected);
        assert_eq!(day("2025. 9. 7 (일)".into()), expected);
        assert_eq!(day("09/07/2025".into()), expected);
    }

    #[test]
    fn test_serial_fraction_is_time_of_day() {
        let dt = serial_to_date(45907.5, &seoul()).unwrap();
        assert_eq!(dt.date_naive(), ymd(2025, 9, 7));
        assert_eq!(dt.format("%H:%M").to_string(), "12:00");
    }

    #[test]
    fn test_utc_instant_converted_into_zone() {
        // 20:00 UTC on the 6th is 05:00 on the 7th in Seoul
        assert_eq!(day("2025-09-06T20:00:00Z".into()), Some(ymd(2025, 9, 7)));
    }

    #[test]
    fn test_leading_ten_characters() {
        assert_eq!(day("2025-09-07 오전 10:00".into()), Some(ymd(2025, 9, 7)));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(day("N/A".into()), None);
        assert_eq!(day("".into()), None);
        assert_eq!(day(RawCell::Empty), None);
        assert_eq!(day("2025. 2. 30".into()), None);
        assert_eq!(day(RawCell::Number(f64::NAN)), None);
    }

    #[test]
    fn test_year_month_parse_and_display() {
        let ym: YearMonth = "2025-09".parse().unwrap();
        assert_eq!(ym.to_string(), "2025-09");
        assert_eq!(ym.tab_name(), "9월");
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!("202509".parse::<YearMonth>().is_err());
        assert_eq!(YearMonth::new(2025, 12).unwrap().next().to_string(), "2026-01");
    }

    #[test]
    fn test_year_month_out_of_range() {
        assert!("2147483647-12".parse::<YearMonth>().is_err());
        assert!("300000-09".parse::<YearMonth>().is_err());
        assert!("0-01".parse::<YearMonth>().is_err());
        assert!(serde_json::from_str::<YearMonth>(r#""-5-03""#).is_err());

        let zone = seoul();
        let last = "9999-12".parse::<YearMonth>().unwrap();
        assert_eq!(last.next().to_string(), "10000-01");
        let period = last.period(&zone);
        assert!(period.contains(&zone.midnight(ymd(9999, 12, 31))));
        assert!(!period.contains(&zone.midnight(ymd(10000, 1, 1))));
    }

    #[test]
    fn test_day_period() {
        let zone = seoul();
        let period = Period::day(ymd(2025, 9, 7), &zone).unwrap();
        assert!(period.contains(&zone.midnight(ymd(2025, 9, 7))));
        assert!(!period.contains(&zone.midnight(ymd(2025, 9, 8))));
        assert!(Period::day(NaiveDate::MAX, &zone).is_none());
    }

    #[test]
    fn test_month_period_is_half_open() {
        let zone = seoul();
        let period = "2025-09".parse::<YearMonth>().unwrap().period(&zone);
        assert!(period.contains(&zone.midnight(ymd(2025, 9, 1))));
        assert!(period.contains(&zone.midnight(ymd(2025, 9, 30))));
        assert!(!period.contains(&zone.midnight(ymd(2025, 10, 1))));
        assert!(!period.contains(&zone.midnight(ymd(2025, 8, 31))));
    }

    #[test]
    fn test_zone_serde() {
        let json = serde_json::to_string(&seoul()).unwrap();
        assert_eq!(json, r#"{"name":"Asia/Seoul","utc_offset_minutes":540}"#);
        let zone: Zone = serde_json::from_str(&json).unwrap();
        assert_eq!(zone, seoul());
        assert!(serde_json::from_str::<Zone>(r#"{"name":"x","utc_offset_minutes":99999}"#).is_err());
        assert!(Zone::new("x", i32::MAX).is_err());
    }
}
