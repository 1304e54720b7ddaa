//! Maps a period keyword (plus optional custom bounds or calendar selectors) to
//! an inclusive day range.
//!
//! Without selectors, week, month and year are rolling windows ending today.
//! With `year`, `month` or `week` set they name one calendar bucket instead:
//! ISO week W of year Y, month M of year Y, or year Y. Selectors left out
//! default to the bucket containing today.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{ALL_TIME_YEARS, WEEK_DAYS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRange {
    pub start_day: NaiveDate,
    pub end_day: NaiveDate,
}

impl PeriodRange {
    pub fn new(start_day: NaiveDate, end_day: NaiveDate) -> Result<Self, PeriodError> {
        if start_day > end_day {
            return Err(PeriodError::InvalidArgument(format!(
                "range start {start_day} is after end {end_day}"
            )));
        }
        Ok(Self { start_day, end_day })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start_day: day,
            end_day: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_day <= day && day <= self.end_day
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    AllTime,
    Week,
    Month,
    Year,
    Custom,
}

impl Period {
    /// Absent or blank keywords mean all-time.
    pub fn parse(keyword: Option<&str>) -> Result<Self, PeriodError> {
        match keyword.map(str::trim) {
            None | Some("") => Ok(Self::AllTime),
            Some(raw) => raw.parse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllTime => "all-time",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" | "all-time" | "alltime" => Ok(Self::AllTime),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "custom" => Ok(Self::Custom),
            other => Err(PeriodError::InvalidArgument(format!(
                "unknown period '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid period: {0}")]
    InvalidArgument(String),
    #[error("breakdown for period '{0}' is disabled")]
    Disabled(Period),
}

/// Which calendar breakdowns may be queried. All-time and custom ranges are
/// always available since they do not depend on a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakdownPeriods {
    pub week: bool,
    pub month: bool,
    pub year: bool,
}

impl Default for BreakdownPeriods {
    fn default() -> Self {
        Self {
            week: true,
            month: true,
            year: true,
        }
    }
}

impl BreakdownPeriods {
    pub fn none() -> Self {
        Self {
            week: false,
            month: false,
            year: false,
        }
    }

    /// Names other than week, month and year are logged and ignored.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut enabled = Self::none();
        for name in names {
            match name.as_ref().parse::<Period>() {
                Ok(Period::Week) => enabled.week = true,
                Ok(Period::Month) => enabled.month = true,
                Ok(Period::Year) => enabled.year = true,
                _ => tracing::warn!(name = name.as_ref(), "Ignoring unsupported breakdown period"),
            }
        }
        enabled
    }

    pub fn allows(&self, period: Period) -> bool {
        match period {
            Period::AllTime | Period::Custom => true,
            Period::Week => self.week,
            Period::Month => self.month,
            Period::Year => self.year,
        }
    }
}

/// A period as requested by a caller, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PeriodSpec {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// ISO week number; `year` is then the ISO week-numbering year.
    pub week: Option<u32>,
}

/// Picks one calendar bucket for week, month and year periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarSelector {
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// ISO week number; `year` is then the ISO week-numbering year.
    pub week: Option<u32>,
}

impl CalendarSelector {
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.week.is_none()
    }
}

impl PeriodSpec {
    pub fn keyword(period: &str) -> Self {
        Self {
            period: Some(period.to_string()),
            ..Self::default()
        }
    }

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period: Some(Period::Custom.as_str().to_string()),
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    pub fn calendar_year(year: i32) -> Self {
        Self::calendar(Period::Year, CalendarSelector {
            year: Some(year),
            ..CalendarSelector::default()
        })
    }

    pub fn calendar_month(year: i32, month: u32) -> Self {
        Self::calendar(Period::Month, CalendarSelector {
            year: Some(year),
            month: Some(month),
            week: None,
        })
    }

    pub fn calendar_week(year: i32, week: u32) -> Self {
        Self::calendar(Period::Week, CalendarSelector {
            year: Some(year),
            month: None,
            week: Some(week),
        })
    }

    fn calendar(period: Period, calendar: CalendarSelector) -> Self {
        Self {
            period: Some(period.as_str().to_string()),
            year: calendar.year,
            month: calendar.month,
            week: calendar.week,
            ..Self::default()
        }
    }

    pub fn calendar_selector(&self) -> CalendarSelector {
        CalendarSelector {
            year: self.year,
            month: self.month,
            week: self.week,
        }
    }
}

pub fn resolve(
    keyword: Option<&str>,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<PeriodRange, PeriodError> {
    resolve_period(Period::parse(keyword)?, custom_start, custom_end, today)
}

pub fn resolve_period(
    period: Period,
    custom_start: Option<NaiveDate>,
    custom_end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<PeriodRange, PeriodError> {
    let start_day = match period {
        Period::AllTime => months_back(today, ALL_TIME_YEARS * 12)?,
        Period::Week => today
            .checked_sub_signed(Duration::days(WEEK_DAYS))
            .ok_or_else(|| out_of_range(today))?,
        Period::Month => months_back(today, 1)?,
        Period::Year => months_back(today, 12)?,
        Period::Custom => {
            let (Some(start), Some(end)) = (custom_start, custom_end) else {
                return Err(PeriodError::InvalidArgument(
                    "custom period needs both start and end".to_string(),
                ));
            };
            check_storable(start)?;
            check_storable(end)?;
            return PeriodRange::new(start, end);
        }
    };

    Ok(PeriodRange {
        start_day,
        end_day: today,
    })
}

/// Resolves an already parsed period, using calendar selectors when present.
pub fn resolve_spec(
    period: Period,
    spec: &PeriodSpec,
    today: NaiveDate,
) -> Result<PeriodRange, PeriodError> {
    let selector = spec.calendar_selector();
    if selector.is_empty() {
        resolve_period(period, spec.start, spec.end, today)
    } else {
        resolve_calendar(period, selector, today)
    }
}

/// The whole calendar bucket named by `selector`, whether or not it has ended.
pub fn resolve_calendar(
    period: Period,
    selector: CalendarSelector,
    today: NaiveDate,
) -> Result<PeriodRange, PeriodError> {
    let (start_day, end_day) = match period {
        Period::Year => {
            reject_selector(selector.month, "month", period)?;
            reject_selector(selector.week, "week", period)?;
            let year = selector.year.unwrap_or(today.year());
            let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| bad_year(year))?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| bad_year(year))?;
            (start, end)
        }
        Period::Month => {
            reject_selector(selector.week, "week", period)?;
            let year = selector.year.unwrap_or(today.year());
            let month = selector.month.unwrap_or(today.month());
            let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                PeriodError::InvalidArgument(format!("month {month} of year {year} does not exist"))
            })?;
            let end = start
                .checked_add_months(Months::new(1))
                .and_then(|next| next.pred_opt())
                .ok_or_else(|| out_of_range(start))?;
            (start, end)
        }
        Period::Week => {
            reject_selector(selector.month, "month", period)?;
            let current = today.iso_week();
            let year = selector.year.unwrap_or(current.year());
            let week = selector.week.unwrap_or(current.week());
            let missing = || {
                PeriodError::InvalidArgument(format!(
                    "ISO week {week} of year {year} does not exist"
                ))
            };
            let start = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(missing)?;
            let end = NaiveDate::from_isoywd_opt(year, week, Weekday::Sun).ok_or_else(missing)?;
            (start, end)
        }
        Period::AllTime | Period::Custom => {
            return Err(PeriodError::InvalidArgument(format!(
                "calendar selectors do not apply to the {period} period"
            )));
        }
    };

    check_storable(start_day)?;
    check_storable(end_day)?;
    PeriodRange::new(start_day, end_day)
}

fn reject_selector(value: Option<u32>, name: &str, period: Period) -> Result<(), PeriodError> {
    match value {
        Some(_) => Err(PeriodError::InvalidArgument(format!(
            "'{name}' cannot select a {period} period"
        ))),
        None => Ok(()),
    }
}

fn bad_year(year: i32) -> PeriodError {
    PeriodError::InvalidArgument(format!("year {year} is out of the supported range"))
}

// Day keys are four-digit ISO dates.
fn check_storable(day: NaiveDate) -> Result<(), PeriodError> {
    if (1..=9999).contains(&day.year()) {
        Ok(())
    } else {
        Err(out_of_range(day))
    }
}

fn months_back(today: NaiveDate, months: u32) -> Result<NaiveDate, PeriodError> {
    today
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| out_of_range(today))
}

fn out_of_range(day: NaiveDate) -> PeriodError {
    PeriodError::InvalidArgument(format!("date {day} is out of the supported range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_is_seven_days_back() {
        let range = resolve(Some("week"), None, None, day(2024, 3, 10)).unwrap();
        assert_eq!(range, PeriodRange::new(day(2024, 3, 3), day(2024, 3, 10)).unwrap());
    }

    #[test]
    fn month_and_year_are_calendar_based() {
        let month = resolve(Some("month"), None, None, day(2024, 3, 31)).unwrap();
        assert_eq!(month.start_day, day(2024, 2, 29));

        let year = resolve(Some("year"), None, None, day(2024, 2, 29)).unwrap();
        assert_eq!(year.start_day, day(2023, 2, 28));
        assert_eq!(year.end_day, day(2024, 2, 29));
    }

    #[test]
    fn all_time_spans_a_century() {
        for keyword in [None, Some(""), Some("all"), Some("all-time"), Some("AllTime")] {
            let range = resolve(keyword, None, None, day(2024, 6, 1)).unwrap();
            assert_eq!(range.start_day, day(1924, 6, 1));
            assert_eq!(range.end_day, day(2024, 6, 1));
        }
    }

    #[test]
    fn custom_range_is_verbatim() {
        let range = resolve(
            Some("custom"),
            Some(day(2020, 1, 1)),
            Some(day(2020, 1, 31)),
            day(2024, 6, 1),
        )
        .unwrap();
        assert_eq!(range.start_day, day(2020, 1, 1));
        assert_eq!(range.end_day, day(2020, 1, 31));
        assert!(range.contains(day(2020, 1, 15)));
        assert!(!range.contains(day(2020, 2, 1)));
    }

    #[test]
    fn custom_range_rejects_inverted_or_missing_bounds() {
        let today = day(2024, 6, 1);
        let inverted = resolve(Some("custom"), Some(day(2020, 2, 1)), Some(day(2020, 1, 1)), today);
        assert!(matches!(inverted, Err(PeriodError::InvalidArgument(_))));

        let missing_end = resolve(Some("custom"), Some(day(2020, 2, 1)), None, today);
        assert!(matches!(missing_end, Err(PeriodError::InvalidArgument(_))));

        let missing_start = resolve(Some("custom"), None, Some(day(2020, 2, 1)), today);
        assert!(matches!(missing_start, Err(PeriodError::InvalidArgument(_))));
    }

    #[test]
    fn unknown_keyword_is_invalid() {
        let err = resolve(Some("fortnight"), None, None, day(2024, 6, 1)).unwrap_err();
        assert!(matches!(err, PeriodError::InvalidArgument(_)));
    }

    #[test]
    fn breakdown_gating() {
        let only_week = BreakdownPeriods::from_names(&["week", "bogus"]);
        assert!(only_week.allows(Period::Week));
        assert!(!only_week.allows(Period::Month));
        assert!(!only_week.allows(Period::Year));
        assert!(only_week.allows(Period::AllTime));
        assert!(BreakdownPeriods::none().allows(Period::Custom));
    }

    #[test]
    fn calendar_selectors_pick_one_bucket() {
        let today = day(2024, 6, 1);

        let year = resolve_spec(Period::Year, &PeriodSpec::calendar_year(2023), today).unwrap();
        assert_eq!(year, PeriodRange::new(day(2023, 1, 1), day(2023, 12, 31)).unwrap());

        let feb = resolve_spec(Period::Month, &PeriodSpec::calendar_month(2024, 2), today).unwrap();
        assert_eq!(feb, PeriodRange::new(day(2024, 2, 1), day(2024, 2, 29)).unwrap());

        let dec = resolve_spec(Period::Month, &PeriodSpec::calendar_month(2023, 12), today);
        let dec = dec.unwrap();
        assert_eq!(dec.end_day, day(2023, 12, 31));

        // ISO week 1 of 2025 starts in December 2024.
        let week = resolve_spec(Period::Week, &PeriodSpec::calendar_week(2025, 1), today).unwrap();
        assert_eq!(week, PeriodRange::new(day(2024, 12, 30), day(2025, 1, 5)).unwrap());
    }

    #[test]
    fn missing_selectors_default_to_the_bucket_holding_today() {
        let today = day(2024, 6, 12);
        let only_month = PeriodSpec {
            period: Some("month".to_string()),
            month: Some(3),
            ..PeriodSpec::default()
        };
        let march = resolve_spec(Period::Month, &only_month, today).unwrap();
        assert_eq!(march, PeriodRange::new(day(2024, 3, 1), day(2024, 3, 31)).unwrap());

        let only_year = PeriodSpec {
            period: Some("week".to_string()),
            year: Some(2024),
            ..PeriodSpec::default()
        };
        let this_week = resolve_spec(Period::Week, &only_year, today).unwrap();
        assert_eq!(this_week, PeriodRange::new(day(2024, 6, 10), day(2024, 6, 16)).unwrap());
    }

    #[test]
    fn invalid_calendar_selectors_are_rejected() {
        let today = day(2024, 6, 1);
        let cases = [
            (Period::Month, PeriodSpec::calendar_month(2024, 13)),
            (Period::Week, PeriodSpec::calendar_week(2024, 53)),
            (Period::Week, PeriodSpec::calendar_week(2024, 0)),
            (Period::Year, PeriodSpec::calendar_week(2024, 10)),
            (Period::AllTime, PeriodSpec::calendar_year(2024)),
            (Period::Custom, PeriodSpec::calendar_year(2024)),
            (Period::Year, PeriodSpec::calendar_year(10_000)),
        ];
        for (period, spec) in cases {
            let err = resolve_spec(period, &spec, today).unwrap_err();
            assert!(matches!(err, PeriodError::InvalidArgument(_)), "{period} {spec:?}");
        }
    }

    #[test]
    fn without_selectors_resolve_spec_keeps_rolling_windows() {
        let today = day(2024, 3, 10);
        let rolling = resolve_spec(Period::Week, &PeriodSpec::keyword("week"), today).unwrap();
        assert_eq!(rolling, PeriodRange::new(day(2024, 3, 3), today).unwrap());
    }
}
