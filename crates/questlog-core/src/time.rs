//! Calendar keys and the caller-supplied clock tick

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A calendar day in the user's local time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// Whole days from `earlier` to `self`; negative if `earlier` is later.
    pub fn days_since(self, earlier: DateKey) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    pub fn minus_days(self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    pub fn week(self) -> WeekKey {
        let iso = self.0.iso_week();
        WeekKey {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for DateKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| crate::Error::InvalidKey(s.to_string()))
    }
}

/// An ISO week, rendered as `2026-W43`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl std::fmt::Display for WeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl std::str::FromStr for WeekKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let bad = || crate::Error::InvalidKey(s.to_string());
        let (year, week) = s.trim().split_once("-W").ok_or_else(bad)?;
        let year = year.parse::<i32>().map_err(|_| bad())?;
        let week = week.parse::<u32>().map_err(|_| bad())?;
        if !(1..=53).contains(&week) {
            return Err(bad());
        }
        Ok(Self { year, week })
    }
}

impl From<WeekKey> for String {
    fn from(key: WeekKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for WeekKey {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        s.parse()
    }
}

/// The caller's clock reading plus the current player level.
///
/// The engine never reads the wall clock; every time-dependent decision is
/// taken against a `Tick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub now: NaiveDateTime,
    pub level: u32,
}

impl Tick {
    pub fn new(now: NaiveDateTime, level: u32) -> Self {
        Self { now, level }
    }

    /// Convenience for a whole hour on a given day. Out-of-range input falls
    /// back to midnight of 1970-01-01 rather than panicking.
    pub fn on(day: DateKey, hour: u32, level: u32) -> Self {
        let now = day
            .date()
            .and_hms_opt(hour.min(23), 0, 0)
            .unwrap_or_default();
        Self { now, level }
    }

    pub fn today(&self) -> DateKey {
        DateKey(self.now.date())
    }

    pub fn week(&self) -> WeekKey {
        self.today().week()
    }

    pub fn hour(&self) -> u32 {
        self.now.hour()
    }
}
