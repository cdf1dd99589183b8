//! Ledger calendar: month keys and inclusive day/month ranges.
//!
//! Rollup month ids and reporting ranges are computed in the same
//! timezone so that the rollup path and the reducers agree on which
//! month an instant belongs to.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Calendar month key, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthId {
    year: i32,
    month: u32,
}

impl MonthId {
    /// Builds a month id; `month` is 1-based.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month, 1-based.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// The month before this one.
    #[must_use]
    pub const fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for MonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error for malformed month keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month key: {0} (expected YYYY-MM)")]
pub struct InvalidMonthId(pub String);

impl FromStr for MonthId {
    type Err = InvalidMonthId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidMonthId(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive instant range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First instant included.
    pub start: DateTime<Utc>,
    /// Last instant included.
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Returns true when `at` lies within the range, bounds included.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// Returns true when `at` is present and within the range.
    #[must_use]
    pub fn contains_opt(&self, at: Option<DateTime<Utc>>) -> bool {
        at.is_some_and(|at| self.contains(at))
    }
}

/// Error for unknown IANA timezone names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown timezone: {0}")]
pub struct UnknownTimezone(pub String);

/// Timezone-aware calendar used for month keys and reporting ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerCalendar {
    tz: Tz,
}

impl Default for LedgerCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl LedgerCalendar {
    /// Calendar in the given timezone.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// UTC calendar.
    #[must_use]
    pub const fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Calendar from an IANA name such as `America/Sao_Paulo`.
    pub fn from_name(name: &str) -> Result<Self, UnknownTimezone> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| UnknownTimezone(name.to_string()))
    }

    /// The configured timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local calendar date of an instant.
    #[must_use]
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.tz).date_naive()
    }

    /// Month key of an instant.
    #[must_use]
    pub fn month_id(&self, at: DateTime<Utc>) -> MonthId {
        let local = self.local_date(at);
        MonthId {
            year: local.year(),
            month: local.month(),
        }
    }

    /// Start of the local day containing `at` through its last millisecond.
    #[must_use]
    pub fn day_range(&self, at: DateTime<Utc>) -> DateRange {
        let day = self.local_date(at);
        self.days_range(day, day)
    }

    /// First local day of the month containing `at` through the end of its last day.
    #[must_use]
    pub fn month_range(&self, at: DateTime<Utc>) -> DateRange {
        self.month_id_range(self.month_id(at))
    }

    /// Range covering the month before the one containing `at`.
    #[must_use]
    pub fn previous_month_range(&self, at: DateTime<Utc>) -> DateRange {
        self.month_id_range(self.month_id(at).previous())
    }

    /// Range covering a whole month.
    #[must_use]
    pub fn month_id_range(&self, month: MonthId) -> DateRange {
        let first = month.first_day().unwrap_or(NaiveDate::MIN);
        let next = if month.month == 12 {
            NaiveDate::from_ymd_opt(month.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(month.year, month.month + 1, 1)
        };
        let last = next.and_then(|d| d.pred_opt()).unwrap_or(NaiveDate::MAX);
        self.days_range(first, last)
    }

    /// Start of `first` through the end of `last`, in local days.
    #[must_use]
    pub fn days_range(&self, first: NaiveDate, last: NaiveDate) -> DateRange {
        let start = self.start_of_day(first);
        let end = last
            .succ_opt()
            .map_or(DateTime::<Utc>::MAX_UTC, |next| {
                self.start_of_day(next) - Duration::milliseconds(1)
            });
        DateRange { start, end }
    }

    /// Range from the start of the local day of `from` to the end of the local day of `to`.
    #[must_use]
    pub fn span(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DateRange {
        self.days_range(self.local_date(from), self.local_date(to))
    }

    fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_hms_opt(0, 0, 0).unwrap_or(NaiveDateTime::MIN);
        match self.tz.from_local_datetime(&midnight) {
            LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => at.with_timezone(&Utc),
            // Midnight skipped by a DST jump: the day starts at the first valid instant.
            LocalResult::None => self
                .tz
                .from_local_datetime(&(midnight + Duration::hours(1)))
                .earliest()
                .map_or_else(|| midnight.and_utc(), |at| at.with_timezone(&Utc)),
        }
    }
}
