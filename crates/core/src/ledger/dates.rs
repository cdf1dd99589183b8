//! Date normalization for loosely-typed document fields.
//!
//! Dates reach the ledger as platform timestamps, ISO strings, epoch
//! milliseconds or values that know how to turn themselves into a date.
//! Anything else normalizes to `None` instead of failing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accessor for values that can produce a UTC instant.
pub trait ToDate {
    /// Returns the instant, or `None` when the value is not a usable date.
    fn to_date(&self) -> Option<DateTime<Utc>>;
}

/// Platform timestamp: seconds plus nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds since the epoch.
    #[serde(alias = "_seconds")]
    pub seconds: i64,
    /// Sub-second nanoseconds.
    #[serde(alias = "_nanoseconds", alias = "nanos", default)]
    pub nanoseconds: u32,
}

impl Timestamp {
    /// Builds a timestamp from an instant.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            seconds: at.timestamp(),
            nanoseconds: at.timestamp_subsec_nanos(),
        }
    }
}

impl ToDate for Timestamp {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl ToDate for DateTime<Utc> {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl ToDate for NaiveDate {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        self.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
    }
}

impl ToDate for i64 {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(*self)
    }
}

impl ToDate for str {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        let raw = self.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.to_date())
    }
}

impl ToDate for String {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        self.as_str().to_date()
    }
}

impl ToDate for Value {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::String(raw) => raw.to_date(),
            Value::Number(number) => number
                .as_i64()
                .or_else(|| {
                    number
                        .as_f64()
                        .filter(|millis| millis.is_finite())
                        .and_then(millis_from_float)
                })
                .and_then(|millis| millis.to_date()),
            Value::Object(_) => serde_json::from_value::<Timestamp>(self.clone())
                .ok()
                .and_then(|ts| ts.to_date()),
            Value::Null | Value::Bool(_) | Value::Array(_) => None,
        }
    }
}

impl<T: ToDate + ?Sized> ToDate for &T {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        (**self).to_date()
    }
}

impl<T: ToDate> ToDate for Option<T> {
    fn to_date(&self) -> Option<DateTime<Utc>> {
        self.as_ref().and_then(ToDate::to_date)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis_from_float(millis: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up, so the upper bound is exclusive.
    const LIMIT: f64 = 9_223_372_036_854_775_807.0;
    (millis.abs() < LIMIT).then(|| millis.trunc() as i64)
}

/// Normalizes any supported date representation.
///
/// Returns `None` for unparseable input; never panics.
pub fn normalize_date<T: ToDate + ?Sized>(value: &T) -> Option<DateTime<Utc>> {
    value.to_date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_accepts_platform_timestamp() {
        let ts = Timestamp::from_datetime(instant());
        assert_eq!(normalize_date(&ts), Some(instant()));

        let underscored = json!({ "_seconds": instant().timestamp(), "_nanoseconds": 0 });
        assert_eq!(normalize_date(&underscored), Some(instant()));
    }

    #[test]
    fn test_accepts_iso_strings() {
        assert_eq!(normalize_date("2026-02-20T12:00:00Z"), Some(instant()));
        assert_eq!(normalize_date("2026-02-20T09:00:00-03:00"), Some(instant()));
        assert_eq!(normalize_date("2026-02-20T12:00:00"), Some(instant()));
        assert_eq!(
            normalize_date("2026-02-20"),
            Some(Utc.with_ymd_and_hms(2026, 2, 20, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_accepts_epoch_millis() {
        let millis = instant().timestamp_millis();
        assert_eq!(normalize_date(&millis), Some(instant()));
        assert_eq!(normalize_date(&json!(millis)), Some(instant()));
    }

    #[test]
    fn test_accepts_accessor_values() {
        assert_eq!(normalize_date(&instant()), Some(instant()));
        let day = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        assert_eq!(
            normalize_date(&day),
            Some(Utc.with_ymd_and_hms(2026, 2, 20, 0, 0, 0).unwrap())
        );
        assert_eq!(normalize_date(&Some(instant())), Some(instant()));
    }

    #[test]
    fn test_rejects_everything_else() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("not a date"), None);
        assert_eq!(normalize_date(&json!(null)), None);
        assert_eq!(normalize_date(&json!(true)), None);
        assert_eq!(normalize_date(&json!([1, 2])), None);
        assert_eq!(normalize_date(&json!({ "foo": "bar" })), None);
        assert_eq!(normalize_date(&json!(1e300)), None);
        assert_eq!(normalize_date(&None::<DateTime<Utc>>), None);
    }
}
