//! Timestamp type for representing notification instants.
//!
//! The backend stores instants as RFC 3339 strings; internally a
//! `Timestamp` is milliseconds since the Unix epoch so ordering and
//! comparison stay cheap.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use super::ValidationError;

/// Millisecond Unix timestamp.
///
/// Serializes as an RFC 3339 string (the backend wire form) and
/// deserializes from either an RFC 3339 string or a raw millisecond
/// integer.
///
/// # Examples
///
/// ```
/// use courier_core::types::Timestamp;
///
/// let ts = Timestamp::now();
/// assert!(ts.as_millis() > 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Zero timestamp constant (the Unix epoch).
    pub const ZERO: Self = Self(0);

    /// Creates a new `Timestamp` from milliseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimestamp` if the value is negative.
    pub fn new(millis: i64) -> Result<Self, ValidationError> {
        if millis < 0 {
            return Err(ValidationError::InvalidTimestamp(millis));
        }
        Ok(Self(millis))
    }

    /// Creates a new `Timestamp` without validation.
    #[must_use]
    pub const fn new_unchecked(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the current timestamp.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("System time before Unix epoch");
        Self(duration.as_millis() as i64)
    }

    /// Returns the timestamp as milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns the timestamp as seconds since the Unix epoch.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0 / 1000
    }

    /// Returns true if the timestamp is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses an RFC 3339 instant string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidInstant` if the string is not a
    /// valid RFC 3339 instant.
    pub fn parse_rfc3339(s: &str) -> Result<Self, ValidationError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.timestamp_millis()))
            .map_err(|_| ValidationError::InvalidInstant(s.to_string()))
    }

    /// Formats the timestamp as an RFC 3339 string with millisecond
    /// precision in UTC.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Converts to a `DateTime<Utc>`.
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or_else(|| Utc.timestamp_millis_opt(0).unwrap())
    }

    /// Creates a `Timestamp` from a `DateTime<Utc>`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_rfc3339(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

struct TimestampVisitor;

impl Visitor<'_> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 instant string or millisecond integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Timestamp::parse_rfc3339(v).map_err(|e| E::custom(e.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Timestamp::new(v).map_err(|e| E::custom(e.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(Timestamp::new_unchecked)
            .map_err(|_| E::custom("timestamp out of range"))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_negative() {
        assert!(Timestamp::new(-1).is_err());
        assert!(Timestamp::new(0).is_ok());
        assert!(Timestamp::new(1_704_067_200_000).is_ok());
    }

    #[test]
    fn test_now_is_positive() {
        assert!(Timestamp::now().as_millis() > 0);
    }

    #[test]
    fn test_rfc3339_roundtrip() {
        let ts = Timestamp::new_unchecked(1_704_067_200_123);
        let s = ts.to_rfc3339();
        assert_eq!(s, "2024-01-01T00:00:00.123Z");
        assert_eq!(Timestamp::parse_rfc3339(&s).unwrap(), ts);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Timestamp::parse_rfc3339("not-a-date").is_err());
        assert!("2024-13-01T00:00:00Z".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_deserialize_from_string_and_int() {
        let from_str: Timestamp = serde_json::from_str("\"2024-01-01T00:00:00Z\"").unwrap();
        assert_eq!(from_str.as_millis(), 1_704_067_200_000);

        let from_int: Timestamp = serde_json::from_str("1704067200000").unwrap();
        assert_eq!(from_int, from_str);
    }

    #[test]
    fn test_serialize_as_string() {
        let ts = Timestamp::new_unchecked(1_704_067_200_000);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-01-01T00:00:00.000Z\"");
    }

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::new_unchecked(1_000);
        let later = Timestamp::new_unchecked(2_000);
        assert!(earlier < later);
    }

    #[test]
    fn test_as_secs() {
        let ts = Timestamp::new_unchecked(1_704_067_200_999);
        assert_eq!(ts.as_secs(), 1_704_067_200);
    }
}
