//! Wire date format: ISO-8601, always UTC, with an optional time component.
//!
//! A value without a time-of-day means "date only, no specific time"; that
//! distinction survives a round trip through [`WireDate`].

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::RtmError;

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

/// A date-time as the service transmits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WireDate {
    pub instant: DateTime<Utc>,
    pub has_time: bool,
}

impl WireDate {
    /// A full date-time in UTC.
    pub fn date_time(instant: DateTime<Utc>) -> Self {
        Self { instant, has_time: true }
    }

    /// A date with no specific time; midnight UTC internally.
    pub fn date_only(date: NaiveDate) -> Self {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        Self {
            instant: DateTime::from_naive_utc_and_offset(midnight, Utc),
            has_time: false,
        }
    }

    /// Parse wire date text. Malformed text is a contract violation.
    pub fn parse(text: &str) -> Result<Self, RtmError> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT) {
            return Ok(Self::date_time(DateTime::from_naive_utc_and_offset(dt, Utc)));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, DATE_ONLY_FORMAT) {
            return Ok(Self::date_only(date));
        }
        Err(RtmError::Protocol(format!("malformed wire date: {text:?}")))
    }
}

impl fmt::Display for WireDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = if self.has_time { DATE_TIME_FORMAT } else { DATE_ONLY_FORMAT };
        write!(f, "{}", self.instant.format(format))
    }
}

impl<'de> Deserialize<'de> for WireDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        WireDate::parse(&text).map_err(serde::de::Error::custom)
    }
}
