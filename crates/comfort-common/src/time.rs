//! Time handling for canonical records.
//!
//! Every stored timestamp is wall-clock time in one reference zone with the
//! zone stripped, so raw and derived tables line up without conversion.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{ComfortError, ComfortResult};

/// Zone used when no site configuration overrides it.
pub const DEFAULT_REFERENCE_ZONE: &str = "America/Chicago";

/// Named time zone that all stored timestamps are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferenceZone(Tz);

impl ReferenceZone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    pub fn tz(&self) -> Tz {
        self.0
    }

    /// Convert an instant into reference-zone wall-clock time.
    pub fn localize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.0).naive_local()
    }

    /// Current wall-clock time in the reference zone.
    pub fn now(&self) -> NaiveDateTime {
        self.localize(Utc::now())
    }

    /// Today's calendar date in the reference zone.
    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Parse an upstream timestamp and convert it to reference-zone time.
    ///
    /// Accepts RFC 3339 (with `Z` or an offset, optional fractional seconds).
    /// Timestamps without zone information are taken to be UTC.
    pub fn parse_timestamp(&self, s: &str) -> ComfortResult<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(self.localize(dt.with_timezone(&Utc)));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(self.localize(Utc.from_utc_datetime(&ndt)));
            }
        }

        Err(ComfortError::schema(
            "timestamp",
            format!("unparseable timestamp '{}'", s),
        ))
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self(chrono_tz::America::Chicago)
    }
}

impl FromStr for ReferenceZone {
    type Err = ComfortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<Tz>()
            .map(Self)
            .map_err(|_| ComfortError::InvalidConfig(format!("unknown time zone '{}'", s)))
    }
}

impl TryFrom<String> for ReferenceZone {
    type Error = ComfortError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceZone> for String {
    fn from(zone: ReferenceZone) -> Self {
        zone.0.name().to_string()
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

/// Parse the calendar date a daily bucket is labelled with.
///
/// Daily buckets are labels, not instants: `2024-03-01T00:00:00.000Z` means
/// March 1st, so the date prefix is taken as-is without zone conversion.
pub fn parse_bucket_date(s: &str) -> ComfortResult<NaiveDate> {
    let s = s.trim();
    let prefix = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m-%d-%Y"))
        .map_err(|_| ComfortError::schema("date", format!("unparseable date '{}'", s)))
}

/// Format a date the way the traffic provider expects it (`MM-DD-YYYY`).
pub fn provider_date(date: NaiveDate) -> String {
    date.format("%m-%d-%Y").to_string()
}
