//! Single clock source for every persisted timestamp.
//!
//! Timestamps are RFC 3339 strings carrying the offset of a named IANA timezone,
//! so they sort and parse the same way regardless of backend.

use crate::error::{CoreError, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    /// Build a clock for the given IANA timezone name
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| CoreError::Config(format!("Unknown timezone: {}", timezone)))?;
        Ok(Clock { tz })
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Current time rendered for storage
    pub fn stamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, false)
    }

    /// Whole seconds elapsed since a stored timestamp, never negative
    pub fn seconds_since(&self, stamp: &str) -> Result<i64> {
        let then = parse_stamp(stamp)?;
        let elapsed = Utc::now().signed_duration_since(then);
        Ok(elapsed.num_seconds().max(0))
    }
}

pub fn parse_stamp(stamp: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(stamp)
        .map_err(|e| CoreError::Storage(format!("Invalid timestamp {:?}: {}", stamp, e)))
}

impl Default for Clock {
    fn default() -> Self {
        Clock {
            tz: chrono_tz::America::Mexico_City,
        }
    }
}
