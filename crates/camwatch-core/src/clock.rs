//! Store-local wall-clock time.
//!
//! The monitor compares three kinds of times: "now", feed timestamps
//! written by the ingestion pipeline, and the persisted restart record.
//! All of them are represented as [`NaiveDateTime`] in the store's fixed
//! UTC offset.

use std::sync::Mutex;

use chrono::{FixedOffset, NaiveDateTime, TimeDelta, Utc};

use crate::error::{ConfigError, ConfigResult};

/// Format of every timestamp the monitor reads or writes.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current store-local time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in the store's timezone.
    fn now(&self) -> NaiveDateTime;
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Real clock shifted into a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }
}

/// Clock that only moves when told to (for tests and dry runs).
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

/// Render a timestamp in the shared format.
pub fn format_timestamp(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a UTC offset such as `+05:30`, `-07:00` or `+0530`.
pub fn parse_utc_offset(s: &str) -> ConfigResult<FixedOffset> {
    let invalid = || ConfigError::InvalidOffset(s.to_string());
    let s = s.trim();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1, &s[1..]),
        Some(b'-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
