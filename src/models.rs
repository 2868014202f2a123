use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::FromRow;
use thiserror::Error;

use crate::escape::unescape;

/// A stored paste. `title` and `content` are kept HTML-escaped.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Paste {
    pub id: String,
    pub fingerprint: String,
    pub title: String,
    pub content: String,
    pub delete_key: String,
    /// `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Paste {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn raw_title(&self) -> String {
        unescape(&self.title)
    }

    pub fn raw_content(&self) -> String {
        unescape(&self.content)
    }

    /// Size in bytes of the content as it was submitted.
    pub fn size(&self) -> usize {
        self.raw_content().len()
    }
}

/// How long a paste lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Expiry {
    FiveMinutes,
    OneHour,
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
    Seconds(u64),
    Forever,
}

/// Upper bound for numeric expiries, twenty years.
const MAX_EXPIRY_SECS: u64 = 60 * 60 * 24 * 365 * 20;

impl Expiry {
    pub fn duration(self) -> Option<Duration> {
        match self {
            Expiry::FiveMinutes => Some(Duration::minutes(5)),
            Expiry::OneHour => Some(Duration::hours(1)),
            Expiry::OneDay => Some(Duration::days(1)),
            Expiry::OneWeek => Some(Duration::weeks(1)),
            Expiry::OneMonth => Some(Duration::days(30)),
            Expiry::OneYear => Some(Duration::days(365)),
            Expiry::Seconds(secs) => {
                Some(Duration::seconds(secs.min(MAX_EXPIRY_SECS) as i64))
            }
            Expiry::Forever => None,
        }
    }

    /// Absolute expiry time for a paste created at `now`.
    pub fn expires_at(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.duration()
            .and_then(|duration| now.checked_add_signed(duration))
    }
}

#[derive(Debug, Error)]
#[error("unknown expiry '{0}'")]
pub struct UnknownExpiry(String);

impl FromStr for Expiry {
    type Err = UnknownExpiry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let expiry = match normalized.as_str() {
            "5 minutes" | "5m" => Expiry::FiveMinutes,
            "1 hour" | "1h" => Expiry::OneHour,
            "1 day" | "1d" => Expiry::OneDay,
            "1 week" | "1w" => Expiry::OneWeek,
            "1 month" | "1mo" => Expiry::OneMonth,
            "1 year" | "1y" => Expiry::OneYear,
            "forever" | "never" | "0" => Expiry::Forever,
            other => match other.parse::<u64>() {
                Ok(secs) => Expiry::Seconds(secs),
                Err(_) => return Err(UnknownExpiry(s.to_owned())),
            },
        };
        Ok(expiry)
    }
}

impl TryFrom<String> for Expiry {
    type Error = UnknownExpiry;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::FiveMinutes => f.write_str("5 minutes"),
            Expiry::OneHour => f.write_str("1 hour"),
            Expiry::OneDay => f.write_str("1 day"),
            Expiry::OneWeek => f.write_str("1 week"),
            Expiry::OneMonth => f.write_str("1 month"),
            Expiry::OneYear => f.write_str("1 year"),
            Expiry::Seconds(secs) => write!(f, "{secs}"),
            Expiry::Forever => f.write_str("forever"),
        }
    }
}
