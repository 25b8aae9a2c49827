//! Built-in termination predicates

use super::types::TerminationPredicate;
use crate::clock::{Clock, SystemClock};
use crate::types::JsonValue;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Default age threshold: 90 days in milliseconds
pub const DEFAULT_MAX_AGE_MS: i64 = 7_776_000_000;

/// Stops pagination once any item is older than a maximum age.
///
/// The item date is read from a dotted field path (default `date`).
/// Items whose date is missing or unparseable never trigger a stop.
/// See [`item_date`] for the accepted formats.
#[derive(Debug, Clone)]
pub struct OlderThan<C = SystemClock> {
    clock: C,
    max_age: Duration,
    date_field: String,
}

impl OlderThan<SystemClock> {
    /// Older than `days` days, measured against the system clock
    pub fn days(days: i64) -> Self {
        let max_age = Duration::try_days(days).unwrap_or(if days < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        });
        Self::with_clock(SystemClock, max_age)
    }
}

impl Default for OlderThan<SystemClock> {
    fn default() -> Self {
        Self::with_clock(SystemClock, Duration::milliseconds(DEFAULT_MAX_AGE_MS))
    }
}

impl<C: Clock> OlderThan<C> {
    /// Older than `max_age`, measured against `clock`
    pub fn with_clock(clock: C, max_age: Duration) -> Self {
        Self {
            clock,
            max_age,
            date_field: "date".to_string(),
        }
    }

    /// Read item dates from a different field path (e.g. `author.date`)
    #[must_use]
    pub fn date_field(mut self, path: impl Into<String>) -> Self {
        self.date_field = path.into();
        self
    }

    /// Items dated strictly before this instant are too old.
    ///
    /// Saturates at the representable range, so an age reaching past the
    /// earliest date never matches anything.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.clock
            .now()
            .checked_sub_signed(self.max_age)
            .unwrap_or(if self.max_age > Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    /// Check a single item
    pub fn is_older(&self, item: &JsonValue) -> bool {
        self.matches(item, self.cutoff())
    }

    fn matches(&self, item: &JsonValue, cutoff: DateTime<Utc>) -> bool {
        extract_field(item, &self.date_field)
            .and_then(item_date)
            .is_some_and(|date| date < cutoff)
    }
}

impl<C: Clock> TerminationPredicate for OlderThan<C> {
    fn should_stop(&self, items: &[JsonValue]) -> bool {
        let cutoff = self.cutoff();
        items.iter().any(|item| self.matches(item, cutoff))
    }
}

/// Read an item date from a JSON string or an epoch-milliseconds number
pub fn item_date(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(raw) => parse_item_date(raw),
        JsonValue::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Parse an item date string.
///
/// Accepts RFC 3339, a timestamp without offset (read as UTC, `T` or space
/// separated, optional fraction) and a bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_item_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// Walk a dotted path (`$.a.b` or `a.b`) into a JSON object
pub fn extract_field<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            JsonValue::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    Some(current)
}
