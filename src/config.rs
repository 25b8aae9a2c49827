//! Configuration for quota-pager
//!
//! Every tunable constant lives here with a serde default, so an empty YAML
//! document yields the stock policy: one request in flight, 500ms between
//! dispatches, 1000 dispatches per hour, one retry after 25ms.

use crate::error::{Error, Result};
use crate::http::{FetcherConfig, RetryPolicy, SchedulerConfig, StatusHandling};
use crate::pagination::{PaginationConfig, DEFAULT_MAX_AGE_MS, MAX_DEADLINE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted `predicate.max_age_days` (about a century)
pub const MAX_AGE_DAYS: i64 = 36_525;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pager configuration loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerConfig {
    /// Quota scheduler limits
    pub scheduler: SchedulerSection,

    /// Retry policy
    pub retry: RetrySection,

    /// HTTP settings
    pub http: HttpSection,

    /// Pagination limits
    pub pagination: PaginationSection,

    /// Age predicate settings
    pub predicate: PredicateSection,
}

impl PagerConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject values the scheduler and driver cannot honour
    pub fn validate(&self) -> Result<()> {
        self.scheduler_config().validate()?;
        if self.pagination.max_pages == Some(0) {
            return Err(Error::invalid_value("pagination.max_pages", "must be at least 1"));
        }
        if self
            .pagination
            .deadline_seconds
            .is_some_and(|secs| secs > MAX_DEADLINE.as_secs())
        {
            return Err(Error::invalid_value(
                "pagination.deadline_seconds",
                format!("must not exceed {}", MAX_DEADLINE.as_secs()),
            ));
        }
        if !(1..=MAX_AGE_DAYS).contains(&self.predicate.max_age_days) {
            return Err(Error::invalid_value(
                "predicate.max_age_days",
                format!("must be between 1 and {MAX_AGE_DAYS}"),
            ));
        }
        Ok(())
    }

    /// Scheduler limits
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(
            self.scheduler.max_concurrent,
            Duration::from_millis(self.scheduler.min_time_ms),
            self.scheduler.reservoir,
            Duration::from_secs(self.scheduler.refill_interval_seconds),
        )
    }

    /// Retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.delay_ms),
        )
    }

    /// Fetcher settings
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            status_handling: self.http.status_handling,
            request_timeout: self.http.request_timeout_ms.map(Duration::from_millis),
            user_agent: self.http.user_agent.clone(),
        }
    }

    /// Pagination limits
    pub fn pagination_config(&self) -> PaginationConfig {
        PaginationConfig {
            max_pages: self.pagination.max_pages,
            deadline: self.pagination.deadline_seconds.map(Duration::from_secs),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Scheduler section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Units executing at once
    pub max_concurrent: u32,
    /// Minimum milliseconds between dispatch starts
    pub min_time_ms: u64,
    /// Dispatches per refill interval
    pub reservoir: u32,
    /// Seconds between reservoir resets
    pub refill_interval_seconds: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        let defaults = SchedulerConfig::default();
        Self {
            max_concurrent: defaults.max_concurrent,
            min_time_ms: defaults.min_time.as_millis() as u64,
            reservoir: defaults.reservoir,
            refill_interval_seconds: defaults.refill_interval.as_secs(),
        }
    }
}

/// Retry section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Re-attempts after the first transport failure
    pub max_retries: u32,
    /// Milliseconds before a re-attempt
    pub delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_retries: defaults.max_retries,
            delay_ms: defaults.delay.as_millis() as u64,
        }
    }
}

/// HTTP section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Treatment of non-2xx responses
    pub status_handling: StatusHandling,
    /// Per-attempt request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = FetcherConfig::default();
        Self {
            status_handling: defaults.status_handling,
            request_timeout_ms: None,
            user_agent: defaults.user_agent,
        }
    }
}

/// Pagination section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSection {
    /// Maximum pages per run
    pub max_pages: Option<u32>,
    /// Time budget per run in seconds
    pub deadline_seconds: Option<u64>,
}

/// Age predicate section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateSection {
    /// Maximum item age in days
    pub max_age_days: i64,
    /// Dotted path of the item date field
    pub date_field: String,
}

impl Default for PredicateSection {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_AGE_MS / 86_400_000,
            date_field: "date".to_string(),
        }
    }
}
