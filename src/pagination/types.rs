//! Pagination types and traits
//!
//! Defines the state carried through one pagination run, its limits, and
//! the termination predicate abstraction.

use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::time::Duration;

/// Longest accepted time budget for one run
pub const MAX_DEADLINE: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Caller-supplied condition for stopping pagination early.
///
/// Invoked with every item accumulated so far after each page. Must be pure:
/// no I/O, no hidden state. Time-relative predicates read an injected
/// [`Clock`](crate::clock::Clock).
pub trait TerminationPredicate: Send + Sync {
    /// Return true to stop before following the next continuation link
    fn should_stop(&self, items: &[JsonValue]) -> bool;
}

impl<F> TerminationPredicate for F
where
    F: Fn(&[JsonValue]) -> bool + Send + Sync,
{
    fn should_stop(&self, items: &[JsonValue]) -> bool {
        self(items)
    }
}

/// Limits for one pagination run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationConfig {
    /// Maximum number of pages to fetch before failing
    pub max_pages: Option<u32>,
    /// Time budget for the whole run
    pub deadline: Option<Duration>,
}

impl PaginationConfig {
    /// Create a config with no limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `PaginationLimitExceeded` instead of fetching more than `max_pages`
    #[must_use]
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Abandon the run once `deadline` has elapsed
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Validate the limits
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == Some(0) {
            return Err(Error::invalid_value("max_pages", "must be at least 1"));
        }
        if self.deadline.is_some_and(|d| d > MAX_DEADLINE) {
            return Err(Error::invalid_value(
                "deadline",
                format!("must not exceed {}s", MAX_DEADLINE.as_secs()),
            ));
        }
        Ok(())
    }
}

/// Tracks pagination state during one run
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// URL of the page to fetch next
    pub current_url: String,
    /// Items accumulated so far, in server order
    pub items: Vec<JsonValue>,
    /// Pages fetched so far
    pub pages_fetched: u32,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state starting at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            current_url: url.into(),
            ..Default::default()
        }
    }

    /// Append one page's items
    pub fn accumulate(&mut self, values: Vec<JsonValue>) {
        self.items.extend(values);
        self.pages_fetched += 1;
    }

    /// Follow a continuation link
    pub fn advance(&mut self, next: String) {
        self.current_url = next;
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Consume the state, returning the accumulated items
    pub fn into_items(self) -> Vec<JsonValue> {
        self.items
    }

    /// Consume the state into an error that carries the partial items
    pub fn fail(self, source: Error) -> Error {
        Error::incomplete(self.pages_fetched, self.items, source)
    }
}
