//! Pagination driver

use super::types::{PaginationConfig, PaginationState, TerminationPredicate};
use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::http::{PageFetcher, PageSource};
use crate::types::JsonValue;
use tokio::time::Instant;
use tracing::debug;

/// Drives a paginated listing to completion
#[derive(Debug)]
pub struct PaginationDriver<S> {
    source: S,
    config: PaginationConfig,
}

impl<S: PageSource> PaginationDriver<S> {
    /// Create a driver over a page source, with no page or time limits
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: PaginationConfig::default(),
        }
    }

    /// Set pagination limits
    #[must_use]
    pub fn with_config(mut self, config: PaginationConfig) -> Self {
        self.config = config;
        self
    }

    /// The page source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The pagination limits
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Fetch every page starting at `url` and return all items in order.
    ///
    /// Stops when a page has no continuation link, or right after the page
    /// on which `predicate` returns true. Any failure aborts the run and is
    /// returned as [`Error::Incomplete`] carrying the items gathered so far.
    /// Out-of-range limits are rejected before the first fetch.
    pub async fn fetch_all_pages(
        &self,
        url: &str,
        credentials: &Credentials,
        predicate: Option<&dyn TerminationPredicate>,
    ) -> Result<Vec<JsonValue>> {
        self.config.validate()?;
        let deadline = match self.config.deadline {
            Some(budget) => Some(
                Instant::now()
                    .checked_add(budget)
                    .ok_or_else(|| Error::invalid_value("deadline", "out of range"))?,
            ),
            None => None,
        };
        let mut state = PaginationState::new(url);

        while !state.done {
            if let Some(max_pages) = self.config.max_pages {
                if state.pages_fetched >= max_pages {
                    return Err(state.fail(Error::PaginationLimitExceeded { max_pages }));
                }
            }

            debug!("Fetching page {}", state.pages_fetched + 1);
            let page = match self
                .source
                .fetch_page(&state.current_url, credentials, deadline)
                .await
            {
                Ok(page) => page,
                Err(e) => return Err(state.fail(e)),
            };

            let (values, next) = page.into_parts();
            state.accumulate(values);

            if predicate.is_some_and(|p| p.should_stop(&state.items)) {
                debug!(
                    "Termination predicate matched after page {}",
                    state.pages_fetched
                );
                state.mark_done();
                continue;
            }

            match next {
                Some(next) => state.advance(next),
                None => state.mark_done(),
            }
        }

        debug!(
            "Pagination finished: {} page(s), {} item(s)",
            state.pages_fetched,
            state.items.len()
        );
        Ok(state.into_items())
    }
}

/// Fetch every page of a listing with Basic credentials.
///
/// Convenience wrapper over [`PaginationDriver`] with no page or time limits.
pub async fn fetch_all_pages(
    fetcher: &PageFetcher,
    url: &str,
    user: &str,
    password: &str,
    predicate: Option<&dyn TerminationPredicate>,
) -> Result<Vec<JsonValue>> {
    let credentials = Credentials::new(user, password);
    PaginationDriver::new(fetcher)
        .fetch_all_pages(url, &credentials, predicate)
        .await
}
