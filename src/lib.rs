//! # quota-pager
//!
//! Quota-scheduled fetching of paginated JSON listings.
//!
//! Every outbound request passes through one shared [`QuotaScheduler`]: at
//! most one request in flight, at least 500ms between dispatches, and no
//! more than 1000 dispatches per hour. Transport failures are retried once
//! after 25ms. A [`PaginationDriver`] follows `next` links, accumulating
//! `values` until the listing ends or a [`TerminationPredicate`] says stop.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quota_pager::{fetch_all_pages, OlderThan, PageFetcher, QuotaScheduler, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scheduler = Arc::new(QuotaScheduler::default());
//!     let fetcher = PageFetcher::new(scheduler)?;
//!
//!     // Stop once anything older than 90 days shows up
//!     let recent = OlderThan::default();
//!     let items = fetch_all_pages(
//!         &fetcher,
//!         "https://api.example.com/2.0/repositories/acme/commits",
//!         "alice",
//!         "app-password",
//!         Some(&recent),
//!     )
//!     .await?;
//!
//!     println!("{} items", items.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  PaginationDriver    fetch_all_pages(url, creds, predicate)│
//! │    accumulate values → predicate? → follow next            │
//! └─────────────────────────────┬──────────────────────────────┘
//!                               │ PageSource
//! ┌─────────────────────────────┴──────────────────────────────┐
//! │  PageFetcher         GET + Basic auth → Page{values,next}  │
//! └─────────────────────────────┬──────────────────────────────┘
//!                               │ submit(id, action)
//! ┌─────────────────────────────┴──────────────────────────────┐
//! │  QuotaScheduler      FIFO │ 1 in flight │ 500ms │ 1000/h   │
//! │  RetryPolicy         transport errors → one retry @ 25ms   │
//! └────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Wall-clock abstraction
pub mod clock;

/// Basic authentication
pub mod auth;

/// Quota scheduler, retry policy and page fetcher
pub mod http;

/// Pagination driver and termination predicates
pub mod pagination;

/// YAML configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use auth::Credentials;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::PagerConfig;
pub use http::{
    FetcherConfig, PageFetcher, PageSource, QuotaScheduler, RetryPolicy, SchedulerConfig,
    StatusHandling,
};
pub use pagination::{
    fetch_all_pages, OlderThan, PaginationConfig, PaginationDriver, TerminationPredicate,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
