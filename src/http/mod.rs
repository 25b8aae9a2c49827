//! HTTP module
//!
//! Provides the quota scheduler, the retry policy and the page fetcher.
//!
//! # Features
//!
//! - **Quota Scheduling**: one request in flight, minimum spacing between
//!   dispatches, and an hourly reservoir that hard-resets on schedule
//! - **Single Retry**: transport failures get exactly one more attempt after
//!   a fixed delay
//! - **Page Fetching**: Basic-authenticated GET with `{ values, next }`
//!   decoding and configurable non-2xx handling

mod fetcher;
mod retry;
mod scheduler;

pub use fetcher::{
    resolve_link, FetcherConfig, FetcherConfigBuilder, PageFetcher, PageSource, StatusHandling,
};
pub use retry::RetryPolicy;
pub use scheduler::{QuotaScheduler, QuotaSnapshot, SchedulerConfig, MAX_SCHEDULER_INTERVAL};
