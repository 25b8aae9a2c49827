//! Page fetcher
//!
//! Performs one authenticated GET per page through the shared
//! [`QuotaScheduler`] and decodes the `{ values, next }` body.
//!
//! Non-2xx handling is a deliberate, configurable choice:
//! - [`StatusHandling::Strict`] (default) fails with `Error::HttpStatus`
//! - [`StatusHandling::Lenient`] logs the status and decodes the body anyway,
//!   for servers that ship a usable payload with an error status

use super::scheduler::QuotaScheduler;
use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::types::Page;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// How a non-2xx response is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusHandling {
    /// Non-2xx is an error
    #[default]
    Strict,
    /// Non-2xx is logged and the body is decoded regardless
    Lenient,
}

/// Configuration for the page fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Treatment of non-2xx responses
    pub status_handling: StatusHandling,
    /// Per-attempt request timeout (none by default)
    pub request_timeout: Option<Duration>,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            status_handling: StatusHandling::default(),
            request_timeout: None,
            user_agent: format!("quota-pager/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    /// Create a new config builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }
}

/// Builder for fetcher config
#[derive(Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Set status handling
    pub fn status_handling(mut self, handling: StatusHandling) -> Self {
        self.config.status_handling = handling;
        self
    }

    /// Decode non-2xx bodies instead of failing
    pub fn lenient(self) -> Self {
        self.status_handling(StatusHandling::Lenient)
    }

    /// Set a per-attempt request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

/// Source of listing pages
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch and decode the page at `url`, giving up once `deadline` passes
    async fn fetch_page(
        &self,
        url: &str,
        credentials: &Credentials,
        deadline: Option<Instant>,
    ) -> Result<Page>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch_page(
        &self,
        url: &str,
        credentials: &Credentials,
        deadline: Option<Instant>,
    ) -> Result<Page> {
        (**self).fetch_page(url, credentials, deadline).await
    }
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    async fn fetch_page(
        &self,
        url: &str,
        credentials: &Credentials,
        deadline: Option<Instant>,
    ) -> Result<Page> {
        (**self).fetch_page(url, credentials, deadline).await
    }
}

/// Fetches single listing pages through the shared quota scheduler
pub struct PageFetcher {
    client: Client,
    scheduler: Arc<QuotaScheduler>,
    config: FetcherConfig,
}

impl PageFetcher {
    /// Create a fetcher with default configuration
    pub fn new(scheduler: Arc<QuotaScheduler>) -> Result<Self> {
        Self::with_config(scheduler, FetcherConfig::default())
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(scheduler: Arc<QuotaScheduler>, config: FetcherConfig) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self {
            client,
            scheduler,
            config,
        })
    }

    /// The shared scheduler
    pub fn scheduler(&self) -> &Arc<QuotaScheduler> {
        &self.scheduler
    }

    /// The fetcher configuration
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch one page with no deadline
    pub async fn fetch(&self, url: &str, credentials: &Credentials) -> Result<Page> {
        self.fetch_until(url, credentials, None).await
    }

    /// Fetch one page, abandoning it once `deadline` passes
    pub async fn fetch_until(
        &self,
        url: &str,
        credentials: &Credentials,
        deadline: Option<Instant>,
    ) -> Result<Page> {
        let target = Url::parse(url)?;

        let (status, body) = self
            .scheduler
            .submit_until(url, deadline, || self.send(&target, credentials))
            .await?;

        if !status.is_success() {
            match self.config.status_handling {
                StatusHandling::Strict => {
                    return Err(Error::http_status(
                        status.as_u16(),
                        String::from_utf8_lossy(&body).into_owned(),
                    ));
                }
                StatusHandling::Lenient => {
                    warn!(
                        "Failed to fetch page {url}: HTTP {}, decoding body anyway",
                        status.as_u16()
                    );
                }
            }
        }

        let mut page = Page::from_slice(&body)?;
        if let Some(next) = page.next.take().filter(|n| !n.is_empty()) {
            // An unresolvable link fails when it is followed, not here
            page.next = Some(match resolve_link(&target, &next) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Cannot resolve next link {next:?} against {url}: {e}");
                    next
                }
            });
        }
        Ok(page)
    }

    /// One attempt: send the request and read the whole body
    async fn send(&self, url: &Url, credentials: &Credentials) -> Result<(StatusCode, Vec<u8>)> {
        let mut req = credentials.apply(self.client.get(url.clone()));
        if let Some(timeout) = self.config.request_timeout {
            req = req.timeout(timeout);
        }

        let timeout = self.config.request_timeout;
        let response = req.send().await.map_err(|e| transport_error(e, timeout))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        debug!("GET {url} -> {} ({} bytes)", status.as_u16(), body.len());
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(
        &self,
        url: &str,
        credentials: &Credentials,
        deadline: Option<Instant>,
    ) -> Result<Page> {
        self.fetch_until(url, credentials, deadline).await
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

/// Resolve a continuation link against the URL of the page that carried it
pub fn resolve_link(base: &Url, next: &str) -> Result<String> {
    Ok(base.join(next)?.to_string())
}

/// Classify a reqwest failure into the transport error variants
fn transport_error(error: reqwest::Error, timeout: Option<Duration>) -> Error {
    if error.is_timeout() {
        Error::Timeout {
            timeout_ms: timeout.map_or(0, |t| t.as_millis() as u64),
        }
    } else if error.is_connect() {
        Error::connection(error.to_string())
    } else {
        Error::Http(error)
    }
}
