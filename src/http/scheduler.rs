//! Quota scheduler
//!
//! Admits units of work under three constraints:
//! - a cap on concurrently executing units (one by default)
//! - a minimum spacing between dispatch starts
//! - a reservoir of admission tokens that is reset to full capacity on a
//!   fixed schedule, independent of how many tokens were used
//!
//! Units are dispatched in submission order. Failed units are handed to the
//! [`RetryPolicy`]; a retried unit re-enters the back of the queue and pays
//! spacing and quota again.

use super::retry::RetryPolicy;
use crate::error::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Upper bound for spacing and refill interval
pub const MAX_SCHEDULER_INTERVAL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Configuration for the quota scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of units executing at once
    pub max_concurrent: u32,
    /// Minimum time between two dispatch starts
    pub min_time: Duration,
    /// Reservoir capacity (dispatches per refill interval)
    pub reservoir: u32,
    /// Interval after which the reservoir is reset to full capacity
    pub refill_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            min_time: Duration::from_millis(500),
            reservoir: 1000,
            refill_interval: Duration::from_secs(3600),
        }
    }
}

impl SchedulerConfig {
    /// Create a new scheduler config
    pub fn new(
        max_concurrent: u32,
        min_time: Duration,
        reservoir: u32,
        refill_interval: Duration,
    ) -> Self {
        Self {
            max_concurrent,
            min_time,
            reservoir,
            refill_interval,
        }
    }

    /// Serial execution with no spacing and an effectively unlimited reservoir
    pub fn unthrottled() -> Self {
        Self {
            max_concurrent: 1,
            min_time: Duration::ZERO,
            reservoir: u32::MAX,
            refill_interval: Duration::from_secs(3600),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::invalid_value("max_concurrent", "must be at least 1"));
        }
        if self.reservoir == 0 {
            return Err(Error::invalid_value("reservoir", "must be at least 1"));
        }
        if self.refill_interval.is_zero() {
            return Err(Error::invalid_value(
                "refill_interval",
                "must be greater than zero",
            ));
        }
        if self.refill_interval > MAX_SCHEDULER_INTERVAL {
            return Err(Error::invalid_value(
                "refill_interval",
                format!("must not exceed {}s", MAX_SCHEDULER_INTERVAL.as_secs()),
            ));
        }
        if self.min_time > MAX_SCHEDULER_INTERVAL {
            return Err(Error::invalid_value(
                "min_time",
                format!("must not exceed {}s", MAX_SCHEDULER_INTERVAL.as_secs()),
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of the scheduler's quota state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Tokens left in the reservoir
    pub reservoir: u32,
    /// Units currently executing
    pub in_flight: u32,
    /// Total dispatches since the scheduler was created
    pub dispatched: u64,
    /// When the reservoir was last reset
    pub last_refill: Instant,
    /// When the reservoir will next be reset
    pub next_refill: Instant,
    /// Start of the most recent dispatch
    pub last_dispatch: Option<Instant>,
}

#[derive(Debug)]
struct QuotaState {
    reservoir: u32,
    last_refill: Instant,
    next_refill: Instant,
    last_dispatch: Option<Instant>,
    dispatched: u64,
}

impl QuotaState {
    fn new(config: &SchedulerConfig, now: Instant) -> Self {
        Self {
            reservoir: config.reservoir,
            last_refill: now,
            next_refill: now + config.refill_interval,
            last_dispatch: None,
            dispatched: 0,
        }
    }

    /// Reset the reservoir if one or more refill boundaries have passed.
    /// Boundaries stay on the schedule fixed at construction.
    fn refill(&mut self, config: &SchedulerConfig, now: Instant) {
        if now < self.next_refill {
            return;
        }
        while self.next_refill <= now {
            self.last_refill = self.next_refill;
            self.next_refill += config.refill_interval;
        }
        info!(
            "Reservoir refilled to {} (was {})",
            config.reservoir, self.reservoir
        );
        self.reservoir = config.reservoir;
    }
}

enum Admission {
    Dispatch,
    WaitUntil(Instant),
}

/// Holds an execution slot and tracks it in the in-flight count
struct InFlight<'a> {
    counter: &'a AtomicU32,
    _permit: SemaphorePermit<'a>,
}

impl<'a> InFlight<'a> {
    fn new(counter: &'a AtomicU32, permit: SemaphorePermit<'a>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter,
            _permit: permit,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Process-wide admission scheduler for outbound requests.
///
/// Construct once and share it as `Arc<QuotaScheduler>`; the limits apply
/// across every caller holding the same instance.
pub struct QuotaScheduler {
    config: SchedulerConfig,
    retry: RetryPolicy,
    /// FIFO admission queue; held while a unit waits for its turn
    queue: Mutex<()>,
    slots: Semaphore,
    state: StdMutex<QuotaState>,
    in_flight: AtomicU32,
}

impl QuotaScheduler {
    /// Create a scheduler with the given limits and the default retry policy
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        Self::with_retry(config, RetryPolicy::default())
    }

    /// Create a scheduler with the given limits and retry policy
    pub fn with_retry(config: SchedulerConfig, retry: RetryPolicy) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, retry))
    }

    fn build(config: SchedulerConfig, retry: RetryPolicy) -> Self {
        let state = QuotaState::new(&config, Instant::now());
        Self {
            slots: Semaphore::new(config.max_concurrent as usize),
            queue: Mutex::new(()),
            state: StdMutex::new(state),
            in_flight: AtomicU32::new(0),
            config,
            retry,
        }
    }

    /// The scheduler's limits
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The retry policy applied to failed units
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Current quota state. Does not consume or refill anything.
    pub fn snapshot(&self) -> QuotaSnapshot {
        let now = Instant::now();
        let state = self.lock_state();
        let reservoir = if now >= state.next_refill {
            self.config.reservoir
        } else {
            state.reservoir
        };
        QuotaSnapshot {
            reservoir,
            in_flight: self.in_flight.load(Ordering::SeqCst),
            dispatched: state.dispatched,
            last_refill: state.last_refill,
            next_refill: state.next_refill,
            last_dispatch: state.last_dispatch,
        }
    }

    /// Submit a unit of work and wait for its result.
    ///
    /// `action` is invoked once per attempt. Transport failures get one more
    /// attempt under the default retry policy; anything else is returned as is.
    pub async fn submit<F, Fut, T>(&self, id: &str, action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.submit_until(id, None, action).await
    }

    /// Submit a unit of work that is abandoned once `deadline` passes.
    ///
    /// The deadline covers queueing, quota waits, retry delay and execution.
    /// Missing it yields [`Error::DeadlineExceeded`], which is never retried.
    pub async fn submit_until<F, Fut, T>(
        &self,
        id: &str,
        deadline: Option<Instant>,
        mut action: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let submitted = Instant::now();
        let mut retry_count = 0;

        loop {
            let slot = within(deadline, submitted, self.admit(id)).await??;
            let outcome = within(deadline, submitted, action()).await;
            drop(slot);

            let error = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(deadline_err) => {
                    warn!("Job {id} abandoned: {deadline_err}");
                    return Err(deadline_err);
                }
            };

            warn!("Job {id} failed: {error}");
            match self.retry.decide(&error, retry_count) {
                Some(delay) => {
                    retry_count += 1;
                    info!("Retrying job {id} in {}ms", delay.as_millis());
                    within(deadline, submitted, tokio::time::sleep(delay)).await?;
                }
                None => return Err(error),
            }
        }
    }

    /// Wait for this unit's turn and claim an execution slot
    async fn admit(&self, id: &str) -> Result<InFlight<'_>> {
        let _turn = self.queue.lock().await;
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|_| Error::Other("quota scheduler closed".to_string()))?;

        loop {
            match self.try_dispatch(Instant::now()) {
                Admission::Dispatch => break,
                Admission::WaitUntil(at) => {
                    debug!(
                        "Job {id} waiting {:?} for admission",
                        at.saturating_duration_since(Instant::now())
                    );
                    tokio::time::sleep_until(at).await;
                }
            }
        }

        debug!("Dispatching job {id}");
        Ok(InFlight::new(&self.in_flight, permit))
    }

    fn try_dispatch(&self, now: Instant) -> Admission {
        let mut state = self.lock_state();
        state.refill(&self.config, now);

        if state.reservoir == 0 {
            return Admission::WaitUntil(state.next_refill);
        }
        if let Some(last) = state.last_dispatch {
            let earliest = last + self.config.min_time;
            if now < earliest {
                return Admission::WaitUntil(earliest);
            }
        }

        state.reservoir -= 1;
        state.last_dispatch = Some(now);
        state.dispatched += 1;
        Admission::Dispatch
    }

    fn lock_state(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QuotaScheduler {
    fn default() -> Self {
        Self::build(SchedulerConfig::default(), RetryPolicy::default())
    }
}

impl std::fmt::Debug for QuotaScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaScheduler")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Run `fut` to completion, or fail once `deadline` passes
async fn within<F: Future>(
    deadline: Option<Instant>,
    submitted: Instant,
    fut: F,
) -> Result<F::Output> {
    match deadline {
        None => Ok(fut.await),
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
            Error::DeadlineExceeded {
                deadline_ms: deadline.saturating_duration_since(submitted).as_millis() as u64,
            }
        }),
    }
}
