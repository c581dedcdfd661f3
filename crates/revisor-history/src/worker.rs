//! Feeding change events to the dispatcher with redelivery on failure

use std::ops::AddAssign;
use std::time::Duration;

use revisor_store::ChangeEvent;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tracing::{error, warn};

use crate::{
    dispatcher::{Dispatch, VersionDispatcher},
    error::Result,
};

/// Redelivery policy for failed invocations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per event, first delivery included
    pub max_attempts: u32,
    /// Delay before the first redelivery in milliseconds
    pub initial_delay_ms: u64,
    /// Backoff factor (e.g., 2.0 for exponential)
    pub backoff_factor: f64,
    /// Cap on any single delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            backoff_factor: 2.0,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Deliver once, never retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before redelivery number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = (self.initial_delay_ms as f64 * factor) as u64;
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// Counts of what happened while draining a feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Events handled
    pub processed: usize,
    /// Events that ran a navigator transition, cleaned flags or rejected a document
    pub applied: usize,
    /// Events that needed no work
    pub skipped: usize,
    /// Events that failed after every attempt
    pub failed: usize,
}

impl FeedSummary {
    fn record(&mut self, dispatch: &Dispatch) {
        self.processed += 1;
        match dispatch {
            Dispatch::Skipped(_) => self.skipped += 1,
            _ => self.applied += 1,
        }
    }
}

impl AddAssign for FeedSummary {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Handle one event, redelivering it on retryable failures
pub async fn deliver(
    dispatcher: &VersionDispatcher,
    event: &ChangeEvent,
    policy: &RetryPolicy,
) -> Result<Dispatch> {
    let mut attempt = 1;
    loop {
        match dispatcher.handle(event).await {
            Ok(dispatch) => return Ok(dispatch),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                warn!(
                    path = %event.path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Redelivering event"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Handle every event already queued, including the follow-up events the
/// handler's own writes enqueue, until the feed is empty
///
/// Stops at the first event that still fails after redelivery; that event is
/// consumed and later events stay queued.
pub async fn drain_feed(
    dispatcher: &VersionDispatcher,
    receiver: &mut UnboundedReceiver<ChangeEvent>,
    policy: &RetryPolicy,
) -> Result<FeedSummary> {
    let mut summary = FeedSummary::default();
    loop {
        let event = match receiver.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return Ok(summary),
        };
        let dispatch = deliver(dispatcher, &event, policy).await?;
        summary.record(&dispatch);
    }
}

/// Handle events until the feed closes; failures are logged and counted
pub async fn run_feed(
    dispatcher: &VersionDispatcher,
    mut receiver: UnboundedReceiver<ChangeEvent>,
    policy: &RetryPolicy,
) -> FeedSummary {
    let mut summary = FeedSummary::default();
    while let Some(event) = receiver.recv().await {
        match deliver(dispatcher, &event, policy).await {
            Ok(dispatch) => summary.record(&dispatch),
            Err(e) => {
                error!(path = %event.path, error = %e, "Dropping event after failed delivery");
                summary.processed += 1;
                summary.failed += 1;
            }
        }
    }
    summary
}
