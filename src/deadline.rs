//! Wall-clock budget with cancellation for the polling loops

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A start instant, a budget, and a token that aborts any pending sleep
///
/// Every suspension in the wait stage goes through [`Deadline::sleep`], so a
/// cancelled build stops at the next poll boundary and no sleep ever overruns
/// the budget.
#[derive(Clone, Debug)]
pub struct Deadline {
    start: Instant,
    budget: Duration,
    cancel: CancellationToken,
}

impl Deadline {
    /// Start a budget now
    pub fn new(budget: Duration, cancel: CancellationToken) -> Self {
        Self {
            start: Instant::now(),
            budget,
            cancel,
        }
    }

    /// Time since the budget started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    /// Whether the budget is used up
    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Total budget
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`Error::Cancelled`] if cancellation was requested
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Sleep for `duration`, clipped to the remaining budget
    ///
    /// Returns [`Error::Cancelled`] as soon as the token is cancelled.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        let duration = duration.min(self.remaining());
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
