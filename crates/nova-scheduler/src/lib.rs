//! Runtime primitives shared by Nova's background pipelines.
//!
//! - [`Scheduler`] owns the IO runtime handle and the background thread pool.
//! - [`CoalescingQueue`] is a keyed pending map paired with a counting signal.
//! - [`run_idle_loop`] drives the wait → back-off → execute cycle of a single consumer.
//! - [`AsyncOperationTracker`] hands out [`OperationToken`]s that track in-flight work.
//!
//! Cancellation is cooperative everywhere via [`CancellationToken`].

mod coalesce;
mod idle;
mod lifetime;
mod scheduler;
mod task;

use thiserror::Error;

pub use coalesce::{CoalescingQueue, Enqueued, QueueInvariantViolation};
pub use idle::run_idle_loop;
pub use lifetime::{AsyncOperationTracker, OperationToken};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use task::{AsyncTask, BlockingTask};
pub use tokio_util::sync::CancellationToken;

/// Returned by cooperative work that observed cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

impl Cancelled {
    /// Returns `Err(Cancelled)` once `token` has been cancelled.
    pub fn check(token: &CancellationToken) -> Result<(), Cancelled> {
        if token.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("task cancelled")]
    Cancelled,
    #[error("task panicked")]
    Panicked,
}

impl From<Cancelled> for TaskError {
    fn from(_: Cancelled) -> Self {
        TaskError::Cancelled
    }
}
