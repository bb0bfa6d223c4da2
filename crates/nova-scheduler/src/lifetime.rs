use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::watch;

struct TrackerInner {
    next_id: AtomicU64,
    outstanding: watch::Sender<usize>,
}

/// Hands out [`OperationToken`]s and counts how many are still alive.
///
/// A pipeline takes a token when it accepts work and keeps it until that work is finished (or
/// forwarded with a token of its own), so `outstanding() == 0` means the pipelines are quiet.
#[derive(Clone)]
pub struct AsyncOperationTracker {
    inner: Arc<TrackerInner>,
}

impl AsyncOperationTracker {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackerInner {
                next_id: AtomicU64::new(1),
                outstanding,
            }),
        }
    }

    pub fn begin(&self, operation: &'static str) -> OperationToken {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.outstanding.send_modify(|count| *count += 1);
        OperationToken {
            id,
            operation,
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.borrow()
    }

    /// Resolves once no token is outstanding.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for AsyncOperationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncOperationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOperationTracker")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Completion handle for one unit of asynchronous work.
///
/// Released exactly once, when dropped.
pub struct OperationToken {
    id: u64,
    operation: &'static str,
    inner: Arc<TrackerInner>,
}

impl OperationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl fmt::Debug for OperationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationToken")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .finish()
    }
}

impl Drop for OperationToken {
    fn drop(&mut self) {
        self.inner
            .outstanding
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}
