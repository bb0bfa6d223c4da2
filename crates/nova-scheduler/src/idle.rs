use std::{future::Future, hash::Hash, time::Duration};

use crate::{CancellationToken, Cancelled, CoalescingQueue};

/// Sleeps until `queue` has seen no insert or merge for `backoff`.
///
/// Every new arrival pushes the deadline out again, so a burst of edits is processed once the
/// burst is over.
async fn wait_for_quiet<K, V>(
    queue: &CoalescingQueue<K, V>,
    backoff: Duration,
    token: &CancellationToken,
) -> Result<(), Cancelled>
where
    K: Clone + Eq + Hash,
{
    loop {
        Cancelled::check(token)?;
        let deadline = queue.last_access() + backoff;
        let now = tokio::time::Instant::now();
        if deadline <= now {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Cancelled),
            _ = tokio::time::sleep(deadline - now) => {}
        }
    }
}

/// Drives a single consumer over `queue` until `token` is cancelled.
///
/// Each round waits for a permit, backs off until the queue is quiet, takes exactly one entry
/// and runs `execute` on it outside the queue lock. Cancellation is checked before every wait
/// and before every execution; an `execute` already in flight is allowed to finish.
///
/// # Panics
///
/// Panics if a permit is granted without a pending entry. That breaks the queue's core
/// invariant and continuing would silently lose work.
pub async fn run_idle_loop<K, V, F, Fut>(
    name: &'static str,
    queue: &CoalescingQueue<K, V>,
    backoff: Duration,
    token: &CancellationToken,
    mut execute: F,
) -> Result<(), Cancelled>
where
    K: Clone + Eq + Hash,
    F: FnMut(K, V) -> Fut,
    Fut: Future<Output = ()>,
{
    tracing::debug!(target = "nova.scheduler", processor = name, "idle loop started");
    let result = loop {
        if let Err(err) = queue.wait(token).await {
            break Err(err);
        }
        if let Err(err) = wait_for_quiet(queue, backoff, token).await {
            break Err(err);
        }

        let (key, value) = match queue.take_one() {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!(
                    target = "nova.scheduler",
                    processor = name,
                    error = %err,
                    "pending queue is inconsistent"
                );
                panic!("{name}: {err}");
            }
        };

        execute(key, value).await;
    };
    tracing::debug!(target = "nova.scheduler", processor = name, "idle loop stopped");
    result
}
