use std::sync::Arc;

use parking_lot::RwLock;

use crate::Solution;

/// The live, mutable view of the solution.
///
/// Readers get the latest immutable snapshot and keep using it without holding any lock.
/// Consumers that act on queued requests should read a fresh snapshot at execution time rather
/// than capturing one when the request was made.
#[derive(Debug, Default)]
pub struct Workspace {
    current: RwLock<Arc<Solution>>,
}

impl Workspace {
    pub fn new(solution: Solution) -> Self {
        Self {
            current: RwLock::new(Arc::new(solution)),
        }
    }

    pub fn current_solution(&self) -> Arc<Solution> {
        Arc::clone(&self.current.read())
    }

    pub fn set_current_solution(&self, solution: Solution) -> Arc<Solution> {
        let solution = Arc::new(solution);
        *self.current.write() = Arc::clone(&solution);
        tracing::trace!(
            target = "nova.solution",
            version = solution.version(),
            "solution replaced"
        );
        solution
    }

    /// Atomically derives the next snapshot from the current one.
    pub fn update(&self, edit: impl FnOnce(&Solution) -> Solution) -> Arc<Solution> {
        let mut current = self.current.write();
        let next = Arc::new(edit(&current));
        *current = Arc::clone(&next);
        drop(current);
        tracing::trace!(
            target = "nova.solution",
            version = next.version(),
            "solution updated"
        );
        next
    }
}
