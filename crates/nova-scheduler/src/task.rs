use tokio::sync::oneshot;

use crate::{CancellationToken, TaskError};

/// Handle to a job running on the scheduler's background pool.
pub struct BlockingTask<T> {
    token: CancellationToken,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> BlockingTask<T> {
    pub(crate) fn new(
        token: CancellationToken,
        rx: oneshot::Receiver<Result<T, TaskError>>,
    ) -> Self {
        Self { token, rx }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for the job's result. Resolves early with [`TaskError::Cancelled`] once the token is
    /// cancelled; the job itself is expected to notice the token and unwind on its own.
    pub async fn join(self) -> Result<T, TaskError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(TaskError::Cancelled),
            result = self.rx => match result {
                Ok(result) => result,
                Err(_) => Err(TaskError::Panicked),
            }
        }
    }
}

/// Handle to a long-lived async task, such as a pipeline's consumer loop.
pub struct AsyncTask<T> {
    token: CancellationToken,
    handle: tokio::task::JoinHandle<Result<T, TaskError>>,
}

impl<T> AsyncTask<T> {
    pub(crate) fn new(
        token: CancellationToken,
        handle: tokio::task::JoinHandle<Result<T, TaskError>>,
    ) -> Self {
        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task to finish on its own.
    ///
    /// Unlike [`BlockingTask::join`] this does not race the token: a cancelled loop is given the
    /// chance to unwind cooperatively, and its own `Cancelled` result is reported.
    pub async fn join(self) -> Result<T, TaskError> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(TaskError::Cancelled),
            Err(_err) => Err(TaskError::Panicked),
        }
    }
}
