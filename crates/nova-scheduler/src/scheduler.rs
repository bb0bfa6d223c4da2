use std::{any::Any, future::Future, sync::Arc};

use rayon::ThreadPool;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

use crate::{task::AsyncTask, task::BlockingTask, CancellationToken, Cancelled, TaskError};

enum BlockingPool {
    Rayon(ThreadPool),
    Inline,
}

impl BlockingPool {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            BlockingPool::Rayon(pool) => pool.spawn(job),
            BlockingPool::Inline => job(),
        }
    }
}

fn build_rayon_pool(prefix: &'static str, threads: usize) -> BlockingPool {
    // Thread creation can fail in constrained CI/sandbox environments (e.g. low RLIMIT_NPROC or
    // `EAGAIN`). Degrade to a smaller pool, then to inline execution, instead of crashing.
    let mut threads = threads.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |idx| format!("{prefix}-{idx}"))
            .build()
        {
            Ok(pool) => return BlockingPool::Rayon(pool),
            Err(_) if threads > 1 => {
                threads = (threads / 2).max(1);
            }
            Err(_) => return BlockingPool::Inline,
        }
    }
}

fn build_io_runtime(threads: usize) -> Runtime {
    let mut threads = threads.max(1);
    loop {
        match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .enable_time()
            .thread_name("nova-io")
            .build()
        {
            Ok(rt) => return rt,
            Err(_) if threads > 1 => {
                threads = 1;
            }
            Err(err) => {
                return tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .unwrap_or_else(|_| panic!("failed to build IO runtime: {err}"));
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub background_threads: usize,
    pub io_threads: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            // `available_parallelism()` can over-report inside containers; keep the defaults
            // conservative and let callers opt into more threads explicitly.
            background_threads: available.clamp(1, 2),
            io_threads: 1,
        }
    }
}

/// Owns the runtimes that background pipelines execute on.
///
/// Long-lived consumer loops run as async tasks on the IO runtime; CPU-bound expansion work
/// (dependency-graph walks, document enumeration) is handed to the background pool so it never
/// stalls the loops.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    background_pool: BlockingPool,
    io_runtime: Option<Runtime>,
    io_handle: tokio::runtime::Handle,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let background_pool = build_rayon_pool("nova-background", config.background_threads);
        let io_runtime = build_io_runtime(config.io_threads);
        let io_handle = io_runtime.handle().clone();

        Self {
            inner: Arc::new(SchedulerInner {
                background_pool,
                io_runtime: Some(io_runtime),
                io_handle,
            }),
        }
    }

    /// Build a scheduler that reuses an existing Tokio runtime for IO tasks.
    ///
    /// Use this when already running inside a Tokio runtime (a `#[tokio::main]` binary or a
    /// `#[tokio::test]`) to avoid spawning an extra `nova-io` runtime.
    pub fn new_with_io_handle(config: SchedulerConfig, io_handle: tokio::runtime::Handle) -> Self {
        let background_pool = build_rayon_pool("nova-background", config.background_threads);

        Self {
            inner: Arc::new(SchedulerInner {
                background_pool,
                io_runtime: None,
                io_handle,
            }),
        }
    }

    pub fn io_handle(&self) -> tokio::runtime::Handle {
        self.inner.io_handle.clone()
    }

    pub fn spawn_background_with_token<T, F>(
        &self,
        token: CancellationToken,
        f: F,
    ) -> BlockingTask<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Result<T, Cancelled> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        if token.is_cancelled() {
            let _ = tx.send(Err(TaskError::Cancelled));
            return BlockingTask::new(token, rx);
        }

        let token_for_job = token.clone();
        let job = move || {
            let result =
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(token_for_job))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(err)) => Err(TaskError::from(err)),
                    Err(panic) => {
                        tracing::error!(
                            target = "nova.scheduler",
                            panic = %panic_message(&*panic),
                            "background task panicked"
                        );
                        Err(TaskError::Panicked)
                    }
                };
            let _ = tx.send(result);
        };

        self.inner.background_pool.spawn(job);

        BlockingTask::new(token, rx)
    }

    pub fn spawn_io_with_token<T, F, Fut>(&self, token: CancellationToken, f: F) -> AsyncTask<T>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Cancelled>> + Send + 'static,
    {
        if token.is_cancelled() {
            let handle = self.io_handle().spawn(async { Err(TaskError::Cancelled) });
            return AsyncTask::new(token, handle);
        }

        let token_for_fut = token.clone();
        let handle = self
            .io_handle()
            .spawn(async move { f(token_for_fut).await.map_err(TaskError::from) });
        AsyncTask::new(token, handle)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        if let Some(runtime) = self.io_runtime.take() {
            runtime.shutdown_background();
        }
    }
}
