//! Background execution contexts for async suppliers.

use crate::sync::lock;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, SendError};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use tracing::{debug, warn};

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs deferred computations off the caller's thread.
///
/// The actor only needs `execute`: run the job at some point and let it
/// report back by itself. Implementations decide on threads and queueing.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

impl<T: Executor + ?Sized> Executor for Arc<T> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}

/// The executor actors use when none is configured: one process-wide
/// [`SerialExecutor`].
pub fn default_executor() -> Arc<dyn Executor> {
    static DEFAULT: OnceLock<Arc<dyn Executor>> = OnceLock::new();
    let executor = DEFAULT.get_or_init(|| {
        let executor: Arc<dyn Executor> = match SerialExecutor::spawn("troupe-worker") {
            Ok(serial) => Arc::new(serial),
            Err(err) => {
                warn!(%err, "could not start default worker, using thread-per-job");
                Arc::new(ThreadExecutor::default())
            }
        };
        executor
    });
    Arc::clone(executor)
}

/// Runs jobs immediately on the calling thread.
///
/// Async suppliers then complete before `exec` returns, which makes tests
/// deterministic. Blocking suppliers block the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job()
    }
}

/// Holds jobs until the caller runs them with [`step`](Self::step) or
/// [`run_all`](Self::run_all).
///
/// Suppliers then complete exactly when the caller says so, which lets a
/// test order them against other signals such as deactivation or disposal.
/// Share one instance as `Arc<ManualExecutor>` between the actor's config
/// and the code that steps it.
#[derive(Default)]
pub struct ManualExecutor {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the oldest held job on the calling thread. Returns `false` if
    /// there was none.
    pub fn step(&self) -> bool {
        let job = lock(&self.jobs).pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run held jobs, including any they schedule, until none are left.
    /// Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.step() {
            ran += 1;
        }
        ran
    }

    /// Number of jobs waiting to be run.
    pub fn pending(&self) -> usize {
        lock(&self.jobs).len()
    }
}

impl fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, job: Job) {
        lock(&self.jobs).push_back(job);
    }
}

/// Spawns a new named thread for every job.
#[derive(Clone, Debug)]
pub struct ThreadExecutor {
    name: String,
}

impl ThreadExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("troupe-task")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        // The job is moved into the spawn call, so a failed spawn cannot hand
        // it back. Share it through a slot to run it inline instead.
        let slot = Arc::new(Mutex::new(Some(job)));
        let remote = Arc::clone(&slot);
        let spawned = thread::Builder::new().name(self.name.clone()).spawn(move || {
            if let Some(job) = lock(&remote).take() {
                job();
            }
        });
        if let Err(err) = spawned {
            warn!(%err, "failed to spawn task thread, running inline");
            if let Some(job) = lock(&slot).take() {
                job();
            }
        }
    }
}

/// Runs jobs one at a time, in submission order, on a single background
/// thread.
#[derive(Debug)]
pub struct SerialExecutor {
    tx: mpsc::Sender<Job>,
}

impl SerialExecutor {
    /// Start the worker thread.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::Builder::new().name(name.into()).spawn(move || {
            for job in rx {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("serial executor job panicked");
                }
            }
            debug!("serial executor stopped");
        })?;
        Ok(Self { tx })
    }
}

impl Executor for SerialExecutor {
    fn execute(&self, job: Job) {
        if let Err(SendError(job)) = self.tx.send(job) {
            warn!("serial executor worker is gone, running inline");
            job();
        }
    }
}

/// Runs jobs on a tokio runtime's blocking pool.
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        tokio::runtime::Handle::try_current().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        // Completion is reported by the job itself.
        drop(self.handle.spawn_blocking(job));
    }
}
