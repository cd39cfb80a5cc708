//! A generic timer abstraction and its tokio-backed implementation.
//!
//! Delays never block the calling thread: a scheduled task is a fire-once timer that runs the
//! callback on a scheduler thread.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    runtime::{Handle, Runtime},
    task::JoinHandle,
};

use crate::{Error, Result};

/// Handle of a scheduled task.
pub trait ScheduledJob: Send + Sync {
    /// Cancel the job. Safe to call repeatedly and after the job has fired.
    fn cancel(&self);

    /// Returns `true` once the timer has fired or the job has been cancelled.
    ///
    /// A fire-once job reports completion as soon as its callback starts, so the callback itself
    /// may schedule a follow-up for the same work.
    fn is_completed(&self) -> bool;
}

/// Runs callbacks after a delay.
///
/// Implementations must never run `task` synchronously inside `schedule()`.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> Box<dyn ScheduledJob>;

    /// Run `task` after `delay` and then every `period` until cancelled.
    fn schedule_periodically(
        &self,
        delay: Duration,
        period: Duration,
        task: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Box<dyn ScheduledJob>;
}

/// [`Scheduler`] spawning one sleeping tokio task per job.
pub struct TokioScheduler {
    handle: Handle,
    // Keeps the dedicated runtime alive when the scheduler owns one.
    _runtime: Option<Arc<OwnedRuntime>>,
}

struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside an async context. Shutting down in the
        // background works anywhere.
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl TokioScheduler {
    /// Create a scheduler spawning jobs onto an existing runtime.
    pub fn new(handle: Handle) -> TokioScheduler {
        TokioScheduler {
            handle,
            _runtime: None,
        }
    }

    /// Create a scheduler on the runtime of the calling thread.
    ///
    /// # Errors
    ///
    /// - [`Error::SchedulerUnavailable`] if called outside of a tokio runtime.
    pub fn current() -> Result<TokioScheduler> {
        Handle::try_current()
            .map(TokioScheduler::new)
            .map_err(|_| Error::SchedulerUnavailable)
    }

    /// Start a dedicated single-worker runtime for the scheduler.
    ///
    /// # Errors
    ///
    /// - IO Error if the runtime failed to start.
    pub fn start() -> Result<TokioScheduler> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("inapp-scheduler")
            .enable_time()
            .build()?;

        Ok(TokioScheduler {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> Box<dyn ScheduledJob> {
        let fired = Arc::new(AtomicBool::new(false));
        let handle = {
            let fired = Arc::clone(&fired);
            self.handle.spawn(async move {
                tokio::time::sleep(delay).await;
                fired.store(true, Ordering::SeqCst);
                task();
            })
        };
        Box::new(TokioScheduledJob { handle, fired })
    }

    fn schedule_periodically(
        &self,
        delay: Duration,
        period: Duration,
        task: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Box<dyn ScheduledJob> {
        let handle = self.handle.spawn(async move {
            let start = tokio::time::Instant::now() + delay;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                task();
            }
        });
        Box::new(TokioScheduledJob {
            handle,
            fired: Arc::new(AtomicBool::new(false)),
        })
    }
}

struct TokioScheduledJob {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

impl ScheduledJob for TokioScheduledJob {
    fn cancel(&self) {
        self.handle.abort();
    }

    fn is_completed(&self) -> bool {
        self.fired.load(Ordering::SeqCst) || self.handle.is_finished()
    }
}
