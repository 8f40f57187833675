//! Background execution of AsyncUpdate handlers.
//!
//! A machine launches at most one AsyncUpdate task at a time and only
//! remembers whether it is still running. Tasks are never cancelled: they run
//! to completion even if the machine changes state or its subject is
//! destroyed.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

/// Completion signal of a launched task.
pub trait TaskHandle {
    fn is_finished(&self) -> bool;
}

/// Runs futures in the background, interleaved with subsequent ticks.
pub trait TaskLauncher {
    fn launch(&self, task: BoxFuture<'static, ()>) -> Box<dyn TaskHandle>;
}

/// Per-machine record of the in-flight AsyncUpdate task.
#[derive(Default)]
pub enum AsyncSlot {
    #[default]
    Idle,
    Running(Box<dyn TaskHandle>),
}

impl AsyncSlot {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    /// Move back to `Idle` if the running task has completed.
    ///
    /// Returns `true` when this call observed the completion.
    pub fn poll_finished(&mut self) -> bool {
        let finished = match self {
            Self::Running(handle) => handle.is_finished(),
            Self::Idle => false,
        };
        if finished {
            *self = Self::Idle;
        }
        finished
    }
}

impl fmt::Debug for AsyncSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Idle"),
            Self::Running(_) => f.write_str("Running"),
        }
    }
}

impl TaskHandle for tokio::task::JoinHandle<()> {
    fn is_finished(&self) -> bool {
        tokio::task::JoinHandle::is_finished(self)
    }
}

/// Launcher that spawns onto a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioLauncher {
    handle: tokio::runtime::Handle,
}

impl TokioLauncher {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Launcher for the runtime the caller is running inside.
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        tokio::runtime::Handle::try_current().map(Self::new)
    }
}

impl TaskLauncher for TokioLauncher {
    fn launch(&self, task: BoxFuture<'static, ()>) -> Box<dyn TaskHandle> {
        Box::new(self.handle.spawn(task))
    }
}

struct CooperativeTask {
    future: BoxFuture<'static, ()>,
    done: Arc<AtomicBool>,
}

struct Completion(Arc<AtomicBool>);

impl TaskHandle for Completion {
    fn is_finished(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Launcher for hosts without an async runtime.
///
/// Launched tasks are only polled when the host calls
/// [`CooperativeLauncher::poll_tasks`], typically once per frame, so they
/// advance in lock step with the game loop. Clones share the same task list.
#[derive(Clone, Default)]
pub struct CooperativeLauncher {
    tasks: Arc<Mutex<Vec<CooperativeTask>>>,
}

impl CooperativeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll every outstanding task once. Returns how many are still pending.
    pub fn poll_tasks(&self) -> usize {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut tasks = self.lock();
        tasks.retain_mut(|task| match task.future.poll_unpin(&mut cx) {
            Poll::Ready(()) => {
                task.done.store(true, Ordering::SeqCst);
                false
            }
            Poll::Pending => true,
        });
        tasks.len()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CooperativeTask>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskLauncher for CooperativeLauncher {
    fn launch(&self, task: BoxFuture<'static, ()>) -> Box<dyn TaskHandle> {
        let done = Arc::new(AtomicBool::new(false));
        self.lock().push(CooperativeTask {
            future: task,
            done: Arc::clone(&done),
        });
        Box::new(Completion(done))
    }
}

impl fmt::Debug for CooperativeLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooperativeLauncher")
            .field("pending", &self.pending())
            .finish()
    }
}
