//! # Task
//!
//! Module dedicated to the units of work of a synchronization run.
//!
//! An [`ExitNotifyTask`] runs a future on its own tokio task and
//! reports its own termination to a [`Monitor`], whatever the way it
//! terminates: success, failure, panic or abortion. An
//! [`InstanceLimitedTask`] additionally waits for a permit of its
//! class before running, so that no more than N tasks of the same
//! class run at the same time. Spawned tasks are collected in a
//! [`TaskQueue`] that can be joined at once.

mod error;
pub mod limit;
pub mod monitor;
pub mod queue;

use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, trace, warn};

#[doc(inline)]
pub use self::{
    error::{Error, Result},
    limit::{InstanceLimitedTask, PermitRegistry},
    monitor::{Monitor, MonitorEvent},
    queue::TaskQueue,
};
use crate::{AnyBoxedError, AnyResult};

/// The task state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TaskState {
    Created,
    AwaitingPermit,
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Return `true` if the task left the running state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// The way a task terminated.
#[derive(Clone, Debug)]
pub enum TaskOutcome {
    Succeeded,
    Failed(Arc<AnyBoxedError>),
    Panicked(String),
    Cancelled,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Return the terminal state matching the outcome.
    pub fn state(&self) -> TaskState {
        if self.is_success() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(err) => write!(f, "failed: {err}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The report of a joined task.
#[derive(Clone, Debug)]
pub struct TaskReport {
    pub name: String,
    pub outcome: TaskOutcome,
}

/// The handle of a spawned task.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    state: watch::Receiver<TaskState>,
    handle: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the current state of the task.
    pub fn state(&self) -> TaskState {
        *self.state.borrow()
    }

    /// Subscribe to state changes of the task.
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.clone()
    }

    /// Abort the task.
    ///
    /// The task is still reported to the monitor, as cancelled.
    pub fn abort(&self) {
        self.handle.abort()
    }

    /// Wait for the task to terminate.
    pub async fn join(self) -> TaskReport {
        let outcome = match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => TaskOutcome::Panicked(panic_message(err.into_panic())),
            Err(_) => TaskOutcome::Cancelled,
        };

        TaskReport {
            name: self.name,
            outcome,
        }
    }
}

/// The exit-notify task.
///
/// Holds everything needed to spawn a future that reports its own
/// termination. The task is in the [`TaskState::Created`] state until
/// spawned.
#[derive(Debug)]
pub struct ExitNotifyTask {
    name: String,
    monitor: Monitor,
    state: watch::Sender<TaskState>,
}

impl ExitNotifyTask {
    pub fn new(name: impl ToString, monitor: Monitor) -> Self {
        let (state, _) = watch::channel(TaskState::Created);

        Self {
            name: name.to_string(),
            monitor,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribe to state changes of the task.
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.send_replace(state);
    }

    /// Spawn the given future.
    pub fn spawn<F>(self, task: F) -> TaskHandle
    where
        F: Future<Output = AnyResult<()>> + Send + 'static,
    {
        self.spawn_with(task, ())
    }

    /// Spawn the given future, holding the given guard until the task
    /// has been reported.
    pub(crate) fn spawn_with<F, G>(self, task: F, guard: G) -> TaskHandle
    where
        F: Future<Output = AnyResult<()>> + Send + 'static,
        G: Send + 'static,
    {
        let state = self.state.subscribe();
        let name = self.name.clone();

        let mut notifier = ExitNotifier {
            name: self.name,
            monitor: self.monitor,
            state: self.state,
            outcome: None,
            _guard: guard,
        };

        let handle = tokio::spawn(async move {
            notifier.start();

            let outcome = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => TaskOutcome::Succeeded,
                Ok(Err(err)) => TaskOutcome::Failed(Arc::new(err)),
                Err(panic) => TaskOutcome::Panicked(panic_message(panic)),
            };

            notifier.outcome = Some(outcome.clone());
            outcome
        });

        TaskHandle {
            name,
            state,
            handle,
        }
    }
}

/// Reports the task termination when dropped.
///
/// The notifier lives inside the spawned future, so it is dropped on
/// every exit path, abortion included. The guard is dropped after the
/// report.
struct ExitNotifier<G> {
    name: String,
    monitor: Monitor,
    state: watch::Sender<TaskState>,
    outcome: Option<TaskOutcome>,
    _guard: G,
}

impl<G> ExitNotifier<G> {
    fn start(&self) {
        debug!("task {} started", self.name);
        self.state.send_replace(TaskState::Running);
        self.monitor.emit(MonitorEvent::TaskStarted(self.name.clone()));
    }
}

impl<G> Drop for ExitNotifier<G> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(TaskOutcome::Cancelled);

        match &outcome {
            TaskOutcome::Succeeded => debug!("task {} succeeded", self.name),
            TaskOutcome::Failed(err) => {
                warn!("task {} failed: {err}", self.name);
                trace!("{err:?}");
            }
            outcome => warn!("task {} {outcome}", self.name),
        }

        self.state.send_replace(outcome.state());

        if let TaskOutcome::Failed(err) = &outcome {
            self.monitor.error(format!("Running task {}", self.name), err.clone());
        }

        self.monitor.emit(MonitorEvent::TaskExited(self.name.clone(), outcome));
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("unknown panic")
    }
}
