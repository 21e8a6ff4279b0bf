//! # Monitor
//!
//! Module dedicated to the task monitor. Tasks report their own
//! termination to the monitor instead of being polled, and failures
//! are handed over with a contextual description.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::TaskOutcome;
use crate::AnyBoxedError;

/// The monitor event.
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    /// The given task entered the running state.
    TaskStarted(String),

    /// The given task left the running state.
    TaskExited(String, TaskOutcome),

    /// The given number of folders has been listed from the given
    /// repository.
    ListedFolders(String, usize),

    /// The given folder has been created on the given repository.
    CreatedFolder(String, String),

    /// A failure occured, the context describes what was going on.
    Error(String, Arc<AnyBoxedError>),
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskStarted(task) => write!(f, "Started task {task}"),
            Self::TaskExited(task, outcome) => write!(f, "Task {task} exited: {outcome}"),
            Self::ListedFolders(repository, n) => {
                write!(f, "Listed {n} folders from repository {repository}")
            }
            Self::CreatedFolder(folder, repository) => {
                write!(f, "Created folder {folder} on repository {repository}")
            }
            Self::Error(context, err) => write!(f, "{context}: {err}"),
        }
    }
}

/// The monitor handle.
///
/// A cheap, cloneable sender side of the monitor channel. The default
/// monitor discards every event.
#[derive(Clone, Debug, Default)]
pub struct Monitor {
    tx: Option<mpsc::UnboundedSender<MonitorEvent>>,
}

impl Monitor {
    /// Create a monitor and the receiver of its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Send the given event.
    ///
    /// A closed monitor never fails the sender.
    pub fn emit(&self, event: MonitorEvent) {
        if let Some(tx) = self.tx.as_ref() {
            match tx.send(event) {
                Ok(()) => trace!("emitted monitor event"),
                Err(err) => debug!("cannot emit monitor event: {}", err.0),
            }
        }
    }

    /// Hand the given failure to the monitor.
    pub fn error(&self, context: impl ToString, err: Arc<AnyBoxedError>) {
        self.emit(MonitorEvent::Error(context.to_string(), err))
    }
}
