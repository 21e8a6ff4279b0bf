//! # Instance limit
//!
//! Module dedicated to tasks gated by a named, counting permit. The
//! [`PermitRegistry`] holds one semaphore per class name (usually a
//! repository name), and an [`InstanceLimitedTask`] needs a permit of
//! its class before running.

use std::{
    collections::{hash_map::Entry, HashMap},
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

use tokio::sync::{watch, Semaphore};
use tracing::debug;

use super::{Error, ExitNotifyTask, Monitor, Result, TaskHandle, TaskState};
use crate::AnyResult;

#[derive(Debug)]
struct Permits {
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

/// The permit registry.
///
/// Capacities are set once per class, before the first task of the
/// class starts, and never change afterwards.
#[derive(Debug, Default)]
pub struct PermitRegistry {
    permits: RwLock<HashMap<String, Permits>>,
}

impl PermitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize permits of the given class.
    ///
    /// The first call for a class wins, later calls do nothing and
    /// return `false`.
    pub fn init(&self, class: impl ToString, capacity: usize) -> Result<bool> {
        let class = class.to_string();

        if capacity == 0 {
            return Err(Error::InvalidPermitCapacityError(class));
        }

        let mut permits = self
            .permits
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match permits.entry(class) {
            Entry::Occupied(entry) => {
                debug!("permits of class {} already initialized", entry.key());
                Ok(false)
            }
            Entry::Vacant(entry) => {
                debug!("initializing {capacity} permits of class {}", entry.key());
                entry.insert(Permits {
                    capacity,
                    semaphore: Arc::new(Semaphore::new(capacity)),
                });
                Ok(true)
            }
        }
    }

    /// Return the capacity of the given class, if initialized.
    pub fn capacity(&self, class: &str) -> Option<usize> {
        let permits = self.permits.read().unwrap_or_else(PoisonError::into_inner);
        permits.get(class).map(|permits| permits.capacity)
    }

    /// Return the number of permits currently available for the given
    /// class, if initialized.
    pub fn available(&self, class: &str) -> Option<usize> {
        let permits = self.permits.read().unwrap_or_else(PoisonError::into_inner);
        permits
            .get(class)
            .map(|permits| permits.semaphore.available_permits())
    }

    fn semaphore(&self, class: &str) -> Result<Arc<Semaphore>> {
        let permits = self.permits.read().unwrap_or_else(PoisonError::into_inner);
        permits
            .get(class)
            .map(|permits| permits.semaphore.clone())
            .ok_or_else(|| Error::PermitClassNotInitializedError(class.to_owned()))
    }
}

/// The instance-limited task.
///
/// An [`ExitNotifyTask`] that holds a permit of its class for as long
/// as it runs.
#[derive(Debug)]
pub struct InstanceLimitedTask {
    class: String,
    semaphore: Arc<Semaphore>,
    task: ExitNotifyTask,
}

impl InstanceLimitedTask {
    /// Create a task of the given class.
    ///
    /// Fails if permits of the class have not been initialized.
    pub fn new(
        registry: &PermitRegistry,
        class: impl ToString,
        name: impl ToString,
        monitor: Monitor,
    ) -> Result<Self> {
        let class = class.to_string();
        let semaphore = registry.semaphore(&class)?;

        Ok(Self {
            class,
            semaphore,
            task: ExitNotifyTask::new(name, monitor),
        })
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Subscribe to state changes of the task.
    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.task.subscribe()
    }

    /// Wait for a permit of the task class, then spawn the given
    /// future.
    ///
    /// The caller is suspended until a permit is available. The
    /// permit is released once the spawned task has been reported,
    /// whatever its outcome.
    pub async fn start<F>(self, task: F) -> Result<TaskHandle>
    where
        F: Future<Output = AnyResult<()>> + Send + 'static,
    {
        self.task.set_state(TaskState::AwaitingPermit);
        debug!("task {} awaiting permit of class {}", self.name(), self.class);

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::AcquirePermitError(self.class.clone()))?;

        Ok(self.task.spawn_with(task, permit))
    }
}
