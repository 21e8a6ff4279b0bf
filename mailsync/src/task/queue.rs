//! # Task queue
//!
//! Module dedicated to the collection of in-flight tasks.

use std::collections::VecDeque;

use tracing::debug;

use super::{TaskHandle, TaskReport};

/// The task-join queue.
///
/// Joining the queue drains it, waiting for each task in the order
/// it was pushed.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<TaskHandle>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: TaskHandle) {
        self.tasks.push_back(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for all queued tasks to terminate.
    pub async fn join(&mut self) -> Vec<TaskReport> {
        debug!("joining {} tasks", self.tasks.len());

        let mut reports = Vec::with_capacity(self.tasks.len());

        while let Some(task) = self.tasks.pop_front() {
            reports.push(task.join().await);
        }

        reports
    }
}
