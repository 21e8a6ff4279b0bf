//! # Sync report
//!
//! Module dedicated to the synchronization report.

use std::collections::BTreeMap;

use crate::{folder::sync::FolderSyncReport, message::MessageSyncReport, task::TaskReport};

/// The synchronization report.
///
/// A report gathers the folders synchronization report, the messages
/// synchronization report of every folder that succeeded, and the
/// report of every folder task.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// The report of folders synchronization.
    pub folder: FolderSyncReport,

    /// The reports of messages synchronization, by folder name.
    pub messages: BTreeMap<String, MessageSyncReport>,

    /// The reports of folder tasks, in the order they were started.
    pub tasks: Vec<TaskReport>,
}

impl SyncReport {
    /// Iterate over the reports of tasks that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|task| !task.outcome.is_success())
    }

    /// Return `true` if every folder task succeeded.
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}
