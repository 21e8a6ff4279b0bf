//! Module dedicated to folder synchronization reporting.
//!
//! The core structure of this module is the [`FolderSyncReport`].

use std::collections::BTreeMap;

use super::FolderSyncHunk;

/// The folder synchronization report.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FolderSyncReport {
    /// The folders taking part in synchronization, indexed by their
    /// source name. Values are the matching destination names.
    pub folders: BTreeMap<String, String>,

    /// The list of hunks applied during the synchronization, in
    /// order.
    pub patch: Vec<FolderSyncHunk>,
}
