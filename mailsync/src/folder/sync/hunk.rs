//! Module dedicated to folder synchronization hunk.
//!
//! The core structure of the module is the [`FolderSyncHunk`], which
//! represents a change in a patch.

use std::fmt;

use crate::sync::SyncDestination;

/// Alias for the folder name.
pub type FolderName = String;

/// The folder synchronization hunk.
///
/// Folder names are already rewritten with the separator of the
/// destination repository.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum FolderSyncHunk {
    /// The given folder needs to be created on the given
    /// destination.
    Create(FolderName, SyncDestination),
}

impl FolderSyncHunk {
    pub fn folder(&self) -> &str {
        match self {
            Self::Create(folder, _) => folder.as_str(),
        }
    }

    pub fn destination(&self) -> &SyncDestination {
        match self {
            Self::Create(_, destination) => destination,
        }
    }
}

impl fmt::Display for FolderSyncHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(folder, destination) => {
                write!(f, "Creating {destination} folder {folder}")
            }
        }
    }
}
