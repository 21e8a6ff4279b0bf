//! # Repository
//!
//! Module dedicated to repository capabilities. A repository is a
//! named message store grouping folders, reached either through a
//! remote session or through the local file system. This library does
//! not implement any of them: it only relies on the operations
//! defined here.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    folder::{FolderEntry, MessageFolder},
    AnyResult,
};

/// The repository capability.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Return the repository name.
    fn name(&self) -> &str;

    /// Return the path separator used in folder names.
    fn separator(&self) -> char;

    /// List all the folders of the repository.
    async fn list_folders(&self) -> AnyResult<Vec<FolderEntry>>;

    /// Create the given folder.
    async fn create_folder(&self, folder: &str) -> AnyResult<()>;

    /// Open the given folder.
    async fn get_folder(&self, folder: &str) -> AnyResult<Arc<dyn MessageFolder>>;
}

/// The status repository capability.
///
/// The status repository keeps track of the folders known by a
/// synchronization. It mirrors folder existence only, never message
/// contents.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Return the repository name.
    fn name(&self) -> &str;

    /// Return the path separator used in folder names.
    fn separator(&self) -> char;

    /// Record the given folder.
    ///
    /// Recording a folder already known by the status repository is
    /// not an error: the folder may have been removed from one side
    /// only.
    async fn create_folder(&self, folder: &str) -> AnyResult<()>;
}
