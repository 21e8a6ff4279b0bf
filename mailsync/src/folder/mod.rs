//! # Folder module
//!
//! Module dedicated to folder (as known as mailbox) management.
//!
//! The [`MessageFolder`] trait is the capability every store exposes
//! for one of its folders. The [`mapped`] module wraps a local folder
//! so that it speaks remote identifiers, and the [`sync`] module
//! creates on each repository the folders only the other one knows
//! about.

mod error;
pub mod mapped;
pub mod sync;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

#[doc(inline)]
pub use self::error::{Error, Result};
use crate::{flag::Flags, id::Id, AnyResult};

/// The folder listing entry.
///
/// Every folder carries a flag telling whether it participates in
/// synchronization. The flag is honored in both directions.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FolderEntry {
    /// The folder name, using the separator of its repository.
    pub name: String,

    /// Whether the folder participates in synchronization.
    pub sync: bool,
}

impl FolderEntry {
    pub fn new(name: impl ToString, sync: bool) -> Self {
        Self {
            name: name.to_string(),
            sync,
        }
    }
}

/// Rewrite the given folder name from one path separator convention
/// to another.
pub fn translate_separator(folder: &str, from: char, to: char) -> String {
    if from == to {
        folder.to_owned()
    } else {
        folder.replace(from, &to.to_string())
    }
}

/// Return the name used on disk for the given folder.
pub fn basename(folder: &str) -> String {
    folder.replace('/', ".")
}

/// The folder capability.
///
/// Operations are expressed in the identifier space of the
/// implementor. [`MessageFolder::refresh_cache`] must complete before
/// any other operation is called from another thread.
#[async_trait]
pub trait MessageFolder: Send + Sync {
    /// Return the folder name.
    fn name(&self) -> &str;

    /// Repopulate the cached message list.
    async fn refresh_cache(&self) -> AnyResult<()>;

    /// List identifiers of the cached message list.
    async fn list_ids(&self) -> AnyResult<BTreeSet<Id>>;

    /// Return `true` if the given identifier exists.
    async fn exists(&self, id: Id) -> AnyResult<bool> {
        Ok(self.list_ids().await?.contains(&id))
    }

    /// Return the number of messages.
    async fn count(&self) -> AnyResult<usize> {
        Ok(self.list_ids().await?.len())
    }

    /// Return the raw content of the given message.
    async fn fetch_message(&self, id: Id) -> AnyResult<Vec<u8>>;

    /// Return the flags of the given message.
    async fn get_flags(&self, id: Id) -> AnyResult<Flags>;

    /// Return the internal date of the given message.
    async fn get_timestamp(&self, id: Id) -> AnyResult<DateTime<FixedOffset>>;

    /// Save a message.
    ///
    /// Passing [`crate::id::UNCONFIRMED`] asks the store for a new
    /// identifier. The identifier of the saved message is returned.
    async fn save_message(
        &self,
        id: Id,
        contents: &[u8],
        flags: &Flags,
        timestamp: DateTime<FixedOffset>,
    ) -> AnyResult<Id>;

    /// Replace the flags of the given message.
    async fn set_flags(&self, id: Id, flags: &Flags) -> AnyResult<()> {
        self.set_flags_many(&[id], flags).await
    }

    /// Add flags to the given message.
    async fn add_flags(&self, id: Id, flags: &Flags) -> AnyResult<()> {
        self.add_flags_many(&[id], flags).await
    }

    /// Remove flags from the given message.
    async fn remove_flags(&self, id: Id, flags: &Flags) -> AnyResult<()> {
        self.remove_flags_many(&[id], flags).await
    }

    async fn set_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()>;

    async fn add_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()>;

    async fn remove_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()>;

    /// Delete the given message.
    async fn delete_message(&self, id: Id) -> AnyResult<()> {
        self.delete_messages(&[id]).await
    }

    async fn delete_messages(&self, ids: &[Id]) -> AnyResult<()>;
}

#[cfg(test)]
mod tests {
    #[test]
    fn translate_separator() {
        assert_eq!(super::translate_separator("a/b/c", '/', '.'), "a.b.c");
        assert_eq!(super::translate_separator("a.b", '.', '.'), "a.b");
    }
}
