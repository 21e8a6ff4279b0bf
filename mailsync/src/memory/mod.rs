//! # Memory repository
//!
//! Module dedicated to the in-memory repository. It implements every
//! capability this library relies on, without any persistence. It is
//! mostly useful for testing and for dry runs against a real store.

mod error;

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::Mutex;
use tracing::{debug, trace};

#[doc(inline)]
pub use self::error::{Error, Result};
use crate::{
    flag::Flags,
    folder::{FolderEntry, MessageFolder},
    id::{self, Id},
    repository::{Repository, StatusRepository},
    AnyResult,
};

/// The in-memory message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryMessage {
    pub contents: Vec<u8>,
    pub flags: Flags,
    pub timestamp: DateTime<FixedOffset>,
}

#[derive(Debug, Default)]
struct MemoryFolderState {
    messages: BTreeMap<Id, MemoryMessage>,
    next_id: Id,
}

impl MemoryFolderState {
    /// Use the given identifier if confirmed and free, otherwise
    /// allocate the next one.
    fn allocate(&mut self, id: Id) -> Id {
        let id = if id::is_confirmed(id) && !self.messages.contains_key(&id) {
            id
        } else {
            self.next_id.max(1)
        };

        self.next_id = self.next_id.max(id + 1);
        id
    }

    fn check(&self, ids: &[Id], folder: &str) -> Result<()> {
        match ids.iter().find(|id| !self.messages.contains_key(id)) {
            Some(id) => Err(Error::MessageNotFoundError(*id, folder.to_owned())),
            None => Ok(()),
        }
    }

    fn message(&self, id: Id, folder: &str) -> Result<&MemoryMessage> {
        self.messages
            .get(&id)
            .ok_or_else(|| Error::MessageNotFoundError(id, folder.to_owned()))
    }

    fn update_flags(&mut self, ids: &[Id], folder: &str, f: impl Fn(&mut Flags)) -> Result<()> {
        self.check(ids, folder)?;

        for id in ids {
            if let Some(message) = self.messages.get_mut(id) {
                f(&mut message.flags);
            }
        }

        Ok(())
    }
}

/// The in-memory folder.
#[derive(Debug)]
pub struct MemoryFolder {
    name: String,
    state: Mutex<MemoryFolderState>,
}

impl MemoryFolder {
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(MemoryFolderState::default()),
        }
    }

    /// Add a message stamped with the current time, and return its
    /// identifier.
    pub async fn add_message(&self, contents: impl Into<Vec<u8>>, flags: impl Into<Flags>) -> Id {
        let mut state = self.state.lock().await;
        let id = state.allocate(id::UNCONFIRMED);

        state.messages.insert(
            id,
            MemoryMessage {
                contents: contents.into(),
                flags: flags.into(),
                timestamp: Utc::now().into(),
            },
        );

        id
    }

    /// Return a copy of the given message, if any.
    pub async fn message(&self, id: Id) -> Option<MemoryMessage> {
        self.state.lock().await.messages.get(&id).cloned()
    }
}

#[async_trait]
impl MessageFolder for MemoryFolder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refresh_cache(&self) -> AnyResult<()> {
        trace!("nothing to refresh for in-memory folder {}", self.name);
        Ok(())
    }

    async fn list_ids(&self) -> AnyResult<BTreeSet<Id>> {
        Ok(self.state.lock().await.messages.keys().copied().collect())
    }

    async fn fetch_message(&self, id: Id) -> AnyResult<Vec<u8>> {
        let state = self.state.lock().await;
        Ok(state.message(id, &self.name)?.contents.clone())
    }

    async fn get_flags(&self, id: Id) -> AnyResult<Flags> {
        let state = self.state.lock().await;
        Ok(state.message(id, &self.name)?.flags.clone())
    }

    async fn get_timestamp(&self, id: Id) -> AnyResult<DateTime<FixedOffset>> {
        let state = self.state.lock().await;
        Ok(state.message(id, &self.name)?.timestamp)
    }

    async fn save_message(
        &self,
        id: Id,
        contents: &[u8],
        flags: &Flags,
        timestamp: DateTime<FixedOffset>,
    ) -> AnyResult<Id> {
        let mut state = self.state.lock().await;
        let id = state.allocate(id);

        state.messages.insert(
            id,
            MemoryMessage {
                contents: contents.to_vec(),
                flags: flags.clone(),
                timestamp,
            },
        );

        debug!("saved message {id} to in-memory folder {}", self.name);

        Ok(id)
    }

    async fn set_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()> {
        let mut state = self.state.lock().await;
        state.update_flags(ids, &self.name, |f| *f = flags.clone())?;
        Ok(())
    }

    async fn add_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()> {
        let mut state = self.state.lock().await;
        state.update_flags(ids, &self.name, |f| f.extend(flags.iter().cloned()))?;
        Ok(())
    }

    async fn remove_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()> {
        let mut state = self.state.lock().await;
        state.update_flags(ids, &self.name, |f| f.retain(|flag| !flags.contains(flag)))?;
        Ok(())
    }

    async fn delete_messages(&self, ids: &[Id]) -> AnyResult<()> {
        let mut state = self.state.lock().await;
        state.check(ids, &self.name)?;

        for id in ids {
            state.messages.remove(id);
        }

        debug!("deleted {} messages from in-memory folder {}", ids.len(), self.name);

        Ok(())
    }
}

#[derive(Debug)]
struct MemoryFolderEntry {
    sync: bool,
    folder: Arc<MemoryFolder>,
}

/// The in-memory repository.
///
/// Can be used as a source, destination or status repository.
#[derive(Debug)]
pub struct MemoryRepository {
    name: String,
    separator: char,
    folders: Mutex<BTreeMap<String, MemoryFolderEntry>>,
}

impl MemoryRepository {
    pub fn new(name: impl ToString, separator: char) -> Self {
        Self {
            name: name.to_string(),
            separator,
            folders: Mutex::new(BTreeMap::new()),
        }
    }

    fn insert_folder(&mut self, folder: impl ToString, sync: bool) {
        let folder = folder.to_string();
        let entry = MemoryFolderEntry {
            sync,
            folder: Arc::new(MemoryFolder::new(&folder)),
        };
        self.folders.get_mut().insert(folder, entry);
    }

    /// Add a folder taking part in synchronization.
    pub fn with_folder(mut self, folder: impl ToString) -> Self {
        self.insert_folder(folder, true);
        self
    }

    /// Add a folder excluded from synchronization.
    pub fn with_unsynced_folder(mut self, folder: impl ToString) -> Self {
        self.insert_folder(folder, false);
        self
    }

    /// Return the given folder, if any.
    pub async fn folder(&self, folder: &str) -> Option<Arc<MemoryFolder>> {
        let folders = self.folders.lock().await;
        folders.get(folder).map(|entry| entry.folder.clone())
    }

    /// Return the names of all folders.
    pub async fn folder_names(&self) -> Vec<String> {
        self.folders.lock().await.keys().cloned().collect()
    }

    async fn add_folder(&self, folder: &str, exist_ok: bool) -> Result<()> {
        let mut folders = self.folders.lock().await;

        if folders.contains_key(folder) {
            if exist_ok {
                debug!("folder {folder} already recorded on repository {}", self.name);
                return Ok(());
            }

            let err = Error::FolderAlreadyExistsError(folder.to_owned(), self.name.clone());
            return Err(err);
        }

        let entry = MemoryFolderEntry {
            sync: true,
            folder: Arc::new(MemoryFolder::new(folder)),
        };
        folders.insert(folder.to_owned(), entry);

        debug!("created in-memory folder {folder} on repository {}", self.name);

        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn separator(&self) -> char {
        self.separator
    }

    async fn list_folders(&self) -> AnyResult<Vec<FolderEntry>> {
        let folders = self.folders.lock().await;
        let folders = folders
            .iter()
            .map(|(name, entry)| FolderEntry::new(name, entry.sync))
            .collect();
        Ok(folders)
    }

    async fn create_folder(&self, folder: &str) -> AnyResult<()> {
        Ok(self.add_folder(folder, false).await?)
    }

    async fn get_folder(&self, folder: &str) -> AnyResult<Arc<dyn MessageFolder>> {
        match self.folder(folder).await {
            Some(folder) => Ok(folder),
            None => Err(Error::FolderNotFoundError(folder.to_owned(), self.name.clone()).into()),
        }
    }
}

#[async_trait]
impl StatusRepository for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn separator(&self) -> char {
        self.separator
    }

    async fn create_folder(&self, folder: &str) -> AnyResult<()> {
        Ok(self.add_folder(folder, true).await?)
    }
}
