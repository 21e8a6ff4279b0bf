//! # Mapped folder
//!
//! Module dedicated to the folder facade translating remote
//! identifiers into local ones.
//!
//! A [`MappedFolder`] is used on the local side of a synchronization
//! when both sides assign their own identifiers. Every operation takes
//! and returns remote identifiers, while the wrapped local folder only
//! ever sees local identifiers.

use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Error, MessageFolder};
use crate::{
    flag::Flags,
    id::{self, Id},
    uid_map::{self, UidMap, UidMapStore},
    AnyResult,
};

/// The mapped folder.
///
/// Holds the wrapped local folder, the durable [`UidMapStore`] and
/// the in-memory [`UidMap`]. The map is only stable once
/// [`MessageFolder::refresh_cache`] completed.
pub struct MappedFolder {
    folder: Arc<dyn MessageFolder>,
    store: UidMapStore,
    map: Mutex<UidMap>,
    vanished: Mutex<BTreeSet<Id>>,
}

impl MappedFolder {
    pub fn new(folder: Arc<dyn MessageFolder>, store: UidMapStore) -> Self {
        Self {
            folder,
            store,
            map: Mutex::new(UidMap::new()),
            vanished: Mutex::new(BTreeSet::new()),
        }
    }

    /// Return the durable store of the mapping.
    pub fn store(&self) -> &UidMapStore {
        &self.store
    }

    /// Return a snapshot of the current mapping.
    pub async fn map(&self) -> UidMap {
        self.map.lock().await.clone()
    }

    /// Return the confirmed remote identifiers whose local copy has
    /// been deleted since the last save of the mapping.
    ///
    /// The set is filled by [`MessageFolder::refresh_cache`].
    pub async fn vanished(&self) -> BTreeSet<Id> {
        self.vanished.lock().await.clone()
    }

    /// Persist the current mapping, so that vanished entries are
    /// forgotten for good.
    pub async fn forget_vanished(&self) -> uid_map::Result<()> {
        let map = self.map.lock().await;
        let mut vanished = self.vanished.lock().await;

        self.store.save(&map).await?;
        debug!("forgot {} vanished remote UIDs", vanished.len());
        vanished.clear();

        Ok(())
    }

    /// Translate the given remote identifiers into local ones.
    pub async fn translate(&self, ids: &[Id]) -> uid_map::Result<Vec<Id>> {
        let map = self.map.lock().await;
        self.store.translate(&map, ids)
    }

    async fn translate_one(&self, id: Id) -> uid_map::Result<Id> {
        let map = self.map.lock().await;
        let ids = self.store.translate(&map, &[id])?;
        Ok(ids[0])
    }

    /// Bind a placeholder to the confirmed remote identifier its
    /// message received once uploaded, then persist the mapping.
    pub async fn confirm(&self, placeholder: Id, remote_id: Id) -> AnyResult<()> {
        let folder = self.store.folder();

        if !id::is_confirmed(remote_id) {
            let err = Error::ConfirmUnconfirmedIdError(placeholder, remote_id, folder.to_owned());
            return Err(err.into());
        }

        let mut map = self.map.lock().await;

        if map.contains_key(&remote_id) {
            let err = Error::ConfirmMappedIdError(placeholder, remote_id, folder.to_owned());
            return Err(err.into());
        }

        let local_id = self.store.translate(&map, &[placeholder])?[0];
        map.remove(&placeholder);
        map.insert(remote_id, local_id);
        self.store.save(&map).await?;

        debug!("confirmed placeholder {placeholder} of folder {folder} as remote UID {remote_id}");

        Ok(())
    }

    /// Drop mappings of deleted messages, and persist the map if a
    /// confirmed entry has been dropped.
    async fn drop_mappings(&self, map: &mut UidMap, ids: &[Id]) -> uid_map::Result<()> {
        let mut needs_save = false;

        for id in ids {
            if map.remove(id).is_some() && id::is_confirmed(*id) {
                needs_save = true;
            }
        }

        if needs_save {
            self.store.save(map).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl MessageFolder for MappedFolder {
    fn name(&self) -> &str {
        self.folder.name()
    }

    async fn refresh_cache(&self) -> AnyResult<()> {
        // the lock is held during the whole pass so that nobody reads
        // a half reconciled map
        let mut map = self.map.lock().await;

        self.folder.refresh_cache().await?;
        let local_ids = self.folder.list_ids().await?;
        let (reconciled, vanished) = self.store.reconcile(&local_ids).await?;
        *map = reconciled;
        *self.vanished.lock().await = vanished;

        info!(
            "folder {} (repository {}) mapped {} messages",
            self.store.folder(),
            self.store.repository(),
            map.len(),
        );

        Ok(())
    }

    async fn list_ids(&self) -> AnyResult<BTreeSet<Id>> {
        Ok(self.map.lock().await.keys().copied().collect())
    }

    async fn exists(&self, id: Id) -> AnyResult<bool> {
        Ok(self.map.lock().await.contains_key(&id))
    }

    async fn count(&self) -> AnyResult<usize> {
        Ok(self.map.lock().await.len())
    }

    async fn fetch_message(&self, id: Id) -> AnyResult<Vec<u8>> {
        let id = self.translate_one(id).await?;
        self.folder.fetch_message(id).await
    }

    async fn get_flags(&self, id: Id) -> AnyResult<Flags> {
        let id = self.translate_one(id).await?;
        self.folder.get_flags(id).await
    }

    async fn get_timestamp(&self, id: Id) -> AnyResult<DateTime<FixedOffset>> {
        let id = self.translate_one(id).await?;
        self.folder.get_timestamp(id).await
    }

    /// Save a message under the given remote identifier.
    ///
    /// The remote identifier must already be confirmed: passing a
    /// placeholder does nothing and returns it unchanged. Saving an
    /// already mapped message only updates its flags. Otherwise the
    /// message is saved to the local folder and the new mapping is
    /// persisted before returning.
    async fn save_message(
        &self,
        id: Id,
        contents: &[u8],
        flags: &Flags,
        timestamp: DateTime<FixedOffset>,
    ) -> AnyResult<Id> {
        if !id::is_confirmed(id) {
            debug!("skipping save of unconfirmed message {id}");
            return Ok(id);
        }

        let mut map = self.map.lock().await;

        if let Some(local_id) = map.get(&id).copied() {
            debug!("message {id} already mapped to local UID {local_id}, updating flags");
            self.folder.set_flags(local_id, flags).await?;
            return Ok(id);
        }

        let local_id = self
            .folder
            .save_message(id::UNCONFIRMED, contents, flags, timestamp)
            .await?;

        if !id::is_confirmed(local_id) {
            let err = Error::BackendAssignmentError(
                id,
                local_id,
                self.store.folder().to_owned(),
                self.store.repository().to_owned(),
            );
            return Err(err.into());
        }

        map.insert(id, local_id);
        self.store.save(&map).await?;

        debug!("saved message {id} as local UID {local_id}");

        Ok(id)
    }

    async fn set_flags(&self, id: Id, flags: &Flags) -> AnyResult<()> {
        let id = self.translate_one(id).await?;
        self.folder.set_flags(id, flags).await
    }

    async fn add_flags(&self, id: Id, flags: &Flags) -> AnyResult<()> {
        let id = self.translate_one(id).await?;
        self.folder.add_flags(id, flags).await
    }

    async fn remove_flags(&self, id: Id, flags: &Flags) -> AnyResult<()> {
        let id = self.translate_one(id).await?;
        self.folder.remove_flags(id, flags).await
    }

    async fn set_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()> {
        let ids = self.translate(ids).await?;
        self.folder.set_flags_many(&ids, flags).await
    }

    async fn add_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()> {
        let ids = self.translate(ids).await?;
        self.folder.add_flags_many(&ids, flags).await
    }

    async fn remove_flags_many(&self, ids: &[Id], flags: &Flags) -> AnyResult<()> {
        let ids = self.translate(ids).await?;
        self.folder.remove_flags_many(&ids, flags).await
    }

    async fn delete_message(&self, id: Id) -> AnyResult<()> {
        let mut map = self.map.lock().await;
        let local_id = self.store.translate(&map, &[id])?[0];

        self.folder.delete_message(local_id).await?;
        self.drop_mappings(&mut map, &[id]).await?;

        Ok(())
    }

    async fn delete_messages(&self, ids: &[Id]) -> AnyResult<()> {
        let mut map = self.map.lock().await;
        let local_ids = self.store.translate(&map, ids)?;

        self.folder.delete_messages(&local_ids).await?;
        self.drop_mappings(&mut map, ids).await?;

        Ok(())
    }
}
