//! # UID mapping
//!
//! Module dedicated to the durable mapping between remote and local
//! message identifiers of a folder.
//!
//! The [`UidMap`] maps every remote identifier (including
//! placeholders) to a local identifier. The [`UidMapStore`] persists
//! its confirmed entries into a plain text file, one `local:remote`
//! pair per line. The file is replaced atomically on every save, so a
//! crash never leaves it truncated.

mod error;

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    ffi::OsString,
    fmt, io,
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, trace, warn};

#[doc(inline)]
pub use self::error::{Error, Result};
use crate::{
    folder,
    id::{self, Id, Placeholders},
};

/// The remote to local identifier map of a folder.
///
/// Keys are remote identifiers, values are local identifiers. Only
/// entries with a confirmed (positive) remote identifier are ever
/// persisted: the [`fmt::Display`] implementation renders the exact
/// content of the durable file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UidMap(BTreeMap<Id, Id>);

impl UidMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over entries whose remote identifier is confirmed.
    pub fn confirmed(&self) -> impl Iterator<Item = (&Id, &Id)> {
        self.iter().filter(|(remote, _)| id::is_confirmed(**remote))
    }

    /// Iterate over entries whose remote identifier is a placeholder.
    pub fn placeholders(&self) -> impl Iterator<Item = (&Id, &Id)> {
        self.iter().filter(|(remote, _)| id::is_placeholder(**remote))
    }

    /// Reconcile the map against the freshly listed local
    /// identifiers.
    ///
    /// Every local identifier missing from the map values gets a new
    /// placeholder key, decreasing from `-1`. Every entry whose local
    /// identifier is not listed anymore is removed. A local
    /// identifier bound twice only keeps its lowest remote key.
    ///
    /// Returns the confirmed remote identifiers whose local copy
    /// vanished, which means it has been deleted locally.
    pub fn reconcile(&mut self, local_ids: &BTreeSet<Id>) -> BTreeSet<Id> {
        let mut bound = HashSet::with_capacity(self.len());
        let mut vanished = BTreeSet::new();

        self.retain(|remote, local| {
            if !local_ids.contains(local) {
                trace!("local UID {local} vanished, dropping remote UID {remote}");
                if id::is_confirmed(*remote) {
                    vanished.insert(*remote);
                }
                return false;
            }

            if !bound.insert(*local) {
                warn!("local UID {local} already mapped, dropping remote UID {remote}");
                return false;
            }

            true
        });

        let taken: HashSet<Id> = self.placeholders().map(|(remote, _)| *remote).collect();
        let mut placeholders = Placeholders::new().filter(move |remote| !taken.contains(remote));
        let missing: Vec<Id> = local_ids
            .iter()
            .filter(|id| !bound.contains(*id))
            .copied()
            .collect();

        for local in missing {
            if let Some(remote) = placeholders.next() {
                trace!("local UID {local} has no remote counterpart, using placeholder {remote}");
                self.insert(remote, local);
            }
        }

        vanished
    }
}

impl Deref for UidMap {
    type Target = BTreeMap<Id, Id>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for UidMap {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(Id, Id)> for UidMap {
    fn from_iter<T: IntoIterator<Item = (Id, Id)>>(iter: T) -> Self {
        Self(BTreeMap::from_iter(iter))
    }
}

impl fmt::Display for UidMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (remote, local) in self.confirmed() {
            writeln!(f, "{local}:{remote}")?;
        }
        Ok(())
    }
}

/// The durable store of a folder [`UidMap`].
///
/// The store owns the mutual-exclusion lock protecting the mapping
/// file: loads and saves of the same folder never overlap.
#[derive(Debug)]
pub struct UidMapStore {
    repository: String,
    folder: String,
    path: PathBuf,
    lock: Mutex<()>,
}

impl UidMapStore {
    /// Create a store for the given repository and folder, persisted
    /// at the given path.
    pub fn new(
        repository: impl ToString,
        folder: impl ToString,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository: repository.to_string(),
            folder: folder.to_string(),
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a store whose file lives in the given mapping
    /// directory, named after the folder basename.
    pub fn from_dir(repository: impl ToString, folder: &str, dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(folder::basename(folder));
        Self::new(repository, folder, path)
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut path = OsString::from(self.path.as_os_str());
        path.push(".tmp");
        PathBuf::from(path)
    }

    /// Create an empty mapping file if none exists yet.
    ///
    /// Returns `true` if the file has been created.
    pub async fn create(&self) -> Result<bool> {
        let _lock = self.lock.lock().await;

        let created = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;

        match created {
            Ok(_) => {
                debug!("created empty UID mapping file at {:?}", self.path);
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(Error::CreateMapFileError(err, self.path.clone())),
        }
    }

    /// Load the map from the durable file.
    ///
    /// Parsing stops at the first blank line.
    pub async fn load(&self) -> Result<UidMap> {
        let contents = {
            let _lock = self.lock.lock().await;
            match fs::read_to_string(&self.path).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(Error::MappingUnavailableError(
                        self.path.clone(),
                        self.folder.clone(),
                        self.repository.clone(),
                    ));
                }
                Err(err) => return Err(Error::ReadMapFileError(err, self.path.clone())),
            }
        };

        let map = self.parse(&contents)?;
        debug!("loaded {} UID mappings from {:?}", map.len(), self.path);

        Ok(map)
    }

    fn parse(&self, contents: &str) -> Result<UidMap> {
        let mut map = UidMap::new();

        for line in contents.lines().map(str::trim) {
            if line.is_empty() {
                break;
            }

            let corrupt = || {
                Error::MappingCorruptError(
                    line.to_owned(),
                    self.folder.clone(),
                    self.repository.clone(),
                )
            };

            let (local, remote) = line.split_once(':').ok_or_else(corrupt)?;
            let local: Id = local.trim().parse().map_err(|_| corrupt())?;
            let remote: Id = remote.trim().parse().map_err(|_| corrupt())?;

            map.insert(remote, local);
        }

        Ok(map)
    }

    /// Load the map then reconcile it against the given local
    /// identifiers.
    ///
    /// See [`UidMap::reconcile`], whose vanished identifiers are
    /// returned along with the map. The returned map must be fully
    /// built before any other thread reads it.
    pub async fn reconcile(&self, local_ids: &BTreeSet<Id>) -> Result<(UidMap, BTreeSet<Id>)> {
        let mut map = self.load().await?;
        let vanished = map.reconcile(local_ids);

        debug!(
            "reconciled UID map of folder {}: {} confirmed, {} placeholders",
            self.folder,
            map.confirmed().count(),
            map.placeholders().count(),
        );

        Ok((map, vanished))
    }

    /// Save the confirmed entries of the given map.
    ///
    /// Entries are written to a temporary file first, which then
    /// replaces the durable one.
    pub async fn save(&self, map: &UidMap) -> Result<()> {
        let _lock = self.lock.lock().await;

        let tmp_path = self.tmp_path();
        let contents = map.to_string();

        let mut file = fs::File::create(&tmp_path)
            .await
            .map_err(|err| Error::WriteMapFileError(err, tmp_path.clone()))?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|err| Error::WriteMapFileError(err, tmp_path.clone()))?;
        file.sync_all()
            .await
            .map_err(|err| Error::WriteMapFileError(err, tmp_path.clone()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| Error::ReplaceMapFileError(err, self.path.clone(), tmp_path))?;

        debug!("saved {} UID mappings to {:?}", map.confirmed().count(), self.path);

        Ok(())
    }

    /// Translate the given remote identifiers into local ones.
    ///
    /// Fails on the first unknown remote identifier, no partial
    /// result is returned.
    pub fn translate(&self, map: &UidMap, remote_ids: &[Id]) -> Result<Vec<Id>> {
        remote_ids
            .iter()
            .map(|remote| {
                map.get(remote).copied().ok_or_else(|| {
                    Error::UnknownRemoteIdError(
                        *remote,
                        self.folder.clone(),
                        self.repository.clone(),
                    )
                })
            })
            .collect()
    }
}
