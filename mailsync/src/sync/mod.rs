//! # Synchronization
//!
//! Module dedicated to the synchronization of a remote repository
//! with a local one. The main structure of this module is
//! [`SyncBuilder`].
//!
//! A synchronization run first equalizes the folder listings of both
//! repositories, then synchronizes the messages of every folder pair
//! in its own [`InstanceLimitedTask`], so that no more than the
//! configured number of sessions are opened on the remote repository
//! at the same time.

mod error;
pub mod report;

use std::{collections::BTreeMap, fmt, fs::OpenOptions, path::PathBuf, sync::Arc};

use advisory_lock::{AdvisoryFileLock, FileLockMode};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[doc(inline)]
pub use self::{
    error::{Error, Result},
    report::SyncReport,
};
use crate::{
    config::SyncConfig,
    folder::{self, mapped::MappedFolder, sync::FolderSyncHunk},
    message::{self, MessageSyncReport},
    repository::{Repository, StatusRepository},
    task::{InstanceLimitedTask, Monitor, PermitRegistry, TaskQueue},
    uid_map::UidMapStore,
    AnyResult,
};

/// The synchronization destination.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum SyncDestination {
    Source,
    Destination,
    Status,
}

impl fmt::Display for SyncDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
            Self::Status => write!(f, "status"),
        }
    }
}

/// The synchronization builder.
///
/// The remote repository is the source of the synchronization, the
/// local repository is the destination. Local folders are accessed
/// through a [`MappedFolder`].
#[derive(Clone)]
pub struct SyncBuilder {
    account: String,
    config: SyncConfig,
    remote: Arc<dyn Repository>,
    local: Arc<dyn Repository>,
    status: Arc<dyn StatusRepository>,
    registry: Option<Arc<PermitRegistry>>,
    monitor: Option<Monitor>,
    dry_run: Option<bool>,
}

impl SyncBuilder {
    /// Create a new synchronization builder for the given account.
    pub fn new(
        account: impl ToString,
        config: SyncConfig,
        remote: Arc<dyn Repository>,
        local: Arc<dyn Repository>,
        status: Arc<dyn StatusRepository>,
    ) -> Self {
        Self {
            account: account.to_string(),
            config,
            remote,
            local,
            status,
            registry: None,
            monitor: None,
            dry_run: None,
        }
    }

    pub fn set_some_registry(&mut self, registry: Option<Arc<PermitRegistry>>) {
        self.registry = registry;
    }

    pub fn set_registry(&mut self, registry: Arc<PermitRegistry>) {
        self.set_some_registry(Some(registry));
    }

    pub fn with_some_registry(mut self, registry: Option<Arc<PermitRegistry>>) -> Self {
        self.set_some_registry(registry);
        self
    }

    pub fn with_registry(mut self, registry: Arc<PermitRegistry>) -> Self {
        self.set_registry(registry);
        self
    }

    pub fn get_registry(&self) -> Arc<PermitRegistry> {
        self.registry.clone().unwrap_or_default()
    }

    pub fn set_some_monitor(&mut self, monitor: Option<Monitor>) {
        self.monitor = monitor;
    }

    pub fn set_monitor(&mut self, monitor: Monitor) {
        self.set_some_monitor(Some(monitor));
    }

    pub fn with_some_monitor(mut self, monitor: Option<Monitor>) -> Self {
        self.set_some_monitor(monitor);
        self
    }

    pub fn with_monitor(mut self, monitor: Monitor) -> Self {
        self.set_monitor(monitor);
        self
    }

    pub fn get_monitor(&self) -> Monitor {
        self.monitor.clone().unwrap_or_default()
    }

    pub fn set_some_dry_run(&mut self, dry_run: Option<bool>) {
        self.dry_run = dry_run;
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.set_some_dry_run(Some(dry_run));
    }

    pub fn with_some_dry_run(mut self, dry_run: Option<bool>) -> Self {
        self.set_some_dry_run(dry_run);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.set_dry_run(dry_run);
        self
    }

    pub fn get_dry_run(&self) -> bool {
        self.dry_run.unwrap_or_default()
    }

    pub async fn sync(self) -> Result<SyncReport> {
        let dry_run = self.get_dry_run();
        let monitor = self.get_monitor();
        let registry = self.get_registry();

        let metadata_dir = self
            .config
            .get_metadata_dir()
            .map_err(Error::GetMetadataDirError)?;
        let mapping_dir = self
            .config
            .uid_mapping_dir(self.local.name())
            .map_err(Error::GetMetadataDirError)?;

        let lock_file_path = metadata_dir.join(format!("{}.lock", self.account));

        debug!("locking sync file {lock_file_path:?}");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_file_path)
            .map_err(|err| Error::OpenLockFileError(err, lock_file_path.clone()))?;
        // fully qualified: std `File` has inherent lock methods
        AdvisoryFileLock::try_lock(&lock_file, FileLockMode::Exclusive)
            .map_err(|err| Error::LockFileError(err, lock_file_path.clone()))?;

        let class = self.remote.name().to_owned();
        self.config
            .init_permits(&registry, &class)
            .map_err(|err| Error::InitPermitsError(err, class.clone()))?;

        info!("synchronizing account {}", self.account);

        let mut report = SyncReport::default();

        report.folder = folder::sync::sync(
            self.remote.as_ref(),
            self.local.as_ref(),
            self.status.as_ref(),
            &monitor,
            dry_run,
        )
        .await
        .map_err(Error::SyncFoldersError)?;

        let messages = Arc::new(Mutex::new(BTreeMap::new()));
        let mut queue = TaskQueue::new();

        for (remote_name, local_name) in report.folder.folders.clone() {
            if dry_run && is_created(&report.folder.patch, &remote_name, &local_name) {
                debug!("dry run: skipping sync of missing folder {remote_name}");
                continue;
            }

            let task = InstanceLimitedTask::new(
                &registry,
                &class,
                format!("Synchronizing folder {remote_name}"),
                monitor.clone(),
            )
            .map_err(|err| Error::StartFolderTaskError(err, remote_name.clone()))?;

            let handle = task
                .start(sync_folder(
                    self.remote.clone(),
                    self.local.clone(),
                    remote_name.clone(),
                    local_name,
                    mapping_dir.clone(),
                    messages.clone(),
                    dry_run,
                ))
                .await
                .map_err(|err| Error::StartFolderTaskError(err, remote_name))?;

            queue.push(handle);
        }

        report.tasks = queue.join().await;
        report.messages = std::mem::take(&mut *messages.lock().await);

        info!(
            "synchronized account {}: {} folders, {} failures",
            self.account,
            report.tasks.len(),
            report.failures().count(),
        );

        debug!("unlocking sync file");
        AdvisoryFileLock::unlock(&lock_file)
            .map_err(|err| Error::UnlockFileError(err, lock_file_path))?;

        Ok(report)
    }
}

/// Synchronize the messages of the given folder pair, and store the
/// report in the given map.
async fn sync_folder(
    remote: Arc<dyn Repository>,
    local: Arc<dyn Repository>,
    remote_name: String,
    local_name: String,
    mapping_dir: PathBuf,
    reports: Arc<Mutex<BTreeMap<String, MessageSyncReport>>>,
    dry_run: bool,
) -> AnyResult<()> {
    let remote_folder = remote.get_folder(&remote_name).await?;
    let local_folder = local.get_folder(&local_name).await?;

    let store = UidMapStore::from_dir(local.name(), &local_name, &mapping_dir);
    store.create().await?;

    let local_folder = MappedFolder::new(local_folder, store);
    let report = message::sync::sync(
        remote.name(),
        remote_folder.as_ref(),
        &local_folder,
        dry_run,
    )
    .await?;

    reports.lock().await.insert(remote_name, report);

    Ok(())
}

/// Return `true` if the folder pair needs a creation that a dry run
/// skipped.
fn is_created(patch: &[FolderSyncHunk], remote_name: &str, local_name: &str) -> bool {
    patch.iter().any(|hunk| match hunk.destination() {
        SyncDestination::Source => hunk.folder() == remote_name,
        SyncDestination::Destination => hunk.folder() == local_name,
        SyncDestination::Status => false,
    })
}
