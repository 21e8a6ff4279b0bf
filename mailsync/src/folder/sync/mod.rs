//! # Folder synchronization
//!
//! This module contains everything needed to equalize the folder
//! listings of two repositories.
//!
//! Folder names are rewritten from one repository separator to the
//! other, nothing more. Both repositories should therefore not
//! rewrite names on their own: a folder created on one side could
//! show up as a brand new folder on the other side at the next run,
//! and so on, leading to endless folder creation cycles.

pub mod hunk;
pub mod patch;
pub mod report;

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use tracing::{debug, info, trace};

#[doc(inline)]
pub use self::{hunk::FolderSyncHunk, patch::Separators, report::FolderSyncReport};
use super::{translate_separator, Error, FolderEntry, Result};
use crate::{
    repository::{Repository, StatusRepository},
    sync::SyncDestination,
    task::{Monitor, MonitorEvent},
};

/// Create on each repository the synced folders only the other one
/// has, and mirror them on the status repository.
///
/// A creation failure is reported to the monitor then returned: it
/// aborts the synchronization of the whole run.
pub async fn sync(
    source: &dyn Repository,
    destination: &dyn Repository,
    status: &dyn StatusRepository,
    monitor: &Monitor,
    dry_run: bool,
) -> Result<FolderSyncReport> {
    let (source_folders, destination_folders) = tokio::try_join!(
        list_folders(source),
        list_folders(destination),
    )?;

    monitor.emit(MonitorEvent::ListedFolders(
        source.name().to_owned(),
        source_folders.len(),
    ));
    monitor.emit(MonitorEvent::ListedFolders(
        destination.name().to_owned(),
        destination_folders.len(),
    ));

    let seps = Separators {
        source: source.separator(),
        destination: destination.separator(),
        status: status.separator(),
    };

    let patch = patch::build(&source_folders, &destination_folders, seps);
    debug!("generated folder patch with {} hunks", patch.len());

    for hunk in &patch {
        if dry_run {
            info!("dry run: {hunk}");
            continue;
        }

        let folder = hunk.folder();
        let (repository, res) = match hunk.destination() {
            SyncDestination::Source => (source.name(), source.create_folder(folder).await),
            SyncDestination::Destination => {
                (destination.name(), destination.create_folder(folder).await)
            }
            SyncDestination::Status => (status.name(), status.create_folder(folder).await),
        };

        match res {
            Ok(()) => {
                info!("{hunk} on repository {repository}");
                monitor.emit(MonitorEvent::CreatedFolder(
                    folder.to_owned(),
                    repository.to_owned(),
                ));
            }
            Err(err) => {
                let err = Arc::new(err);
                debug!("cannot create folder {folder} on repository {repository}: {err}");
                trace!("{err:?}");
                monitor.error(
                    format!("Creating folder {folder} on repository {repository}"),
                    err.clone(),
                );
                return Err(Error::CreateFolderError(
                    err,
                    folder.to_owned(),
                    repository.to_owned(),
                ));
            }
        }
    }

    Ok(FolderSyncReport {
        folders: pair_folders(&source_folders, &destination_folders, seps),
        patch,
    })
}

async fn list_folders(repository: &dyn Repository) -> Result<Vec<FolderEntry>> {
    repository
        .list_folders()
        .await
        .map_err(|err| Error::ListFoldersError(err, repository.name().to_owned()))
}

/// Pair source and destination names of folders taking part in
/// synchronization.
///
/// A folder takes part in synchronization when it is flagged as such
/// on every side it exists.
fn pair_folders(
    source: &[FolderEntry],
    destination: &[FolderEntry],
    seps: Separators,
) -> BTreeMap<String, String> {
    let destination: BTreeMap<&str, bool> = destination
        .iter()
        .map(|folder| (folder.name.as_str(), folder.sync))
        .collect();

    let mut folders = BTreeMap::new();
    let mut paired = HashSet::new();

    for folder in source {
        let name = translate_separator(&folder.name, seps.source, seps.destination);
        let synced = destination.get(name.as_str()).copied().unwrap_or(true);

        if folder.sync && synced {
            folders.insert(folder.name.clone(), name.clone());
        }

        paired.insert(name);
    }

    for (name, sync) in destination {
        if sync && !paired.contains(name) {
            let source_name = translate_separator(name, seps.destination, seps.source);
            folders.insert(source_name, name.to_owned());
        }
    }

    folders
}

#[cfg(test)]
mod tests {
    use super::{pair_folders, Separators};
    use crate::folder::FolderEntry;

    #[test]
    fn pair_synced_folders() {
        let seps = Separators {
            source: '.',
            destination: '/',
            status: '/',
        };

        let source = [
            FolderEntry::new("INBOX", true),
            FolderEntry::new("a.b", true),
            FolderEntry::new("Spam", false),
            FolderEntry::new("Junk", true),
        ];
        let destination = [
            FolderEntry::new("INBOX", true),
            FolderEntry::new("Junk", false),
            FolderEntry::new("c/d", true),
            FolderEntry::new("Spam", true),
        ];

        let folders = pair_folders(&source, &destination, seps);

        assert_eq!(
            folders.into_iter().collect::<Vec<_>>(),
            vec![
                ("INBOX".to_owned(), "INBOX".to_owned()),
                ("a.b".to_owned(), "a/b".to_owned()),
                ("c.d".to_owned(), "c/d".to_owned()),
            ]
        );
    }
}
