//! # Message synchronization
//!
//! Module dedicated to the synchronization of the messages of a
//! folder pair. The remote folder speaks remote identifiers, and the
//! local folder is wrapped into a [`MappedFolder`] so that it speaks
//! remote identifiers as well.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::{
    folder::{mapped::MappedFolder, Error, MessageFolder},
    id::{self, Id},
    AnyResult,
};

/// The message synchronization report.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MessageSyncReport {
    /// The name of the synchronized folder.
    pub folder: String,

    /// Number of remote messages copied to the local folder.
    pub copied: usize,

    /// Number of local messages uploaded to the remote folder.
    pub uploaded: usize,

    /// Number of local messages deleted because they vanished from
    /// the remote folder.
    pub deleted: usize,

    /// Number of remote messages deleted because their local copy
    /// was deleted.
    pub removed: usize,

    /// Number of local messages whose flags were replaced by the
    /// remote ones.
    pub flagged: usize,
}

/// Synchronize the messages of the given folder pair.
///
/// Both caches are refreshed first. Remote messages whose local copy
/// was deleted since the last run are deleted remotely and forgotten
/// by the mapping. Then remote-only messages are copied to the local
/// folder, local-only messages are uploaded to
/// the remote folder and their placeholder confirmed, local messages
/// that vanished remotely are deleted, and remote flags are applied
/// to local copies.
///
/// In dry run mode, nothing is mutated but the report is computed as
/// if it was.
pub async fn sync(
    repository: &str,
    remote: &dyn MessageFolder,
    local: &MappedFolder,
    dry_run: bool,
) -> AnyResult<MessageSyncReport> {
    let folder = remote.name().to_owned();

    remote.refresh_cache().await?;
    local.refresh_cache().await?;

    let remote_ids = remote.list_ids().await?;
    let map = local.map().await;

    let mut report = MessageSyncReport {
        folder: folder.clone(),
        ..Default::default()
    };

    let confirmed: BTreeSet<Id> = map.confirmed().map(|(remote, _)| *remote).collect();
    let placeholders: Vec<Id> = map.placeholders().map(|(remote, _)| *remote).collect();
    let dropped = local.vanished().await;

    if !dropped.is_empty() {
        let removed: Vec<Id> = dropped.intersection(&remote_ids).copied().collect();

        if !dry_run {
            if !removed.is_empty() {
                remote.delete_messages(&removed).await?;
            }
            local.forget_vanished().await?;
        }

        debug!(
            "deleted {} locally deleted messages from remote folder {folder}",
            removed.len(),
        );
        report.removed = removed.len();
    }

    let to_copy = remote_ids
        .difference(&confirmed)
        .filter(|id| !dropped.contains(id));

    for id in to_copy {
        if !dry_run {
            let contents = remote.fetch_message(*id).await?;
            let flags = remote.get_flags(*id).await?;
            let timestamp = remote.get_timestamp(*id).await?;
            local.save_message(*id, &contents, &flags, timestamp).await?;
        }

        debug!("copied remote message {id} to local folder {folder}");
        report.copied += 1;
    }

    for placeholder in placeholders {
        if !dry_run {
            let contents = local.fetch_message(placeholder).await?;
            let flags = local.get_flags(placeholder).await?;
            let timestamp = local.get_timestamp(placeholder).await?;

            let id = remote
                .save_message(id::UNCONFIRMED, &contents, &flags, timestamp)
                .await?;

            if !id::is_confirmed(id) {
                let err = Error::BackendAssignmentError(
                    placeholder,
                    id,
                    folder.clone(),
                    repository.to_owned(),
                );
                return Err(err.into());
            }

            local.confirm(placeholder, id).await?;
        }

        debug!("uploaded local message {placeholder} to remote folder {folder}");
        report.uploaded += 1;
    }

    let vanished: Vec<Id> = confirmed.difference(&remote_ids).copied().collect();

    if !vanished.is_empty() {
        if !dry_run {
            local.delete_messages(&vanished).await?;
        }

        debug!("deleted {} vanished messages from local folder {folder}", vanished.len());
        report.deleted = vanished.len();
    }

    for id in confirmed.intersection(&remote_ids) {
        let flags = remote.get_flags(*id).await?;

        if local.get_flags(*id).await? == flags {
            continue;
        }

        if !dry_run {
            local.set_flags(*id, &flags).await?;
        }

        debug!("updated flags of local message {id} to {flags}");
        report.flagged += 1;
    }

    info!(
        "synchronized folder {folder}: {} copied, {} uploaded, {} deleted, {} removed, {} flagged",
        report.copied, report.uploaded, report.deleted, report.removed, report.flagged,
    );

    Ok(report)
}
