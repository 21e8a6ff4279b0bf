//! Module dedicated to folder synchronization patch.
//!
//! The core function of the module is [`build`], which compares the
//! folder listings of both repositories and generates the hunks
//! needed to equalize them.

use std::collections::BTreeMap;

use super::FolderSyncHunk;
use crate::{
    folder::{translate_separator, FolderEntry},
    sync::SyncDestination,
};

/// The separators of the three repositories taking part in a folder
/// synchronization.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Separators {
    pub source: char,
    pub destination: char,
    pub status: char,
}

/// Build the folder synchronization patch.
///
/// Source names are indexed using the destination separator, so both
/// indexes can be compared directly. Every synced folder missing on
/// the other side generates a creation hunk for that side followed by
/// a creation hunk for the status repository. Folders are never
/// deleted.
pub fn build(
    source: &[FolderEntry],
    destination: &[FolderEntry],
    seps: Separators,
) -> Vec<FolderSyncHunk> {
    let source: BTreeMap<String, &FolderEntry> = source
        .iter()
        .map(|folder| {
            let name = translate_separator(&folder.name, seps.source, seps.destination);
            (name, folder)
        })
        .collect();

    let destination: BTreeMap<&str, &FolderEntry> = destination
        .iter()
        .map(|folder| (folder.name.as_str(), folder))
        .collect();

    let mut patch = Vec::new();

    for (name, folder) in &source {
        if folder.sync && !destination.contains_key(name.as_str()) {
            patch.push(FolderSyncHunk::Create(
                name.clone(),
                SyncDestination::Destination,
            ));
            patch.push(FolderSyncHunk::Create(
                translate_separator(name, seps.destination, seps.status),
                SyncDestination::Status,
            ));
        }
    }

    for (name, folder) in &destination {
        if folder.sync && !source.contains_key(*name) {
            patch.push(FolderSyncHunk::Create(
                translate_separator(name, seps.destination, seps.source),
                SyncDestination::Source,
            ));
            patch.push(FolderSyncHunk::Create(
                translate_separator(name, seps.destination, seps.status),
                SyncDestination::Status,
            ));
        }
    }

    patch
}
