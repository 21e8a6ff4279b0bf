use std::sync::Arc;

use async_trait::async_trait;
use mailsync::{
    folder::{
        self,
        sync::{FolderSyncHunk, FolderSyncReport},
        FolderEntry, MessageFolder,
    },
    memory::{self, MemoryRepository},
    repository::{Repository, StatusRepository},
    sync::SyncDestination,
    task::{Monitor, MonitorEvent},
    AnyResult,
};

#[test_log::test(tokio::test)]
async fn test_create_missing_folders() {
    let source = MemoryRepository::new("remote", '/')
        .with_folder("A")
        .with_unsynced_folder("B");
    let destination = MemoryRepository::new("local", '/');
    let status = MemoryRepository::new("status", '/');
    let (monitor, mut events) = Monitor::new();

    let report = folder::sync::sync(&source, &destination, &status, &monitor, false)
        .await
        .unwrap();

    assert_eq!(destination.folder_names().await, vec!["A"]);
    assert_eq!(status.folder_names().await, vec!["A"]);
    assert_eq!(
        report,
        FolderSyncReport {
            folders: [("A".to_owned(), "A".to_owned())].into_iter().collect(),
            patch: vec![
                FolderSyncHunk::Create("A".into(), SyncDestination::Destination),
                FolderSyncHunk::Create("A".into(), SyncDestination::Status),
            ],
        }
    );

    drop(monitor);

    let mut created = Vec::new();
    while let Some(event) = events.recv().await {
        if let MonitorEvent::CreatedFolder(folder, repository) = event {
            created.push((folder, repository));
        }
    }

    assert_eq!(
        created,
        vec![
            ("A".to_owned(), "local".to_owned()),
            ("A".to_owned(), "status".to_owned()),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_translate_separators() {
    let source = MemoryRepository::new("remote", '.').with_folder("a.b");
    let destination = MemoryRepository::new("local", '/').with_folder("c/d");
    let status = MemoryRepository::new("status", '/');

    let report = folder::sync::sync(&source, &destination, &status, &Monitor::default(), false)
        .await
        .unwrap();

    assert_eq!(source.folder_names().await, vec!["a.b", "c.d"]);
    assert_eq!(destination.folder_names().await, vec!["a/b", "c/d"]);
    assert_eq!(status.folder_names().await, vec!["a/b", "c/d"]);
    assert_eq!(
        report.folders.into_iter().collect::<Vec<_>>(),
        vec![
            ("a.b".to_owned(), "a/b".to_owned()),
            ("c.d".to_owned(), "c/d".to_owned()),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_recreate_folder_already_recorded() {
    let source = MemoryRepository::new("remote", '/').with_folder("A");
    let destination = MemoryRepository::new("local", '/');
    let status = MemoryRepository::new("status", '/').with_folder("A");

    let report = folder::sync::sync(&source, &destination, &status, &Monitor::default(), false)
        .await
        .unwrap();

    assert_eq!(report.patch.len(), 2);
    assert_eq!(destination.folder_names().await, vec!["A"]);
    assert_eq!(status.folder_names().await, vec!["A"]);

    // only the status repository tolerates known folders
    assert!(StatusRepository::create_folder(&status, "A").await.is_ok());
    assert!(Repository::create_folder(&destination, "A").await.is_err());
}

#[test_log::test(tokio::test)]
async fn test_separator_in_folder_name_is_not_stable() {
    let source = MemoryRepository::new("remote", '.');
    let destination = MemoryRepository::new("local", '/').with_folder("a.b");
    let status = MemoryRepository::new("status", '/');

    folder::sync::sync(&source, &destination, &status, &Monitor::default(), false)
        .await
        .unwrap();

    assert_eq!(source.folder_names().await, vec!["a.b"]);
    assert_eq!(status.folder_names().await, vec!["a.b"]);

    // "a.b" reads as "a/b" from the source side, which the destination
    // does not have, while the destination "a.b" still has no source
    // counterpart

    let err = folder::sync::sync(&source, &destination, &status, &Monitor::default(), false)
        .await
        .unwrap_err();

    match err {
        folder::Error::CreateFolderError(_, folder, repository) => {
            assert_eq!(folder, "a.b");
            assert_eq!(repository, "remote");
        }
        err => panic!("unexpected error: {err:?}"),
    }

    assert_eq!(destination.folder_names().await, vec!["a.b", "a/b"]);
    assert_eq!(status.folder_names().await, vec!["a.b", "a/b"]);
}

#[test_log::test(tokio::test)]
async fn test_dry_run_creates_nothing() {
    let source = MemoryRepository::new("remote", '/').with_folder("A");
    let destination = MemoryRepository::new("local", '/');
    let status = MemoryRepository::new("status", '/');

    let report = folder::sync::sync(&source, &destination, &status, &Monitor::default(), true)
        .await
        .unwrap();

    assert_eq!(report.patch.len(), 2);
    assert!(destination.folder_names().await.is_empty());
    assert!(status.folder_names().await.is_empty());
}

/// A repository refusing to create folders.
struct ReadOnlyRepository(MemoryRepository);

#[async_trait]
impl Repository for ReadOnlyRepository {
    fn name(&self) -> &str {
        Repository::name(&self.0)
    }

    fn separator(&self) -> char {
        Repository::separator(&self.0)
    }

    async fn list_folders(&self) -> AnyResult<Vec<FolderEntry>> {
        self.0.list_folders().await
    }

    async fn create_folder(&self, folder: &str) -> AnyResult<()> {
        let err = memory::Error::FolderAlreadyExistsError(folder.to_owned(), self.name().into());
        Err(err.into())
    }

    async fn get_folder(&self, folder: &str) -> AnyResult<Arc<dyn MessageFolder>> {
        self.0.get_folder(folder).await
    }
}

#[test_log::test(tokio::test)]
async fn test_creation_failure_aborts() {
    let source = MemoryRepository::new("remote", '/').with_folder("A");
    let destination = ReadOnlyRepository(MemoryRepository::new("local", '/'));
    let status = MemoryRepository::new("status", '/');
    let (monitor, mut events) = Monitor::new();

    let err = folder::sync::sync(&source, &destination, &status, &monitor, false)
        .await
        .unwrap_err();

    match err {
        folder::Error::CreateFolderError(_, folder, repository) => {
            assert_eq!(folder, "A");
            assert_eq!(repository, "local");
        }
        err => panic!("unexpected error: {err:?}"),
    }

    assert!(status.folder_names().await.is_empty());

    drop(monitor);

    let mut errors = Vec::new();
    while let Some(event) = events.recv().await {
        if let MonitorEvent::Error(context, _) = event {
            errors.push(context);
        }
    }

    assert_eq!(errors, vec!["Creating folder A on repository local"]);
}
