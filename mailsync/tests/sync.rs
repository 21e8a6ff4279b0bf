use std::{fs, fs::OpenOptions, sync::Arc};

use advisory_lock::{AdvisoryFileLock, FileLockMode};
use mailsync::{
    config::SyncConfig,
    flag::Flags,
    folder::MessageFolder,
    memory::MemoryRepository,
    message::MessageSyncReport,
    sync::{Error, SyncBuilder},
};
use tempfile::tempdir;

struct Fixture {
    config: SyncConfig,
    remote: Arc<MemoryRepository>,
    local: Arc<MemoryRepository>,
    status: Arc<MemoryRepository>,
}

impl Fixture {
    fn new(metadata_dir: &std::path::Path) -> Self {
        Self {
            config: SyncConfig {
                metadata_dir: Some(metadata_dir.to_owned()),
                ..Default::default()
            },
            remote: Arc::new(
                MemoryRepository::new("remote", '/')
                    .with_folder("INBOX")
                    .with_folder("Archives/2024"),
            ),
            local: Arc::new(MemoryRepository::new("local", '.').with_folder("INBOX")),
            status: Arc::new(MemoryRepository::new("status", '/')),
        }
    }

    fn builder(&self) -> SyncBuilder {
        SyncBuilder::new(
            "account",
            self.config.clone(),
            self.remote.clone(),
            self.local.clone(),
            self.status.clone(),
        )
    }
}

fn report(folder: &str) -> MessageSyncReport {
    MessageSyncReport {
        folder: folder.to_owned(),
        ..Default::default()
    }
}

#[test_log::test(tokio::test)]
async fn test_sync() {
    let tmp = tempdir().unwrap();
    let fixture = Fixture::new(tmp.path());

    let remote_inbox = fixture.remote.folder("INBOX").await.unwrap();
    let local_inbox = fixture.local.folder("INBOX").await.unwrap();
    remote_inbox.add_message("from remote", "seen").await;
    local_inbox.add_message("from local", "").await;

    // first run: folders are created, messages exchanged

    let sync = fixture.builder().sync().await.unwrap();

    assert!(sync.is_success(), "{:?}", sync.tasks);
    assert_eq!(sync.tasks.len(), 2);
    assert_eq!(fixture.local.folder_names().await, vec!["Archives.2024", "INBOX"]);
    assert_eq!(fixture.status.folder_names().await, vec!["Archives/2024"]);
    assert_eq!(
        sync.messages["INBOX"],
        MessageSyncReport {
            copied: 1,
            uploaded: 1,
            ..report("INBOX")
        }
    );
    assert_eq!(sync.messages["Archives/2024"], report("Archives/2024"));

    assert_eq!(remote_inbox.list_ids().await.unwrap().len(), 2);
    assert_eq!(local_inbox.list_ids().await.unwrap().len(), 2);

    let mapping_dir = tmp.path().join("Repository-local").join("UIDMapping");
    assert!(mapping_dir.join("Archives.2024").is_file());
    assert_eq!(
        fs::read_to_string(mapping_dir.join("INBOX")).unwrap(),
        "2:1\n1:2\n"
    );

    // second run: nothing to do

    let sync = fixture.builder().sync().await.unwrap();

    assert!(sync.is_success());
    assert_eq!(sync.messages["INBOX"], report("INBOX"));

    // third run: remote changes are applied locally

    remote_inbox
        .set_flags(1, &Flags::from("seen flagged"))
        .await
        .unwrap();
    remote_inbox.delete_message(2).await.unwrap();

    let sync = fixture.builder().sync().await.unwrap();

    assert!(sync.is_success());
    assert_eq!(
        sync.messages["INBOX"],
        MessageSyncReport {
            deleted: 1,
            flagged: 1,
            ..report("INBOX")
        }
    );
    assert_eq!(
        local_inbox.get_flags(2).await.unwrap(),
        Flags::from("seen flagged")
    );
    assert!(local_inbox.message(1).await.is_none());
    assert_eq!(
        fs::read_to_string(mapping_dir.join("INBOX")).unwrap(),
        "2:1\n"
    );
}

#[test_log::test(tokio::test)]
async fn test_local_deletions_are_propagated() {
    let tmp = tempdir().unwrap();
    let fixture = Fixture::new(tmp.path());

    let remote_inbox = fixture.remote.folder("INBOX").await.unwrap();
    let local_inbox = fixture.local.folder("INBOX").await.unwrap();
    remote_inbox.add_message("from remote", "seen").await;

    let sync = fixture.builder().sync().await.unwrap();
    assert!(sync.is_success());

    let mapping_file = tmp.path().join("Repository-local/UIDMapping/INBOX");
    assert_eq!(fs::read_to_string(&mapping_file).unwrap(), "1:1\n");

    local_inbox.delete_message(1).await.unwrap();

    let sync = fixture.builder().sync().await.unwrap();

    assert!(sync.is_success());
    assert_eq!(
        sync.messages["INBOX"],
        MessageSyncReport {
            removed: 1,
            ..report("INBOX")
        }
    );
    assert!(remote_inbox.list_ids().await.unwrap().is_empty());
    assert!(local_inbox.list_ids().await.unwrap().is_empty());
    assert_eq!(fs::read_to_string(&mapping_file).unwrap(), "");

    // the deletion is not replayed

    let sync = fixture.builder().sync().await.unwrap();
    assert_eq!(sync.messages["INBOX"], report("INBOX"));
}

#[test_log::test(tokio::test)]
async fn test_dry_run_keeps_local_deletions_pending() {
    let tmp = tempdir().unwrap();
    let fixture = Fixture::new(tmp.path());

    let remote_inbox = fixture.remote.folder("INBOX").await.unwrap();
    let local_inbox = fixture.local.folder("INBOX").await.unwrap();
    remote_inbox.add_message("from remote", "").await;

    fixture.builder().sync().await.unwrap();
    local_inbox.delete_message(1).await.unwrap();

    let sync = fixture.builder().with_dry_run(true).sync().await.unwrap();

    assert_eq!(
        sync.messages["INBOX"],
        MessageSyncReport {
            removed: 1,
            ..report("INBOX")
        }
    );
    assert_eq!(remote_inbox.list_ids().await.unwrap().len(), 1);

    let mapping_file = tmp.path().join("Repository-local/UIDMapping/INBOX");
    assert_eq!(fs::read_to_string(mapping_file).unwrap(), "1:1\n");
}

#[test_log::test(tokio::test)]
async fn test_dry_run() {
    let tmp = tempdir().unwrap();
    let fixture = Fixture::new(tmp.path());

    let remote_inbox = fixture.remote.folder("INBOX").await.unwrap();
    let local_inbox = fixture.local.folder("INBOX").await.unwrap();
    remote_inbox.add_message("from remote", "seen").await;

    let sync = fixture.builder().with_dry_run(true).sync().await.unwrap();

    assert!(sync.is_success());
    assert_eq!(sync.folder.patch.len(), 2);
    assert_eq!(sync.tasks.len(), 1);
    assert_eq!(
        sync.messages["INBOX"],
        MessageSyncReport {
            copied: 1,
            ..report("INBOX")
        }
    );

    assert_eq!(fixture.local.folder_names().await, vec!["INBOX"]);
    assert!(fixture.status.folder_names().await.is_empty());
    assert!(local_inbox.list_ids().await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_folder_failure_does_not_abort_siblings() {
    let tmp = tempdir().unwrap();
    let fixture = Fixture::new(tmp.path());

    fixture
        .remote
        .folder("INBOX")
        .await
        .unwrap()
        .add_message("from remote", "")
        .await;

    let mapping_dir = fixture.config.uid_mapping_dir("local").unwrap();
    fs::write(mapping_dir.join("INBOX"), "garbage\n").unwrap();

    let sync = fixture.builder().sync().await.unwrap();

    assert!(!sync.is_success());

    let failures: Vec<_> = sync.failures().map(|task| task.name.as_str()).collect();
    assert_eq!(failures, vec!["Synchronizing folder INBOX"]);
    assert!(sync.messages.contains_key("Archives/2024"));
    assert!(!sync.messages.contains_key("INBOX"));
}

#[test_log::test(tokio::test)]
async fn test_sync_is_exclusive() {
    let tmp = tempdir().unwrap();
    let fixture = Fixture::new(tmp.path());

    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp.path().join("account.lock"))
        .unwrap();
    AdvisoryFileLock::try_lock(&lock_file, FileLockMode::Exclusive).unwrap();

    match fixture.builder().sync().await.unwrap_err() {
        Error::LockFileError(_, path) => assert!(path.ends_with("account.lock")),
        err => panic!("unexpected error: {err:?}"),
    }

    AdvisoryFileLock::unlock(&lock_file).unwrap();
    assert!(fixture.builder().sync().await.is_ok());
}
