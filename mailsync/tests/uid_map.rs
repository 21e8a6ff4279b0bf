use std::{collections::BTreeSet, fs};

use mailsync::{
    uid_map::{Error, UidMap, UidMapStore},
    Severity,
};
use tempfile::tempdir;

#[test_log::test(tokio::test)]
async fn test_reconcile_then_save() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "INBOX", tmp.path());
    fs::write(store.path(), "5:100\n7:101\n").unwrap();

    let (map, vanished) = store
        .reconcile(&BTreeSet::from_iter([5, 7, 9]))
        .await
        .unwrap();
    assert!(vanished.is_empty());
    assert_eq!(map, UidMap::from_iter([(100, 5), (101, 7), (-1, 9)]));

    store.save(&map).await.unwrap();
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "5:100\n7:101\n");
}

#[test_log::test(tokio::test)]
async fn test_load_corrupt_map() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "INBOX", tmp.path());
    fs::write(store.path(), "abc:1\n").unwrap();

    let err = store.load().await.unwrap_err();
    assert_eq!(err.severity(), Severity::Repository);

    match err {
        Error::MappingCorruptError(line, folder, repository) => {
            assert_eq!(line, "abc:1");
            assert_eq!(folder, "INBOX");
            assert_eq!(repository, "local");
        }
        err => panic!("unexpected error: {err:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn test_load_missing_map() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "Archives/2024", tmp.path());

    assert!(store.path().ends_with("Archives.2024"));

    match store.load().await.unwrap_err() {
        Error::MappingUnavailableError(path, folder, _) => {
            assert_eq!(path, store.path());
            assert_eq!(folder, "Archives/2024");
        }
        err => panic!("unexpected error: {err:?}"),
    }

    assert!(store.create().await.unwrap());
    assert!(!store.create().await.unwrap());
    assert_eq!(store.load().await.unwrap(), UidMap::new());
}

#[test_log::test(tokio::test)]
async fn test_round_trip_is_noop() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "INBOX", tmp.path());
    let contents = "5:100\n7:101\n8:205\n";
    fs::write(store.path(), contents).unwrap();

    let local_ids = BTreeSet::from_iter([5, 7, 8]);

    for _ in 0..2 {
        let (map, _) = store.reconcile(&local_ids).await.unwrap();
        store.save(&map).await.unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), contents);
    }
}

#[test_log::test(tokio::test)]
async fn test_save_replaces_stale_tmp_file() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "INBOX", tmp.path());
    let tmp_path = tmp.path().join("INBOX.tmp");

    // a crash between the temp write and the rename leaves the durable
    // file untouched
    fs::write(store.path(), "5:100\n").unwrap();
    fs::write(&tmp_path, "5:10").unwrap();
    assert_eq!(store.load().await.unwrap(), UidMap::from_iter([(100, 5)]));

    let map = UidMap::from_iter([(100, 5), (101, 7), (-1, 9)]);
    store.save(&map).await.unwrap();

    assert!(!tmp_path.exists());
    assert_eq!(fs::read_to_string(store.path()).unwrap(), "5:100\n7:101\n");
}

#[test_log::test(tokio::test)]
async fn test_reconcile_binds_every_local_id_once() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "INBOX", tmp.path());
    fs::write(store.path(), "5:100\n7:101\n3:102\n").unwrap();

    let local_ids = BTreeSet::from_iter([1, 2, 5, 7, 11]);
    let (map, vanished) = store.reconcile(&local_ids).await.unwrap();

    let values: Vec<_> = map.values().copied().collect();
    assert_eq!(values.len(), local_ids.len());
    assert_eq!(BTreeSet::from_iter(values), local_ids);

    assert_eq!(vanished, BTreeSet::from_iter([102]));
    assert_eq!(map.confirmed().count(), 2);
    assert_eq!(map.placeholders().count(), 3);
}

#[test_log::test(tokio::test)]
async fn test_load_trims_ids() {
    let tmp = tempdir().unwrap();
    let store = UidMapStore::from_dir("local", "INBOX", tmp.path());
    fs::write(store.path(), "5 : 100\n 7:101\t\n").unwrap();

    let map = store.load().await.unwrap();

    assert_eq!(map, UidMap::from_iter([(100, 5), (101, 7)]));
}
