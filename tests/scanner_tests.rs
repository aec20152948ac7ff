// Bind-mount scanner passes against an in-memory daemon and a temp host volume

mod common;

use common::{FakeDocker, bind, container};
use doku::config::ScannerConfig;
use doku::models::{HostVolume, ScanProgress};
use doku::scanner::{BindMountScanner, MountFilter, ScannerDeps};
use doku::store::{Store, StoreKey};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn scanner(docker: Arc<FakeDocker>, store: Arc<Store>, root: &std::path::Path) -> BindMountScanner {
    let config = ScannerConfig {
        pace_ms: 1,
        ..ScannerConfig::default()
    };
    let filter = MountFilter::from_config(&config, "/var/run/docker.sock").unwrap();
    BindMountScanner::new(
        ScannerDeps {
            docker,
            store,
            volumes: vec![HostVolume::new("root", root)].into(),
        },
        config,
        filter,
    )
}

fn published(store: &Store) -> serde_json::Value {
    serde_json::from_slice(&store.get(StoreKey::BindMounts).unwrap()).unwrap()
}

#[tokio::test]
async fn scan_pass_sizes_every_bind_mount() {
    let root = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("srv/app/data")).unwrap();
    fs::write(root.path().join("srv/app/data/db.sqlite"), vec![0u8; 300]).unwrap();
    fs::write(root.path().join("srv/app/config.yml"), vec![0u8; 20]).unwrap();

    let docker = FakeDocker::new();
    docker.set_containers(Some(vec![
        container("app", vec![bind("/srv/app", "/app")]),
        container("worker", vec![bind("/srv/app/data", "/data")]),
    ]));
    let store = Arc::new(Store::new());
    let mut scanner = scanner(docker, store.clone(), root.path());

    assert!(scanner.scan_pass(&CancellationToken::new()).await);

    let mounts = scanner.bind_mounts();
    assert_eq!(mounts.len(), 2);
    assert!(mounts.iter().all(|m| m.prepared && m.err.is_none() && m.is_dir));
    assert_eq!(mounts[0].size, 320);
    assert_eq!(mounts[0].files, 2);
    assert_eq!(mounts[1].size, 300);

    let json = published(&store);
    // Nested mount is not counted twice.
    assert_eq!(json["totalSize"], 320);
    assert_eq!(json["bindMounts"][0]["containers"][0], "app");

    let progress: ScanProgress =
        serde_json::from_slice(&store.get(StoreKey::ScanProgress).unwrap()).unwrap();
    assert!(progress.completed);
}

#[tokio::test]
async fn own_container_mounts_are_never_sized() {
    let root = tempfile::TempDir::new().unwrap();
    fs::create_dir(root.path().join("srv")).unwrap();

    let mut doku = container("doku", vec![bind("/", "/hostroot")]);
    doku.env.push("DOKU_IN_DOCKER=1".into());
    let docker = FakeDocker::new();
    docker.set_containers(Some(vec![
        doku,
        container("app", vec![bind("/var/run/docker.sock", "/var/run/docker.sock")]),
    ]));
    let store = Arc::new(Store::new());
    let mut scanner = scanner(docker, store.clone(), root.path());

    assert!(scanner.scan_pass(&CancellationToken::new()).await);
    assert!(scanner.bind_mounts().is_empty());
    assert_eq!(published(&store)["totalSize"], 0);
}

#[tokio::test]
async fn failing_path_is_recorded_and_others_still_sized() {
    let root = tempfile::TempDir::new().unwrap();
    fs::create_dir(root.path().join("ok")).unwrap();
    fs::write(root.path().join("ok/file"), vec![0u8; 8]).unwrap();

    let docker = FakeDocker::new();
    docker.set_containers(Some(vec![container(
        "app",
        vec![bind("/missing", "/m"), bind("/ok", "/ok")],
    )]));
    let store = Arc::new(Store::new());
    let mut scanner = scanner(docker, store.clone(), root.path());

    assert!(scanner.scan_pass(&CancellationToken::new()).await);
    let mounts = scanner.bind_mounts();
    assert_eq!(mounts[0].path, "/missing");
    assert!(mounts[0].prepared);
    assert!(mounts[0].err.is_some());
    assert_eq!(mounts[0].size, 0);
    assert_eq!(mounts[1].size, 8);
    assert_eq!(published(&store)["totalSize"], 8);
}

#[tokio::test]
async fn error_is_cleared_once_path_resolves() {
    let root = tempfile::TempDir::new().unwrap();
    let docker = FakeDocker::new();
    docker.set_containers(Some(vec![container("app", vec![bind("/later", "/l")])]));
    let store = Arc::new(Store::new());
    let mut scanner = scanner(docker, store, root.path());
    let cancel = CancellationToken::new();

    assert!(scanner.scan_pass(&cancel).await);
    assert!(scanner.bind_mounts()[0].err.is_some());

    fs::create_dir(root.path().join("later")).unwrap();
    fs::write(root.path().join("later/x"), vec![0u8; 5]).unwrap();
    assert!(scanner.scan_pass(&cancel).await);
    let m = &scanner.bind_mounts()[0];
    assert!(m.err.is_none());
    assert_eq!(m.size, 5);
}

#[tokio::test]
async fn unmounted_source_keeps_its_entry_and_size() {
    let root = tempfile::TempDir::new().unwrap();
    fs::create_dir(root.path().join("a")).unwrap();
    fs::write(root.path().join("a/blob"), vec![0u8; 40]).unwrap();

    let docker = FakeDocker::new();
    docker.set_containers(Some(vec![container("app", vec![bind("/a", "/a")])]));
    let store = Arc::new(Store::new());
    let mut scanner = scanner(docker.clone(), store.clone(), root.path());
    let cancel = CancellationToken::new();

    assert!(scanner.scan_pass(&cancel).await);
    assert_eq!(scanner.bind_mounts()[0].size, 40);

    docker.set_containers(Some(vec![]));
    assert!(scanner.scan_pass(&cancel).await);

    let mounts = scanner.bind_mounts();
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0].path, "/a");
    assert_eq!(mounts[0].size, 40);
    assert!(mounts[0].containers.is_empty());
    let json = published(&store);
    assert_eq!(json["totalSize"], 40);
    assert_eq!(json["bindMounts"][0]["containers"], serde_json::json!([]));
}

#[tokio::test]
async fn listing_failure_skips_the_pass() {
    let root = tempfile::TempDir::new().unwrap();
    let docker = FakeDocker::new();
    docker.set_containers(None);
    let store = Arc::new(Store::new());
    let mut scanner = scanner(docker, store.clone(), root.path());

    assert!(scanner.scan_pass(&CancellationToken::new()).await);
    assert!(store.get(StoreKey::BindMounts).is_none());
    assert!(store.get(StoreKey::ScanProgress).is_none());
}

#[tokio::test]
async fn cancelled_scanner_stops_promptly() {
    let root = tempfile::TempDir::new().unwrap();
    let docker = FakeDocker::new();
    docker.set_containers(Some(vec![container("app", vec![bind("/a", "/a")])]));
    let store = Arc::new(Store::new());
    let scanner = scanner(docker.clone(), store, root.path());
    let cancel = CancellationToken::new();

    let handle = scanner.spawn(cancel.clone());
    // First pass done, now waiting for the hourly rescan.
    tokio::time::timeout(Duration::from_secs(5), async {
        while docker.list_calls.load(std::sync::atomic::Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
