// Shared test helpers: an in-memory Docker daemon and model builders

#![allow(dead_code)]

use async_trait::async_trait;
use doku::docker_repo::{DockerApi, DockerError, EventStream};
use doku::models::*;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Scriptable `DockerApi`. Each `events()` call opens a new subscription whose sender
/// is handed to the test through [`FakeDocker::take_subscription`].
#[derive(Default)]
pub struct FakeDocker {
    pub version: Mutex<Option<VersionInfo>>,
    pub disk_usage: Mutex<Option<DiskUsageInfo>>,
    pub containers: Mutex<Option<Vec<ContainerSummary>>>,
    pub version_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub subscriptions: AtomicUsize,
    senders: Mutex<Vec<mpsc::UnboundedSender<Result<DaemonEvent, DockerError>>>>,
}

impl FakeDocker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            version: Mutex::new(Some(VersionInfo {
                version: Some("27.0.1".into()),
                api_version: Some("1.46".into()),
                ..Default::default()
            })),
            disk_usage: Mutex::new(Some(DiskUsageInfo::default())),
            containers: Mutex::new(Some(Vec::new())),
            ..Default::default()
        })
    }

    pub fn set_containers(&self, containers: Option<Vec<ContainerSummary>>) {
        *self.containers.lock().unwrap() = containers;
    }

    pub fn set_version(&self, version: Option<VersionInfo>) {
        *self.version.lock().unwrap() = version;
    }

    /// Sender of the most recent subscription, if one is still open.
    pub fn latest_subscription(
        &self,
    ) -> Option<mpsc::UnboundedSender<Result<DaemonEvent, DockerError>>> {
        self.senders.lock().unwrap().last().cloned()
    }

    /// Close every open subscription (the poller sees end of stream).
    pub fn close_subscriptions(&self) {
        self.senders.lock().unwrap().clear();
    }
}

fn unavailable(what: &str) -> DockerError {
    DockerError::Unavailable(format!("{what} scripted to fail"))
}

#[async_trait]
impl DockerApi for FakeDocker {
    async fn server_version(&self) -> Result<VersionInfo, DockerError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.version.lock().unwrap().clone().ok_or_else(|| unavailable("version"))
    }

    async fn disk_usage(&self) -> Result<DiskUsageInfo, DockerError> {
        self.disk_usage
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("disk usage"))
    }

    async fn list_containers(
        &self,
        _include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, DockerError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.containers
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| unavailable("container list"))
    }

    fn events(&self) -> EventStream {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }
}

pub fn bind(source: &str, destination: &str) -> MountPoint {
    MountPoint {
        kind: "bind".into(),
        source: source.into(),
        destination: destination.into(),
        read_only: false,
    }
}

pub fn container(name: &str, mounts: Vec<MountPoint>) -> ContainerSummary {
    ContainerSummary {
        id: format!("{name}-id"),
        name: name.into(),
        image: "busybox:latest".into(),
        state: ContainerState::Running,
        mounts,
        env: vec!["PATH=/usr/local/bin:/usr/bin".into()],
        log_path: None,
        size_rw: Some(0),
        size_root_fs: Some(0),
    }
}
