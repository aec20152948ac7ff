// Bind-mount size scanner: slow, paced walks of every bind-mount source.

use crate::config::ScannerConfig;
use crate::docker_repo::DockerApi;
use crate::models::{
    BindMountInfo, BindMountsSnapshot, ContainerSummary, HostVolume, ScanProgress, now_millis,
};
use crate::sizing;
use crate::store::{Store, StoreKey};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

const SECRETS_DIR: &str = "/run/secrets/";

/// Which container mounts are worth sizing.
#[derive(Debug, Clone)]
pub struct MountFilter {
    /// Env entry marking our own container.
    pub self_marker: String,
    pub socket_path: String,
    pub skip_secrets: bool,
    pub ignore: Vec<glob::Pattern>,
}

impl MountFilter {
    pub fn from_config(config: &ScannerConfig, socket_path: &str) -> anyhow::Result<Self> {
        let ignore = config
            .ignore_patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| anyhow::anyhow!("invalid ignore pattern `{}`: {}", p, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            self_marker: config.self_marker.clone(),
            socket_path: socket_path.to_string(),
            skip_secrets: config.skip_secrets,
            ignore,
        })
    }

    fn skips_source(&self, source: &str) -> bool {
        source == self.socket_path || self.ignore.iter().any(|p| p.matches(source))
    }
}

/// A bind-mount source and the containers mounting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredMount {
    pub source: String,
    pub read_only: bool,
    pub containers: Vec<String>,
}

/// Distinct bind-mount sources across `containers`, in first-seen order.
///
/// A source is read-only as long as every container mounts it read-only.
pub fn collect_bind_mounts(
    containers: &[ContainerSummary],
    filter: &MountFilter,
) -> Vec<DiscoveredMount> {
    let mut out: Vec<DiscoveredMount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for c in containers.iter().filter(|c| !c.has_env(&filter.self_marker)) {
        for m in &c.mounts {
            if !m.is_bind() || filter.skips_source(&m.source) {
                continue;
            }
            if filter.skip_secrets && m.destination.starts_with(SECRETS_DIR) {
                continue;
            }
            match index.get(&m.source) {
                Some(&i) => {
                    let entry = &mut out[i];
                    entry.read_only &= m.read_only;
                    if !entry.containers.contains(&c.name) {
                        entry.containers.push(c.name.clone());
                    }
                }
                None => {
                    index.insert(m.source.clone(), out.len());
                    out.push(DiscoveredMount {
                        source: m.source.clone(),
                        read_only: m.read_only,
                        containers: vec![c.name.clone()],
                    });
                }
            }
        }
    }
    out
}

/// Merge a fresh discovery into the previous pass: known paths keep their last sizes and
/// new paths start unsized. Paths no longer mounted are kept, after the discovered ones,
/// with their last values and no containers.
pub fn merge_discovered(
    previous: Vec<BindMountInfo>,
    discovered: Vec<DiscoveredMount>,
    now: i64,
) -> Vec<BindMountInfo> {
    let mut known: HashMap<String, usize> = previous
        .iter()
        .enumerate()
        .map(|(i, m)| (m.path.clone(), i))
        .collect();
    let mut previous: Vec<Option<BindMountInfo>> = previous.into_iter().map(Some).collect();

    let mut merged: Vec<BindMountInfo> = discovered
        .into_iter()
        .map(|d| {
            let mut info = known
                .remove(&d.source)
                .and_then(|i| previous[i].take())
                .unwrap_or_else(|| BindMountInfo::discovered(d.source.clone(), d.read_only, now));
            info.read_only = d.read_only;
            info.containers = d.containers;
            info
        })
        .collect();
    merged.extend(previous.into_iter().flatten().map(|mut stale| {
        stale.containers.clear();
        stale
    }));
    merged
}

/// Shared handles the scanner reads from and writes to.
pub struct ScannerDeps {
    pub docker: Arc<dyn DockerApi>,
    pub store: Arc<Store>,
    pub volumes: Arc<[HostVolume]>,
}

pub struct BindMountScanner {
    deps: ScannerDeps,
    config: ScannerConfig,
    filter: MountFilter,
    mounts: Vec<BindMountInfo>,
}

impl BindMountScanner {
    pub fn new(deps: ScannerDeps, config: ScannerConfig, filter: MountFilter) -> Self {
        Self {
            deps,
            config,
            filter,
            mounts: Vec::new(),
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let span = tracing::span!(
            tracing::Level::DEBUG,
            "scanner",
            pace_ms = self.config.pace_ms,
            rescan_interval_secs = self.config.rescan_interval_secs
        );
        tokio::spawn(self.run(cancel).instrument(span))
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let rescan = self.config.rescan_interval();
        loop {
            if !self.scan_pass(&cancel).await {
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(rescan) => {}
            }
        }
        tracing::debug!("Scanner shutting down");
    }

    /// One pass over every bind mount. Returns false when cancelled midway.
    pub async fn scan_pass(&mut self, cancel: &CancellationToken) -> bool {
        let containers = match self.deps.docker.list_containers(true).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, operation = "list_containers", "bind mount scan skipped");
                return !cancel.is_cancelled();
            }
        };

        let started = Instant::now();
        let progress = ScanProgress::started(now_millis());
        self.deps.store.set_json(StoreKey::ScanProgress, &progress);

        let discovered = collect_bind_mounts(&containers, &self.filter);
        self.mounts = merge_discovered(std::mem::take(&mut self.mounts), discovered, now_millis());
        self.publish();

        let pace = self.config.pace();
        for i in 0..self.mounts.len() {
            self.measure_entry(i).await;
            self.publish();
            if !self.pause(cancel, pace).await {
                return false;
            }
        }

        let took = started.elapsed();
        let progress = progress.finished(took.as_millis() as u64);
        self.deps.store.set_json(StoreKey::ScanProgress, &progress);
        self.deps.store.notify_all();
        tracing::debug!(
            operation = "scan_pass",
            bind_mounts = self.mounts.len(),
            took_ms = took.as_millis() as u64,
            "bind mount scan finished"
        );
        true
    }

    pub fn bind_mounts(&self) -> &[BindMountInfo] {
        &self.mounts
    }

    async fn measure_entry(&mut self, i: usize) {
        let source = self.mounts[i].path.clone();
        let volumes = self.deps.volumes.clone();
        let prefix = self.config.mount_namespace_prefix.clone();
        let result =
            tokio::task::spawn_blocking(move || sizing::measure(&source, &volumes, &prefix)).await;

        let entry = &mut self.mounts[i];
        entry.prepared = true;
        match result {
            Ok(Ok(m)) => {
                entry.size = m.size;
                entry.files = m.files;
                entry.is_dir = m.is_dir;
                entry.last_check = now_millis();
                entry.err = None;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, operation = "measure", path = %entry.path, "failed to size bind mount");
                entry.err = Some(e.to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "measure", path = %entry.path, "size task join failed");
                entry.err = Some(e.to_string());
            }
        }
    }

    fn publish(&self) {
        let snapshot = BindMountsSnapshot::new(self.mounts.clone());
        self.deps.store.set_json(StoreKey::BindMounts, &snapshot);
        self.deps.store.notify_all();
    }

    async fn pause(&self, cancel: &CancellationToken, d: Duration) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(d) => true,
        }
    }
}
