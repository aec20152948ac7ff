// Event-debounced poller: keeps daemon-derived snapshots fresh.
// Daemon events are only a hint; a forced refresh bounds staleness.

use crate::config::PollerConfig;
use crate::docker_repo::{DockerApi, DockerError};
use crate::models::{
    ContainerListSnapshot, ContainerSummary, DaemonEvent, HostVolume, LogFileInfo,
    LogSizesSnapshot, now_millis,
};
use crate::sizing::{self, SizingError};
use crate::store::{Store, StoreKey};
use crate::sysinfo_repo::SysinfoRepo;
use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Decides when a refresh is due: pending significant events are coalesced into one
/// refresh per short tick, and a refresh is forced once the long interval has passed.
#[derive(Debug)]
pub struct Debouncer {
    pending: u64,
    last_refresh: Instant,
    long_interval: Duration,
}

impl Debouncer {
    pub fn new(long_interval: Duration, now: Instant) -> Self {
        Self {
            pending: 0,
            last_refresh: now,
            long_interval,
        }
    }

    /// Count `event` if it can change disk usage. Returns whether it was counted.
    pub fn record(&mut self, event: &DaemonEvent) -> bool {
        if !event.is_significant() {
            return false;
        }
        self.pending = self.pending.saturating_add(1);
        true
    }

    /// Called on each short tick. Consumes pending events when it returns true.
    pub fn due(&mut self, now: Instant) -> bool {
        if self.pending > 0 {
            self.pending = 0;
            return true;
        }
        now.saturating_duration_since(self.last_refresh) > self.long_interval
    }

    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh = now;
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }
}

/// Shared handles the poller reads from and writes to.
pub struct PollerDeps {
    pub docker: Arc<dyn DockerApi>,
    pub sysinfo: Arc<SysinfoRepo>,
    pub store: Arc<Store>,
    pub volumes: Arc<[HostVolume]>,
}

pub struct Poller {
    deps: PollerDeps,
    config: PollerConfig,
    /// Log paths whose resolution failure was already logged.
    failed_logs: HashSet<String>,
}

impl Poller {
    pub fn new(deps: PollerDeps, config: PollerConfig) -> Self {
        Self {
            deps,
            config,
            failed_logs: HashSet::new(),
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        let span = tracing::span!(
            tracing::Level::DEBUG,
            "poller",
            short_interval_ms = self.config.short_interval_ms,
            long_interval_secs = self.config.long_interval_secs
        );
        tokio::spawn(self.run(cancel).instrument(span))
    }

    /// Refresh now, then follow daemon events until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let long_interval = self.config.long_interval();
        let mut debouncer = Debouncer::new(long_interval, Instant::now());
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = self.refresh() => debouncer.mark_refreshed(Instant::now()),
        }

        loop {
            let mut events = self.deps.docker.events();
            let mut tick = interval(self.config.short_interval());
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let lost = loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Poller shutting down");
                        return;
                    }
                    item = events.next() => match item {
                        Some(Ok(event)) => {
                            if debouncer.record(&event) {
                                tracing::trace!(
                                    kind = %event.kind,
                                    action = %event.action,
                                    pending = debouncer.pending(),
                                    "docker event"
                                );
                            }
                        }
                        Some(Err(e)) => break e,
                        None => break DockerError::StreamClosed,
                    },
                    _ = tick.tick() => {
                        if debouncer.due(Instant::now()) {
                            tokio::select! {
                                _ = cancel.cancelled() => return,
                                _ = self.refresh() => debouncer.mark_refreshed(Instant::now()),
                            }
                        }
                    }
                }
            };

            tracing::warn!(
                error = %lost,
                operation = "docker_events",
                backoff_secs = long_interval.as_secs(),
                "docker event stream lost; reconnecting"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Poller shutting down");
                    return;
                }
                _ = tokio::time::sleep(long_interval) => {}
            }
        }
    }

    /// One refresh pass. Sub-operations are independent; a failed one keeps its previous value.
    pub async fn refresh(&mut self) {
        let started = Instant::now();
        let PollerDeps {
            docker,
            sysinfo,
            store,
            volumes,
        } = &self.deps;

        tokio::join!(
            refresh_version(&**docker, store),
            refresh_disk_usage(&**docker, store),
            refresh_containers(&**docker, store, volumes, &mut self.failed_logs),
            refresh_host_disks(sysinfo, store, volumes),
        );

        store.notify_all();
        tracing::debug!(
            operation = "refresh",
            took_ms = started.elapsed().as_millis() as u64,
            "poller refresh finished"
        );
    }
}

async fn refresh_version(docker: &dyn DockerApi, store: &Store) {
    match docker.server_version().await {
        Ok(v) => {
            store.set_json(StoreKey::DockerVersion, &v);
        }
        Err(e) => tracing::warn!(error = %e, operation = "docker_version", "docker version failed"),
    }
}

async fn refresh_disk_usage(docker: &dyn DockerApi, store: &Store) {
    match docker.disk_usage().await {
        Ok(df) => {
            store.set_json(StoreKey::DockerDiskUsage, &df);
        }
        Err(e) => {
            tracing::warn!(error = %e, operation = "docker_disk_usage", "docker disk usage failed")
        }
    }
}

async fn refresh_containers(
    docker: &dyn DockerApi,
    store: &Store,
    volumes: &Arc<[HostVolume]>,
    failed_logs: &mut HashSet<String>,
) {
    let containers = match docker.list_containers(true).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, operation = "list_containers", "container listing failed");
            return;
        }
    };
    let logs = log_sizes(&containers, volumes, failed_logs).await;
    store.set_json(StoreKey::ContainerList, &ContainerListSnapshot::new(containers));
    if let Some(logs) = logs {
        store.set_json(StoreKey::LogSizes, &LogSizesSnapshot::new(logs));
    }
}

/// Log file sizes for `containers`. Unresolvable logs are left out and logged once per path.
async fn log_sizes(
    containers: &[ContainerSummary],
    volumes: &Arc<[HostVolume]>,
    failed_logs: &mut HashSet<String>,
) -> Option<Vec<LogFileInfo>> {
    let targets: Vec<(String, String, String)> = containers
        .iter()
        .filter_map(|c| {
            let path = c.log_path.clone()?;
            Some((c.id.clone(), c.name.clone(), path))
        })
        .collect();

    let volumes = volumes.clone();
    let measured = tokio::task::spawn_blocking(move || {
        targets
            .into_iter()
            .map(|(id, name, path)| {
                let size = sizing::log_file_size(&path, &volumes);
                (id, name, path, size)
            })
            .collect::<Vec<(String, String, String, Result<u64, SizingError>)>>()
    })
    .await;

    let measured = match measured {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, operation = "log_sizes", "log size task join failed");
            return None;
        }
    };

    let mut logs = Vec::with_capacity(measured.len());
    for (container_id, container_name, path, size) in measured {
        match size {
            Ok(size) => {
                failed_logs.remove(&path);
                logs.push(LogFileInfo {
                    container_id,
                    container_name,
                    path,
                    size,
                    last_check: now_millis(),
                });
            }
            Err(e) => {
                if failed_logs.insert(path.clone()) {
                    tracing::warn!(
                        error = %e,
                        operation = "log_sizes",
                        container = %container_name,
                        path = %path,
                        "failed to size container log"
                    );
                }
            }
        }
    }
    Some(logs)
}

async fn refresh_host_disks(sysinfo: &SysinfoRepo, store: &Store, volumes: &[HostVolume]) {
    match sysinfo.host_disk_usage(volumes).await {
        Ok(usage) => {
            store.set_json(StoreKey::HostDiskUsage, &usage);
        }
        Err(e) => tracing::warn!(error = %e, operation = "host_disk_usage", "host disk usage failed"),
    }
}
