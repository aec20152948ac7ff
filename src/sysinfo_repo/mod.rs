// Host filesystem usage via sysinfo

use crate::models::{HostDiskUsage, HostDiskUsageSnapshot, HostVolume};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::Disks;
use tracing::instrument;

/// One mounted filesystem, detached from sysinfo.
#[derive(Debug, Clone, PartialEq)]
pub struct MountedDisk {
    pub mount_point: PathBuf,
    pub name: String,
    pub file_system: String,
    pub total: u64,
    pub available: u64,
}

pub struct SysinfoRepo {
    disks: Arc<std::sync::Mutex<Disks>>,
}

impl Default for SysinfoRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoRepo {
    pub fn new() -> Self {
        Self {
            disks: Arc::new(std::sync::Mutex::new(Disks::new_with_refreshed_list())),
        }
    }

    /// Usage of the filesystem holding each volume root.
    #[instrument(skip(self, volumes), fields(repo = "sysinfo", operation = "host_disk_usage"))]
    pub async fn host_disk_usage(
        &self,
        volumes: &[HostVolume],
    ) -> anyhow::Result<HostDiskUsageSnapshot> {
        let disks = self.disks.clone();
        let volumes = volumes.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut disks_guard = disks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
            // Volumes may be mounted after startup.
            disks_guard.refresh(true);
            let mounted: Vec<MountedDisk> = disks_guard
                .list()
                .iter()
                .map(|d| MountedDisk {
                    mount_point: d.mount_point().to_path_buf(),
                    name: d.name().to_string_lossy().into_owned(),
                    file_system: d.file_system().to_string_lossy().into_owned(),
                    total: d.total_space(),
                    available: d.available_space(),
                })
                .collect();
            Ok(volume_usage(&volumes, &mounted))
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}

/// The disk with the longest mount point containing `path`.
pub fn disk_for_path<'a>(path: &Path, disks: &'a [MountedDisk]) -> Option<&'a MountedDisk> {
    disks
        .iter()
        .filter(|d| path.starts_with(&d.mount_point))
        .max_by_key(|d| d.mount_point.components().count())
}

/// Volumes whose root is on no known filesystem are left out.
pub fn volume_usage(volumes: &[HostVolume], disks: &[MountedDisk]) -> HostDiskUsageSnapshot {
    let volumes = volumes
        .iter()
        .filter_map(|vol| {
            let disk = disk_for_path(&vol.path, disks)?;
            let used = disk.total.saturating_sub(disk.available);
            let usage_percent = if disk.total > 0 {
                (used as f64 / disk.total as f64) * 100.0
            } else {
                0.0
            };
            Some(HostDiskUsage {
                name: vol.name.clone(),
                path: vol.path.to_string_lossy().into_owned(),
                mount_point: disk.mount_point.to_string_lossy().into_owned(),
                file_system: disk.file_system.clone(),
                total: disk.total,
                used,
                available: disk.available,
                usage_percent,
            })
        })
        .collect();
    HostDiskUsageSnapshot { volumes }
}
