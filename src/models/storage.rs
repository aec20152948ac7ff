// Host storage models

use serde::{Deserialize, Serialize};

/// Usage of the filesystem backing one configured host volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDiskUsage {
    pub name: String,
    pub path: String,
    pub mount_point: String,
    pub file_system: String,
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub usage_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostDiskUsageSnapshot {
    pub volumes: Vec<HostDiskUsage>,
}

/// Bind-mount scan pass bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    /// Unix time in milliseconds when the pass started.
    pub start_time: i64,
    /// Milliseconds the pass took; 0 while it is running.
    pub duration: u64,
    pub completed: bool,
}

impl ScanProgress {
    pub fn started(start_time: i64) -> Self {
        Self {
            start_time,
            duration: 0,
            completed: false,
        }
    }

    pub fn finished(self, duration: u64) -> Self {
        Self {
            duration,
            completed: true,
            ..self
        }
    }
}
