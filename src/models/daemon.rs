// Docker daemon metadata: version, disk usage, events

use serde::{Deserialize, Serialize};

/// Event types that can change disk usage. Everything else is ignored by the poller.
const SIGNIFICANT_EVENT_TYPES: [&str; 5] = ["builder", "container", "image", "volume", "service"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub platform: Option<String>,
    pub version: Option<String>,
    pub api_version: Option<String>,
    pub min_api_version: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub kernel_version: Option<String>,
    pub go_version: Option<String>,
    pub git_commit: Option<String>,
    pub build_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUsage {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub created: i64,
    pub size: i64,
    pub shared_size: i64,
    pub containers: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeUsage {
    pub name: String,
    pub driver: String,
    pub mountpoint: String,
    /// -1 when the daemon did not compute it.
    pub size: i64,
    pub ref_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildCacheUsage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub size: i64,
    pub in_use: bool,
    pub shared: bool,
    pub usage_count: i64,
}

/// `docker system df` without the per-container list. Lists are never null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskUsageInfo {
    pub layers_size: i64,
    pub images: Vec<ImageUsage>,
    pub volumes: Vec<VolumeUsage>,
    pub build_cache: Vec<BuildCacheUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonEvent {
    /// Event type, e.g. "container".
    pub kind: String,
    /// Event action, e.g. "start", "resize".
    pub action: String,
    pub actor_id: Option<String>,
}

impl DaemonEvent {
    pub fn new(kind: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            action: action.into(),
            actor_id: None,
        }
    }

    pub fn is_significant(&self) -> bool {
        SIGNIFICANT_EVENT_TYPES.contains(&self.kind.as_str())
    }
}
