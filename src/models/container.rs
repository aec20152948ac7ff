// Docker container models

use serde::{Deserialize, Serialize};

/// Docker container state; serializes to lowercase JSON (e.g. "running").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    #[serde(other)]
    Unknown,
}

impl ContainerState {
    /// Parse from Docker API state string (e.g. "running", "exited").
    pub fn from_docker(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "created" => ContainerState::Created,
            "running" => ContainerState::Running,
            "paused" => ContainerState::Paused,
            "restarting" => ContainerState::Restarting,
            "removing" => ContainerState::Removing,
            "exited" => ContainerState::Exited,
            "dead" => ContainerState::Dead,
            _ => ContainerState::Unknown,
        }
    }
}

/// A container mount as reported by inspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPoint {
    /// Mount type: "bind", "volume", "tmpfs", ...
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub destination: String,
    pub read_only: bool,
}

impl MountPoint {
    pub fn is_bind(&self) -> bool {
        self.kind == "bind"
    }
}

/// Inspected container, independent of the Docker client library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    pub mounts: Vec<MountPoint>,
    /// `KEY=value` pairs. Used for self-detection only and never published.
    #[serde(skip)]
    pub env: Vec<String>,
    pub log_path: Option<String>,
    pub size_rw: Option<i64>,
    pub size_root_fs: Option<i64>,
}

impl ContainerSummary {
    pub fn has_env(&self, entry: &str) -> bool {
        self.env.iter().any(|e| e == entry)
    }
}

/// Published container list. The total is the sum of writable-layer sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerListSnapshot {
    containers: Vec<ContainerSummary>,
    total_size: i64,
}

impl ContainerListSnapshot {
    pub fn new(containers: Vec<ContainerSummary>) -> Self {
        let total_size = containers.iter().filter_map(|c| c.size_rw).sum();
        Self {
            containers,
            total_size,
        }
    }

    pub fn containers(&self) -> &[ContainerSummary] {
        &self.containers
    }

    pub fn total_size(&self) -> i64 {
        self.total_size
    }
}
