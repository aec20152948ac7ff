// Bind mount models

use serde::{Deserialize, Serialize};

use crate::sizing::deduplicated_total;

/// One distinct bind-mount source path, shared by every container that mounts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindMountInfo {
    /// Source path as reported by the daemon.
    pub path: String,
    /// Apparent size in bytes (0 until prepared).
    pub size: u64,
    pub is_dir: bool,
    pub files: u64,
    pub read_only: bool,
    /// Unix time in milliseconds of the last discovery or size check.
    pub last_check: i64,
    /// Set once a size computation has been attempted.
    pub prepared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default)]
    pub containers: Vec<String>,
}

impl BindMountInfo {
    /// A freshly discovered mount: unsized and unprepared.
    pub fn discovered(path: impl Into<String>, read_only: bool, last_check: i64) -> Self {
        Self {
            path: path.into(),
            size: 0,
            is_dir: false,
            files: 0,
            read_only,
            last_check,
            prepared: false,
            err: None,
            containers: Vec::new(),
        }
    }
}

/// Published bind-mount list. The total is computed from the list on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindMountsSnapshot {
    bind_mounts: Vec<BindMountInfo>,
    total_size: u64,
}

impl BindMountsSnapshot {
    pub fn new(bind_mounts: Vec<BindMountInfo>) -> Self {
        let total_size = deduplicated_total(bind_mounts.iter().map(|m| (m.path.as_str(), m.size)));
        Self {
            bind_mounts,
            total_size,
        }
    }

    pub fn bind_mounts(&self) -> &[BindMountInfo] {
        &self.bind_mounts
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}
