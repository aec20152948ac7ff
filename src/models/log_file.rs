// Container log file models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileInfo {
    pub container_id: String,
    pub container_name: String,
    /// Log path as reported by the daemon (not the resolved host path).
    pub path: String,
    pub size: u64,
    pub last_check: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSizesSnapshot {
    logs: Vec<LogFileInfo>,
    total_size: u64,
}

impl LogSizesSnapshot {
    pub fn new(logs: Vec<LogFileInfo>) -> Self {
        let total_size = logs.iter().map(|l| l.size).sum();
        Self { logs, total_size }
    }

    pub fn logs(&self) -> &[LogFileInfo] {
        &self.logs
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}
