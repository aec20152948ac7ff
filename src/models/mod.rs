// Domain models: published snapshots and Docker domain types

mod bind_mount;
mod container;
mod daemon;
mod log_file;
mod storage;
mod volume;

pub use bind_mount::{BindMountInfo, BindMountsSnapshot};
pub use container::{ContainerListSnapshot, ContainerState, ContainerSummary, MountPoint};
pub use daemon::{
    BuildCacheUsage, DaemonEvent, DiskUsageInfo, ImageUsage, VersionInfo, VolumeUsage,
};
pub use log_file::{LogFileInfo, LogSizesSnapshot};
pub use storage::{HostDiskUsage, HostDiskUsageSnapshot, ScanProgress};
pub use volume::{HostVolume, VolumeParseError};

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
