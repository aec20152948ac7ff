// In-memory snapshot store shared by the poller, the scanner and the HTTP layer.
// Values are pre-serialized JSON; readers never deserialize or re-encode them.

mod waiter;

pub use waiter::{WaitHandle, WaitOutcome};

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tokio::time::Duration;
use waiter::WaitList;

/// Every value the store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    DockerVersion,
    DockerDiskUsage,
    ContainerList,
    LogSizes,
    BindMounts,
    ScanProgress,
    HostDiskUsage,
}

impl StoreKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StoreKey::DockerVersion => "dockerVersion",
            StoreKey::DockerDiskUsage => "dockerDiskUsage",
            StoreKey::ContainerList => "dockerContainerList",
            StoreKey::LogSizes => "dockerLogSize",
            StoreKey::BindMounts => "dockerBindMounts",
            StoreKey::ScanProgress => "scanProgress",
            StoreKey::HostDiskUsage => "hostDiskUsage",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-writer-wins key/value cache plus a broadcast used for long-polling.
#[derive(Debug, Default)]
pub struct Store {
    entries: RwLock<HashMap<StoreKey, Bytes>>,
    waiters: WaitList,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value for `key`.
    pub fn set(&self, key: StoreKey, value: impl Into<Bytes>) {
        let value = value.into();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Serialize `value` and store it. On failure the previous value is kept.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> bool {
        match serde_json::to_vec(value) {
            Ok(json) => {
                self.set(key, json);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "failed to encode as JSON; keeping previous value");
                false
            }
        }
    }

    pub fn get(&self, key: StoreKey) -> Option<Bytes> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    /// Register a waiter released by the next [`Store::notify_all`] or after `timeout`.
    ///
    /// Registration happens here, not when the handle is first polled.
    pub fn wait(&self, timeout: Duration) -> WaitHandle {
        self.waiters.register(timeout)
    }

    /// Release every currently registered waiter. Returns how many were released.
    pub fn notify_all(&self) -> usize {
        let released = self.waiters.notify_all();
        tracing::trace!(released, "store waiters notified");
        released
    }
}
