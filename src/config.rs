use serde::Deserialize;
use std::time::Duration;

use crate::models::HostVolume;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default = "default_volumes")]
    pub volumes: Vec<HostVolume>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// How long a `/v0/poll/...` request waits for fresh data before answering anyway.
    #[serde(default = "default_long_polling_timeout_secs")]
    pub long_polling_timeout_secs: u64,
    /// Grace period for background tasks on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Permissive CORS, for running the dashboard from a dev server.
    #[serde(default)]
    pub cors: bool,
}

fn default_long_polling_timeout_secs() -> u64 {
    30
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    /// `unix:///path/to/docker.sock` or `tcp://host:port`. Unset: `DOCKER_HOST` or the local socket.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_docker_timeout_secs")]
    pub timeout_secs: u64,
    /// Control socket path; never sized as a bind mount.
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout_secs: default_docker_timeout_secs(),
            socket_path: default_socket_path(),
        }
    }
}

fn default_docker_timeout_secs() -> u64 {
    120
}

fn default_socket_path() -> String {
    "/var/run/docker.sock".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Debounce tick: pending daemon events trigger at most one refresh per tick.
    #[serde(default = "default_short_interval_ms")]
    pub short_interval_ms: u64,
    /// Forced refresh interval; also the reconnect backoff for the event stream.
    #[serde(default = "default_long_interval_secs")]
    pub long_interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            short_interval_ms: default_short_interval_ms(),
            long_interval_secs: default_long_interval_secs(),
        }
    }
}

fn default_short_interval_ms() -> u64 {
    1000
}

fn default_long_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Pause after sizing each bind mount.
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,
    /// Pause between full passes.
    #[serde(default = "default_rescan_interval_secs")]
    pub rescan_interval_secs: u64,
    /// Env entry marking our own container; its mounts are skipped.
    #[serde(default = "default_self_marker")]
    pub self_marker: String,
    /// Prefix the container runtime adds to host paths (Docker Desktop: `/host_mnt`).
    #[serde(default = "default_mount_namespace_prefix")]
    pub mount_namespace_prefix: String,
    /// Glob patterns; matching bind-mount sources are not sized.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Skip mounts whose destination is under `/run/secrets/`.
    #[serde(default = "default_true")]
    pub skip_secrets: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            pace_ms: default_pace_ms(),
            rescan_interval_secs: default_rescan_interval_secs(),
            self_marker: default_self_marker(),
            mount_namespace_prefix: default_mount_namespace_prefix(),
            ignore_patterns: Vec::new(),
            skip_secrets: true,
        }
    }
}

fn default_pace_ms() -> u64 {
    1000
}

fn default_rescan_interval_secs() -> u64 {
    3600
}

fn default_self_marker() -> String {
    "DOKU_IN_DOCKER=1".into()
}

fn default_mount_namespace_prefix() -> String {
    "/host_mnt".into()
}

fn default_true() -> bool {
    true
}

fn default_volumes() -> Vec<HostVolume> {
    vec![HostVolume::new("root", "/hostroot")]
}

impl PollerConfig {
    pub fn short_interval(&self) -> Duration {
        Duration::from_millis(self.short_interval_ms)
    }

    pub fn long_interval(&self) -> Duration {
        Duration::from_secs(self.long_interval_secs)
    }
}

impl ScannerConfig {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_secs(self.rescan_interval_secs)
    }
}

impl AppConfig {
    /// Load from `$CONFIG_FILE` (default `config.toml`); `$VOLUMES` overrides the volume list.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("read config `{}`: {}", path, e))?;
        let mut config: AppConfig = toml::from_str(&s)?;
        if let Ok(volumes) = std::env::var("VOLUMES") {
            config.volumes = HostVolume::parse_list(&volumes)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.server.long_polling_timeout_secs > 0,
            "server.long_polling_timeout_secs must be > 0, got {}",
            self.server.long_polling_timeout_secs
        );
        anyhow::ensure!(
            self.docker.timeout_secs > 0,
            "docker.timeout_secs must be > 0, got {}",
            self.docker.timeout_secs
        );
        anyhow::ensure!(
            self.poller.short_interval_ms > 0,
            "poller.short_interval_ms must be > 0, got {}",
            self.poller.short_interval_ms
        );
        anyhow::ensure!(
            self.poller.long_interval_secs > 0,
            "poller.long_interval_secs must be > 0, got {}",
            self.poller.long_interval_secs
        );
        anyhow::ensure!(
            self.poller.short_interval() < self.poller.long_interval(),
            "poller.short_interval_ms must be shorter than poller.long_interval_secs"
        );
        anyhow::ensure!(
            self.scanner.rescan_interval_secs > 0,
            "scanner.rescan_interval_secs must be > 0, got {}",
            self.scanner.rescan_interval_secs
        );
        for pattern in &self.scanner.ignore_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                anyhow::anyhow!("scanner.ignore_patterns: invalid pattern `{}`: {}", pattern, e)
            })?;
        }
        anyhow::ensure!(!self.volumes.is_empty(), "volumes must not be empty");
        for vol in &self.volumes {
            anyhow::ensure!(!vol.name.is_empty(), "volumes: name must be non-empty");
            anyhow::ensure!(
                !vol.path.as_os_str().is_empty(),
                "volumes: path of `{}` must be non-empty",
                vol.name
            );
        }
        Ok(())
    }
}
