// Docker daemon access via bollard

mod convert;

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    DataUsageOptionsBuilder, EventsOptions, InspectContainerOptions, ListContainersOptions,
};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tracing::{instrument, warn};

use crate::config::DockerConfig;
use crate::models::{ContainerSummary, DaemonEvent, DiskUsageInfo, VersionInfo};

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker api: {0}")]
    Api(#[from] bollard::errors::Error),
    #[error("docker event stream closed")]
    StreamClosed,
    #[error("docker unavailable: {0}")]
    Unavailable(String),
}

/// Daemon events; errors are delivered in-band. Each call to [`DockerApi::events`]
/// is an independent subscription.
pub type EventStream = BoxStream<'static, Result<DaemonEvent, DockerError>>;

/// What the poller and the scanner need from the daemon. Shared by both loops.
#[async_trait]
pub trait DockerApi: Send + Sync {
    async fn server_version(&self) -> Result<VersionInfo, DockerError>;

    async fn disk_usage(&self) -> Result<DiskUsageInfo, DockerError>;

    /// Inspected containers (mounts, env, log path and sizes).
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, DockerError>;

    fn events(&self) -> EventStream;
}

pub struct DockerRepo {
    docker: Docker,
}

impl DockerRepo {
    /// Connect using bollard's defaults (`DOCKER_HOST` or the local socket).
    pub fn connect() -> anyhow::Result<Self> {
        let docker = Docker::connect_with_defaults()?;
        Ok(Self { docker })
    }

    /// Connect to `config.host` when set, otherwise fall back to [`DockerRepo::connect`].
    pub fn connect_with_config(config: &DockerConfig) -> anyhow::Result<Self> {
        let Some(host) = config.host.as_deref() else {
            return Self::connect();
        };
        let timeout = config.timeout_secs;
        let docker = if host.starts_with("unix://") {
            #[cfg(unix)]
            {
                Docker::connect_with_unix(host, timeout, bollard::API_DEFAULT_VERSION)?
            }
            #[cfg(not(unix))]
            {
                return Err(DockerError::Unavailable(format!(
                    "unix socket docker host `{host}` is not supported here"
                ))
                .into());
            }
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            Docker::connect_with_http(host, timeout, bollard::API_DEFAULT_VERSION)?
        } else {
            let reason = format!("unsupported docker host `{host}`");
            return Err(DockerError::Unavailable(reason).into());
        };
        Ok(Self { docker })
    }

    pub fn client_version(&self) -> String {
        self.docker.client_version().to_string()
    }
}

#[async_trait]
impl DockerApi for DockerRepo {
    #[instrument(skip(self), fields(repo = "docker", operation = "version"))]
    async fn server_version(&self) -> Result<VersionInfo, DockerError> {
        let v = self.docker.version().await?;
        Ok(convert::version_info(v))
    }

    #[instrument(skip(self), fields(repo = "docker", operation = "df"))]
    async fn disk_usage(&self) -> Result<DiskUsageInfo, DockerError> {
        let df = self
            .docker
            .df(Some(DataUsageOptionsBuilder::new().verbose(true).build()))
            .await?;
        Ok(convert::disk_usage_info(df))
    }

    #[instrument(skip(self), fields(repo = "docker", operation = "list_containers"))]
    async fn list_containers(
        &self,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, DockerError> {
        let options = ListContainersOptions {
            all: include_stopped,
            ..Default::default()
        };
        let listed = self.docker.list_containers(Some(options)).await?;

        let mut out = Vec::with_capacity(listed.len());
        for id in listed.into_iter().filter_map(|c| c.id) {
            let inspect = InspectContainerOptions { size: true };
            match self.docker.inspect_container(&id, Some(inspect)).await {
                Ok(details) => out.push(convert::container_summary(details)),
                // Removed between list and inspect; the next pass will not see it.
                Err(e) => warn!(error = %e, container = %id, "docker inspect_container failed"),
            }
        }
        Ok(out)
    }

    fn events(&self) -> EventStream {
        self.docker
            .events(None::<EventsOptions>)
            .map(|item| item.map(convert::daemon_event).map_err(DockerError::from))
            .boxed()
    }
}
