use anyhow::Result;
use doku::*;
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let docker_repo = docker_repo::DockerRepo::connect_with_config(&app_config.docker)?;
    tracing::info!(
        name = version::NAME,
        version = version::VERSION,
        docker_api = %docker_repo.client_version(),
        volumes = app_config.volumes.len(),
        "starting"
    );

    let docker: Arc<dyn docker_repo::DockerApi> = Arc::new(docker_repo);
    let store = Arc::new(store::Store::new());
    let volumes: Arc<[models::HostVolume]> = app_config.volumes.clone().into();
    let cancel = CancellationToken::new();

    let poller_handle = poller::Poller::new(
        poller::PollerDeps {
            docker: docker.clone(),
            sysinfo: Arc::new(sysinfo_repo::SysinfoRepo::new()),
            store: store.clone(),
            volumes: volumes.clone(),
        },
        app_config.poller.clone(),
    )
    .spawn(cancel.clone());

    let filter = scanner::MountFilter::from_config(&app_config.scanner, &app_config.docker.socket_path)?;
    let scanner_handle = scanner::BindMountScanner::new(
        scanner::ScannerDeps {
            docker,
            store: store.clone(),
            volumes,
        },
        app_config.scanner.clone(),
        filter,
    )
    .spawn(cancel.clone());

    let app = routes::app(store.clone(), app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let shutdown = {
        let cancel = cancel.clone();
        let store = store.clone();
        async move {
            shutdown_signal().await;
            tracing::info!("Received shutdown signal");
            cancel.cancel();
            // Release long-pollers so the server can drain.
            store.notify_all();
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    // Reached on server error too; stop the background loops either way.
    cancel.cancel();
    let grace = Duration::from_secs(app_config.server.shutdown_timeout_secs);
    let joined = tokio::time::timeout(grace, async {
        let _ = tokio::join!(poller_handle, scanner_handle);
    })
    .await;
    if joined.is_err() {
        tracing::warn!(
            timeout_secs = app_config.server.shutdown_timeout_secs,
            "background tasks did not stop in time"
        );
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
