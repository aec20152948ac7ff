// HTTP routes over the snapshot store

mod http;

use axum::{Router, extract::State, middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::store::{Store, StoreKey};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<Store>,
    pub(crate) config: AppConfig,
}

/// Snapshot routes, relative to `/v0` and `/v0/poll`.
const SNAPSHOT_ROUTES: [(&str, StoreKey); 7] = [
    ("/disk-usage", StoreKey::HostDiskUsage),
    ("/docker/version", StoreKey::DockerVersion),
    ("/docker/containers", StoreKey::ContainerList),
    ("/docker/disk-usage", StoreKey::DockerDiskUsage),
    ("/docker/log-size", StoreKey::LogSizes),
    ("/docker/bind-mounts", StoreKey::BindMounts),
    ("/docker/scan-progress", StoreKey::ScanProgress),
];

pub fn app(store: Arc<Store>, config: AppConfig) -> Router {
    let cors = config.server.cors;
    let state = AppState { store, config };

    let snapshots = SNAPSHOT_ROUTES
        .iter()
        .fold(Router::new(), |router, &(path, key)| {
            router.route(
                path,
                get(move |state: State<AppState>| http::snapshot_handler(state, key)),
            )
        });
    // Same snapshots, answered after the next store update (or the long-poll timeout).
    let long_poll = snapshots
        .clone()
        .layer(middleware::from_fn_with_state(state.clone(), http::long_poll));

    let router = Router::new()
        .route("/v0/version", get(http::version_handler)) // GET /v0/version
        .nest("/v0", snapshots)
        .nest("/v0/poll", long_poll);
    let router = if cors {
        router.layer(CorsLayer::new().allow_origin(Any))
    } else {
        router
    };
    router.with_state(state)
}
