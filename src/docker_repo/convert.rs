// bollard response types -> domain models

use bollard::models::{
    BuildCache, ContainerInspectResponse, EventMessage, ImageSummary, SystemDataUsageResponse,
    SystemVersion, Volume,
};
use serde::de::DeserializeOwned;

use crate::models::{
    BuildCacheUsage, ContainerState, ContainerSummary, DaemonEvent, DiskUsageInfo, ImageUsage,
    MountPoint, VersionInfo, VolumeUsage,
};

/// Component details are dropped; they are never published.
pub(super) fn version_info(v: SystemVersion) -> VersionInfo {
    VersionInfo {
        platform: v.platform.map(|p| p.name),
        version: v.version,
        api_version: v.api_version,
        min_api_version: v.min_api_version,
        os: v.os,
        arch: v.arch,
        kernel_version: v.kernel_version,
        go_version: v.go_version,
        git_commit: v.git_commit,
        build_time: v.build_time,
    }
}

/// Decode the untyped `Items` of one usage section. Items that fail to decode are
/// logged and skipped.
fn usage_items<T: DeserializeOwned>(
    items: Option<Vec<serde_json::Value>>,
    section: &str,
) -> Vec<T> {
    items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, section, "skipping undecodable disk usage item");
                None
            }
        })
        .collect()
}

/// The per-container section is dropped (containers are published separately).
pub(super) fn disk_usage_info(df: SystemDataUsageResponse) -> DiskUsageInfo {
    let (layers_size, image_items) = df
        .image_usage
        .map(|u| (u.total_size.unwrap_or(0), u.items))
        .unwrap_or((0, None));

    let images = usage_items::<ImageSummary>(image_items, "images")
        .into_iter()
        .map(|i| ImageUsage {
            id: i.id,
            repo_tags: i.repo_tags,
            created: i.created,
            size: i.size,
            shared_size: i.shared_size,
            containers: i.containers,
        })
        .collect();

    let volumes = usage_items::<Volume>(df.volume_usage.and_then(|u| u.items), "volumes")
        .into_iter()
        .map(|v| {
            let (size, ref_count) = v
                .usage_data
                .map_or((-1, -1), |u| (u.size, u.ref_count));
            VolumeUsage {
                name: v.name,
                driver: v.driver,
                mountpoint: v.mountpoint,
                size,
                ref_count,
            }
        })
        .collect();

    let build_cache =
        usage_items::<BuildCache>(df.build_cache_usage.and_then(|u| u.items), "build_cache")
            .into_iter()
            .map(|b| BuildCacheUsage {
                id: b.id.unwrap_or_default(),
                kind: b.typ.map(|t| t.to_string()).unwrap_or_default(),
                description: b.description.unwrap_or_default(),
                size: b.size.unwrap_or(0),
                in_use: b.in_use.unwrap_or(false),
                shared: b.shared.unwrap_or(false),
                usage_count: b.usage_count.unwrap_or(0),
            })
            .collect();

    DiskUsageInfo {
        layers_size,
        images,
        volumes,
        build_cache,
    }
}

pub(super) fn container_summary(c: ContainerInspectResponse) -> ContainerSummary {
    let id = c.id.unwrap_or_default();
    let name = c
        .name
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.clone());
    let state = c
        .state
        .and_then(|s| s.status)
        .map(|s| ContainerState::from_docker(&s.to_string()))
        .unwrap_or(ContainerState::Unknown);
    let (image, env) = c
        .config
        .map(|cfg| (cfg.image.unwrap_or_default(), cfg.env.unwrap_or_default()))
        .unwrap_or_default();
    let mounts = c
        .mounts
        .unwrap_or_default()
        .into_iter()
        .map(|m| MountPoint {
            kind: m.typ.map(|t| t.to_string()).unwrap_or_default(),
            source: m.source.unwrap_or_default(),
            destination: m.destination.unwrap_or_default(),
            read_only: m.rw.is_some_and(|rw| !rw),
        })
        .collect();

    ContainerSummary {
        id,
        name,
        image,
        state,
        mounts,
        env,
        log_path: c.log_path.filter(|p| !p.is_empty()),
        size_rw: c.size_rw,
        size_root_fs: c.size_root_fs,
    }
}

pub(super) fn daemon_event(e: EventMessage) -> DaemonEvent {
    DaemonEvent {
        kind: e.typ.map(|t| t.to_string()).unwrap_or_default(),
        action: e.action.unwrap_or_default(),
        actor_id: e.actor.and_then(|a| a.id),
    }
}
