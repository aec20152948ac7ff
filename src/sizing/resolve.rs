// Map daemon-side paths onto host volume roots

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use super::SizingError;
use crate::models::HostVolume;

/// Candidate host paths for `source`, one per volume, in volume order.
///
/// `namespace_prefix` (e.g. `/host_mnt` on Docker Desktop) is stripped first. A path
/// already under a volume root is used as is; otherwise it is joined under the root.
pub fn candidate_paths(source: &str, volumes: &[HostVolume], namespace_prefix: &str) -> Vec<PathBuf> {
    let stripped = strip_namespace(source, namespace_prefix);
    volumes
        .iter()
        .map(|vol| {
            let p = Path::new(stripped);
            if p.starts_with(&vol.path) {
                p.to_path_buf()
            } else {
                vol.path.join(stripped.trim_start_matches('/'))
            }
        })
        .collect()
}

fn strip_namespace<'a>(source: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return source;
    }
    match source.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => source,
    }
}

/// First candidate whose `stat` succeeds. When none does, the last stat error is returned.
pub fn resolve_on_volumes(
    source: &str,
    volumes: &[HostVolume],
    namespace_prefix: &str,
) -> Result<(PathBuf, Metadata), SizingError> {
    let mut last_err = SizingError::NoVolumes;
    for path in candidate_paths(source, volumes, namespace_prefix) {
        match std::fs::metadata(&path) {
            Ok(meta) => return Ok((path, meta)),
            Err(source) => last_err = SizingError::Stat { path, source },
        }
    }
    Err(last_err)
}
