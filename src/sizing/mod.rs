// Size helpers: deduplicated totals, directory walks and host path resolution.
// Everything here is blocking; async callers go through spawn_blocking.

mod resolve;

pub use resolve::{candidate_paths, resolve_on_volumes};

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::HostVolume;

#[derive(Debug, thiserror::Error)]
pub enum SizingError {
    #[error("no host volumes configured")]
    NoVolumes,
    #[error("stat `{}`: {source}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("walk `{}`: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Size of a resolved file or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub size: u64,
    pub files: u64,
    pub is_dir: bool,
}

/// Sum of sizes where a path prefixed by an already counted path is not counted again.
///
/// Zero-size entries are ignored. Paths are sorted as strings; an entry counts only if
/// it does not start with the last counted path, and then becomes the last counted one.
/// Equal paths count once. The prefix test is textual, so `/data2` falls under `/data`.
pub fn deduplicated_total<'a, I>(entries: I) -> u64
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut sized: Vec<(&str, u64)> = entries.into_iter().filter(|(_, size)| *size > 0).collect();
    sized.sort_by(|a, b| a.0.cmp(b.0));

    let mut last: Option<&str> = None;
    let mut total = 0u64;
    for (path, size) in sized {
        if last.is_some_and(|prev| path.starts_with(prev)) {
            continue;
        }
        total = total.saturating_add(size);
        last = Some(path);
    }
    total
}

/// Apparent size and regular-file count of a directory tree. Symlinks are not followed.
pub fn dir_size(path: &Path) -> Result<(u64, u64), SizingError> {
    let mut size = 0u64;
    let mut files = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|source| SizingError::Walk {
            path: path.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let meta = entry.metadata().map_err(|source| SizingError::Walk {
            path: entry.path().to_path_buf(),
            source,
        })?;
        size = size.saturating_add(meta.len());
        files += 1;
    }
    Ok((size, files))
}

/// Resolve a daemon-reported path on the host volumes and measure it.
pub fn measure(
    source: &str,
    volumes: &[HostVolume],
    namespace_prefix: &str,
) -> Result<Measurement, SizingError> {
    let (path, meta) = resolve_on_volumes(source, volumes, namespace_prefix)?;
    measure_resolved(&path, &meta)
}

fn measure_resolved(path: &Path, meta: &Metadata) -> Result<Measurement, SizingError> {
    if meta.is_dir() {
        let (size, files) = dir_size(path)?;
        Ok(Measurement {
            size,
            files,
            is_dir: true,
        })
    } else {
        Ok(Measurement {
            size: meta.len(),
            files: 1,
            is_dir: false,
        })
    }
}

/// Size of a container log file reported by the daemon, resolved on the host volumes.
pub fn log_file_size(log_path: &str, volumes: &[HostVolume]) -> Result<u64, SizingError> {
    let (_, meta) = resolve_on_volumes(log_path, volumes, "")?;
    Ok(meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_paths_count_once() {
        assert_eq!(deduplicated_total([("/a", 10), ("/a", 10)]), 10);
    }

    #[test]
    fn sibling_with_shared_name_prefix_counts_as_nested() {
        assert_eq!(deduplicated_total([("/data", 10), ("/data2", 5)]), 10);
        assert_eq!(deduplicated_total([("/a", 100), ("/a-c", 5), ("/a/b", 3)]), 100);
    }

    #[test]
    fn sorting_is_by_string_not_by_component() {
        // "/a-c" < "/a/b" as strings, so "/a/b" is compared against "/a-c".
        assert_eq!(deduplicated_total([("/a-c", 5), ("/a/b", 3)]), 8);
    }

    #[test]
    fn dir_size_counts_nested_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("x/y/b.txt"), b"world!").unwrap();
        assert_eq!(dir_size(dir.path()).unwrap(), (11, 2));
    }

    #[test]
    fn dir_size_of_missing_path_is_an_error() {
        let err = dir_size(Path::new("/the-wrong-path")).unwrap_err();
        assert!(matches!(err, SizingError::Walk { .. }));
    }
}
