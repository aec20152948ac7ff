// Deduplicated totals, host path resolution and bind-mount measurement

use doku::models::{BindMountInfo, BindMountsSnapshot, HostVolume};
use doku::sizing::{self, SizingError, deduplicated_total};
use std::fs;

#[test]
fn deduplicated_total_table() {
    let cases: Vec<(Vec<(&str, u64)>, u64)> = vec![
        (vec![], 0),
        (vec![("/a", 1000)], 1000),
        (vec![("/a", 0), ("/a/b", 10)], 10),
        (vec![("/a", 100), ("/a/b", 40), ("/a/b/c", 10)], 100),
        (vec![("/a/b", 100), ("/c/d", 40), ("/e/a/b", 10)], 150),
        (vec![("/a/b/c", 100), ("/a/b/e", 40), ("/a/b/e/d", 10)], 140),
        (
            vec![
                ("/a/b/c", 100),
                ("/a/b", 40),
                ("/a", 40),
                ("/d", 10),
                ("/d/e/f", 10),
                ("/d/f", 10),
                ("/x", 10),
                ("/y", 10),
                ("/z", 10),
            ],
            80,
        ),
    ];
    for (entries, want) in cases {
        assert_eq!(deduplicated_total(entries.clone()), want, "{entries:?}");
    }
}

#[test]
fn deduplicated_total_never_exceeds_plain_sum() {
    let entries = vec![
        ("/srv", 500),
        ("/srv/app", 200),
        ("/srv/app/cache", 50),
        ("/var/log", 70),
        ("/var/lib", 0),
        ("/home/me", 30),
    ];
    let plain: u64 = entries.iter().map(|(_, s)| s).sum();
    let total = deduplicated_total(entries.clone());
    assert!(total <= plain);
    assert_eq!(total, 600);
    // Order of input does not matter.
    let mut reversed = entries;
    reversed.reverse();
    assert_eq!(deduplicated_total(reversed), total);
}

#[test]
fn prefix_free_paths_total_equals_plain_sum() {
    let entries = vec![("/var/log", 70), ("/home/me", 30), ("/srv/a", 5), ("/opt", 0)];
    let plain: u64 = entries.iter().map(|(_, s)| s).sum();
    assert_eq!(deduplicated_total(entries), plain);
}

#[test]
fn deduplicated_total_is_repeatable() {
    let entries = vec![("/a", 100), ("/a/b", 40), ("/data", 10), ("/data2", 5), ("/x", 1)];
    let first = deduplicated_total(entries.clone());
    let second = deduplicated_total(entries);
    assert_eq!(first, second);
    assert_eq!(first, 111);
}

#[test]
fn snapshot_total_uses_deduplicated_rule() {
    let mut parent = BindMountInfo::discovered("/srv", false, 0);
    parent.size = 100;
    let mut child = BindMountInfo::discovered("/srv/app", false, 0);
    child.size = 40;
    let unmeasured = BindMountInfo::discovered("/opt", true, 0);
    let snapshot = BindMountsSnapshot::new(vec![child, parent, unmeasured]);
    assert_eq!(snapshot.total_size(), 100);
    assert_eq!(snapshot.bind_mounts().len(), 3);
}

#[test]
fn measure_directory_under_volume_root() {
    let root = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("srv/app/static")).unwrap();
    fs::write(root.path().join("srv/app/index.html"), vec![0u8; 100]).unwrap();
    fs::write(root.path().join("srv/app/static/app.js"), vec![0u8; 250]).unwrap();

    let volumes = vec![HostVolume::new("root", root.path())];
    let m = sizing::measure("/srv/app", &volumes, "/host_mnt").unwrap();
    assert!(m.is_dir);
    assert_eq!(m.size, 350);
    assert_eq!(m.files, 2);
}

#[test]
fn measure_single_file_with_namespace_prefix() {
    let root = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("Users/me")).unwrap();
    fs::write(root.path().join("Users/me/.env"), b"KEY=value\n").unwrap();

    let volumes = vec![HostVolume::new("root", root.path())];
    let m = sizing::measure("/host_mnt/Users/me/.env", &volumes, "/host_mnt").unwrap();
    assert!(!m.is_dir);
    assert_eq!(m.size, 10);
    assert_eq!(m.files, 1);
}

#[test]
fn measure_falls_through_to_next_volume() {
    let empty = tempfile::TempDir::new().unwrap();
    let data = tempfile::TempDir::new().unwrap();
    fs::create_dir(data.path().join("media")).unwrap();
    fs::write(data.path().join("media/a.bin"), vec![1u8; 64]).unwrap();

    let volumes = vec![
        HostVolume::new("root", empty.path()),
        HostVolume::new("data", data.path()),
    ];
    let m = sizing::measure("/media", &volumes, "").unwrap();
    assert_eq!(m.size, 64);
}

#[test]
fn measure_unresolvable_path_reports_stat_error() {
    let root = tempfile::TempDir::new().unwrap();
    let volumes = vec![HostVolume::new("root", root.path())];
    let err = sizing::measure("/does/not/exist", &volumes, "").unwrap_err();
    assert!(matches!(err, SizingError::Stat { .. }));
    assert!(err.to_string().contains("does/not/exist"));
}

#[test]
fn log_file_size_resolves_daemon_path() {
    let root = tempfile::TempDir::new().unwrap();
    let dir = root.path().join("var/lib/docker/containers/abc");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("abc-json.log"), vec![b'x'; 1234]).unwrap();

    let volumes = vec![HostVolume::new("root", root.path())];
    let size =
        sizing::log_file_size("/var/lib/docker/containers/abc/abc-json.log", &volumes).unwrap();
    assert_eq!(size, 1234);
}
