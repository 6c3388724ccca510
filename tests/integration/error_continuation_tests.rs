use dupefind::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupefind::scanner::{FileError, FileRecord};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_find_duplicates_from_files_continues_on_error() {
    let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
    // Files that don't exist fail the size stage re-stat
    let file1 = FileRecord::new(PathBuf::from("nonexistent_1.txt"), 100);
    let file2 = FileRecord::new(PathBuf::from("nonexistent_2.txt"), 100);

    let (report, summary) = finder
        .find_duplicates_from_files(vec![file1, file2])
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.file_errors.len(), 2);
    assert!(summary.has_errors());

    for err in &summary.file_errors {
        match err {
            FileError::NotFound(_) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }
}

#[test]
fn test_failed_file_excluded_but_others_reported() {
    let dir = tempdir().unwrap();
    let q = dir.path().join("q");
    let r = dir.path().join("r");
    fs::write(&q, b"same bytes").unwrap();
    fs::write(&r, b"same bytes").unwrap();
    let gone = dir.path().join("gone");

    let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
    let (report, summary) = finder
        .find_duplicates_from_files(vec![
            FileRecord::new(gone.clone(), 10),
            FileRecord::new(q.clone(), 10),
            FileRecord::new(r.clone(), 10),
        ])
        .unwrap();

    assert_eq!(report.membership(), vec![vec![q, r]]);
    assert_eq!(summary.file_errors.len(), 1);
    assert_eq!(summary.file_errors[0].path(), gone.as_path());
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // Root ignores permission bits, so unreadable files are readable
    let probe = tempdir().unwrap();
    let path = probe.path().join("probe");
    fs::write(&path, b"x").unwrap();
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
    fs::File::open(&path).is_ok()
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped_with_skip_inaccessible() {
    use dupefind::scanner::WalkerConfig;
    use std::os::unix::fs::PermissionsExt;

    if running_as_root() {
        return;
    }

    let dir = tempdir().unwrap();
    let p = dir.path().join("p");
    fs::write(&p, b"identical").unwrap();
    fs::write(dir.path().join("q"), b"identical").unwrap();
    fs::write(dir.path().join("r"), b"identical").unwrap();
    fs::set_permissions(&p, fs::Permissions::from_mode(0o000)).unwrap();

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::new(false, false, true, Vec::new()));
    let (report, _) = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.len(), 1);
    let set = report.sets().next().unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.files.iter().all(|f| f.path.file_name().unwrap() != "p"));

    fs::set_permissions(&p, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_aborts_without_skip_inaccessible() {
    use std::os::unix::fs::PermissionsExt;

    if running_as_root() {
        return;
    }

    let dir = tempdir().unwrap();
    let p = dir.path().join("p");
    fs::write(&p, b"identical").unwrap();
    fs::write(dir.path().join("q"), b"identical").unwrap();
    fs::set_permissions(&p, fs::Permissions::from_mode(0o000)).unwrap();

    let result = DuplicateFinder::new(FinderConfig::default())
        .unwrap()
        .find_duplicates(dir.path());

    assert!(matches!(result, Err(FinderError::Scan(_))));

    fs::set_permissions(&p, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_listed_file_recorded_as_error() {
    use std::os::unix::fs::PermissionsExt;

    if running_as_root() {
        return;
    }

    let dir = tempdir().unwrap();
    let p = dir.path().join("p");
    let q = dir.path().join("q");
    let r = dir.path().join("r");
    for path in [&p, &q, &r] {
        fs::write(path, b"identical").unwrap();
    }
    fs::set_permissions(&p, fs::Permissions::from_mode(0o000)).unwrap();

    let (report, summary) = DuplicateFinder::new(FinderConfig::default())
        .unwrap()
        .find_duplicates_from_files(vec![
            FileRecord::new(p.clone(), 9),
            FileRecord::new(q.clone(), 9),
            FileRecord::new(r.clone(), 9),
        ])
        .unwrap();

    assert_eq!(report.membership(), vec![vec![q, r]]);
    assert!(matches!(
        summary.file_errors.as_slice(),
        [FileError::PermissionDenied(path)] if *path == p
    ));

    fs::set_permissions(&p, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_shutdown_before_scan_is_interrupted() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"x").unwrap();
    fs::write(dir.path().join("b"), b"x").unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let config = FinderConfig::default().with_shutdown_flag(flag);
    let result = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path());

    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[test]
fn test_invalid_configuration_rejected_before_io() {
    let result = DuplicateFinder::new(FinderConfig::default().with_workers(0));
    assert!(result.is_err());

    let result = DuplicateFinder::new(FinderConfig::default().with_chunk_size(0));
    assert!(result.is_err());
}
