use dupefind::duplicates::{DuplicateFinder, FinderConfig, FinderError};
use dupefind::scanner::{HashAlgorithm, WalkerConfig};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default()).unwrap()
}

fn names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();

    let (report, summary) = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content b");
    write(&dir.path().join("c.txt"), b"content c");

    let (report, summary) = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_hello_world() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"hello");
    write(&dir.path().join("b"), b"hello");
    write(&dir.path().join("c"), b"world");

    let (report, summary) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.len(), 1);
    let (key, set) = report.iter().next().unwrap();
    assert!(key.starts_with("blake3:"));
    assert_eq!(names(&set.paths()), vec!["a", "b"]);
    assert!(set.verified);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 5);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("top.bin"), b"nested duplicate");
    write(&dir.path().join("a/b/c/deep.bin"), b"nested duplicate");
    write(&dir.path().join("a/other.bin"), b"something else!!");

    let (report, _) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.len(), 1);
    let set = report.sets().next().unwrap();
    assert_eq!(names(&set.paths()), vec!["deep.bin", "top.bin"]);
}

#[test]
fn test_scan_multiple_groups() {
    let dir = tempdir().unwrap();
    for i in 0..3 {
        write(&dir.path().join(format!("x{i}")), b"group x content");
        write(&dir.path().join(format!("y{i}")), b"group y content");
    }

    let (report, summary) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(report.file_count(), 6);
    assert_eq!(summary.duplicate_files, 4);
}

#[test]
fn test_scan_paths_are_absolute() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("one"), b"same");
    write(&dir.path().join("two"), b"same");

    let (report, _) = finder().find_duplicates(dir.path()).unwrap();

    for set in report.sets() {
        for file in &set.files {
            assert!(file.path.is_absolute());
        }
    }
}

#[test]
fn test_scan_empty_files_are_duplicates() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("empty1"), b"");
    write(&dir.path().join("empty2"), b"");

    let (report, _) = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.sets().next().unwrap().size, 0);
}

#[test]
fn test_scan_exclude_patterns() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("keep1.dat"), b"payload");
    write(&dir.path().join("keep2.dat"), b"payload");
    write(&dir.path().join("skip.tmp"), b"payload");
    write(&dir.path().join("node_modules/lib.dat"), b"payload");

    let config = FinderConfig::default().with_walker_config(WalkerConfig::new(
        false,
        false,
        false,
        vec!["*.tmp".to_string(), "node_modules".to_string()],
    ));
    let finder = DuplicateFinder::new(config).unwrap();
    let (report, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(
        names(&report.sets().next().unwrap().paths()),
        vec!["keep1.dat", "keep2.dat"]
    );
}

#[test]
fn test_scan_hidden_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("visible"), b"shared");
    write(&dir.path().join(".hidden"), b"shared");
    write(&dir.path().join(".git/objects/blob"), b"shared");

    let (report, _) = finder().find_duplicates(dir.path()).unwrap();
    assert!(report.is_empty());

    let config = FinderConfig::default()
        .with_walker_config(WalkerConfig::new(true, false, false, Vec::new()));
    let (report, _) = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(report.file_count(), 3);
}

#[test]
fn test_scan_same_size_different_middle() {
    let dir = tempdir().unwrap();
    let mut a = vec![b'e'; 64 * 1024];
    let mut b = a.clone();
    a[32 * 1024] = b'a';
    b[32 * 1024] = b'b';
    write(&dir.path().join("a"), &a);
    write(&dir.path().join("b"), &b);

    let config = FinderConfig::default().with_partial_window(1024);
    let (report, summary) = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(summary.eliminated_by_partial, 0);
    assert_eq!(summary.eliminated_by_hash, 2);
}

#[test]
fn test_scan_no_hash_still_verifies() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"abcdef");
    write(&dir.path().join("b"), b"abXdef");
    write(&dir.path().join("c"), b"abcdef");

    let config = FinderConfig::default()
        .with_partial_window(2)
        .with_hash(false);
    let (report, summary) = DuplicateFinder::new(config)
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(report.len(), 1);
    let (key, set) = report.iter().next().unwrap();
    assert!(key.starts_with("size:"));
    assert_eq!(names(&set.paths()), vec!["a", "c"]);
    assert_eq!(summary.bytes_hashed, 0);
}

#[test]
fn test_scan_every_algorithm_agrees() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"alpha");
    write(&dir.path().join("b"), b"alpha");
    write(&dir.path().join("c"), b"gamma");
    write(&dir.path().join("d"), b"gamma");
    write(&dir.path().join("e"), b"delta");

    let baseline = finder().find_duplicates(dir.path()).unwrap().0.membership();
    for algorithm in HashAlgorithm::ALL {
        let config = FinderConfig::default().with_hash_algorithm(algorithm);
        let (report, _) = DuplicateFinder::new(config)
            .unwrap()
            .find_duplicates(dir.path())
            .unwrap();
        assert_eq!(report.membership(), baseline, "algorithm {algorithm}");
        for (key, _) in report.iter() {
            assert!(key.starts_with(&format!("{}:", algorithm.name())));
        }
    }
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        write(&dir.path().join(format!("f{i}")), format!("v{}", i % 3).as_bytes());
    }

    let first = finder().find_duplicates(dir.path()).unwrap().0;
    let second = finder().find_duplicates(dir.path()).unwrap().0;

    assert_eq!(first.membership(), second.membership());
}

#[test]
fn test_scan_parallel_matches_sequential() {
    let dir = tempdir().unwrap();
    for i in 0..40 {
        write(
            &dir.path().join(format!("f{i:02}")),
            format!("body-{}", i % 7).as_bytes(),
        );
    }

    let sequential = DuplicateFinder::new(FinderConfig::default().with_workers(1))
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap()
        .0;
    let parallel = DuplicateFinder::new(FinderConfig::default().with_workers(8))
        .unwrap()
        .find_duplicates(dir.path())
        .unwrap()
        .0;

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.len(), 7);
}

#[test]
fn test_scan_missing_root() {
    let dir = tempdir().unwrap();
    let result = finder().find_duplicates(&dir.path().join("missing"));
    assert!(matches!(result, Err(FinderError::PathNotFound(_))));
}

#[test]
fn test_scan_root_is_a_file() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file");
    write(&file, b"x");
    let result = finder().find_duplicates(&file);
    assert!(matches!(result, Err(FinderError::NotADirectory(_))));
}
