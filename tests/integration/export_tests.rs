use clap::Parser;
use dupefind::cli::Cli;
use dupefind::duplicates::{DuplicateFinder, FinderConfig};
use dupefind::error::ExitCode;
use dupefind::output::{CsvOutput, TreeOutput};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn populate(dir: &Path) {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("a"), b"hello").unwrap();
    fs::write(data.join("b"), b"hello").unwrap();
    fs::write(data.join("c"), b"world").unwrap();
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["dupefind", "-q"];
    argv.extend_from_slice(args);
    dupefind::run_app(Cli::try_parse_from(argv).unwrap()).unwrap()
}

#[test]
fn test_csv_export_from_scan() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
    let (report, _) = finder.find_duplicates(&dir.path().join("data")).unwrap();
    let csv = CsvOutput::new(&report).to_string().unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "group,key,path,size,size_human");
    assert!(lines[1].starts_with("1,blake3:"));
    assert!(lines[1].ends_with("a,5,5 B"));
    assert!(lines[2].ends_with("b,5,5 B"));
}

#[test]
fn test_tree_export_from_scan() {
    let dir = tempdir().unwrap();
    populate(dir.path());

    let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
    let (report, _) = finder.find_duplicates(&dir.path().join("data")).unwrap();
    let text = TreeOutput::new(&report).render();

    assert!(text.starts_with("Group 1 (blake3:"));
    assert!(text.contains("├── "));
    assert!(text.contains("└── "));
    assert!(!text.contains("/c\n"));
}

#[test]
fn test_run_app_writes_csv_file() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let out = dir.path().join("report.csv");
    let data = dir.path().join("data");

    let code = run(&[
        "scan",
        data.to_str().unwrap(),
        "--hash-type",
        "sha256",
        "-o",
        out.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    let csv = fs::read_to_string(&out).unwrap();
    assert_eq!(csv.lines().count(), 3);
    // sha256("hello")
    assert!(csv.contains(
        "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    ));
}

#[test]
fn test_run_app_writes_tree_file() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let out = dir.path().join("report.txt");
    let data = dir.path().join("data");

    let code = run(&[
        "scan",
        data.to_str().unwrap(),
        "--format",
        "tree",
        "--output",
        out.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::Success);
    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Group 1 ("));
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn test_run_app_no_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only"), b"one file").unwrap();
    let out = dir.path().join("report.csv");

    let code = run(&[
        "scan",
        dir.path().to_str().unwrap(),
        "-e",
        "report.csv",
        "-o",
        out.to_str().unwrap(),
    ]);

    assert_eq!(code, ExitCode::NoDuplicates);
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "group,key,path,size,size_human\n"
    );
}

#[test]
fn test_run_app_missing_directory_is_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing");
    let cli = Cli::try_parse_from(["dupefind", "-q", "scan", missing.to_str().unwrap()]).unwrap();

    let err = dupefind::run_app(cli).unwrap_err();
    assert!(err.to_string().contains("Path not found"));
}

#[test]
fn test_run_app_missing_config_is_error() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let missing = dir.path().join("nope.toml");
    let cli = Cli::try_parse_from([
        "dupefind",
        "-q",
        "--config",
        missing.to_str().unwrap(),
        "scan",
        dir.path().join("data").to_str().unwrap(),
    ])
    .unwrap();

    let err = dupefind::run_app(cli).unwrap_err();
    assert!(format!("{err:#}").contains("Config file not found"));
}
