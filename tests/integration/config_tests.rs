use dupefind::config::Config;
use dupefind::error::ConfigError;
use dupefind::scanner::HashAlgorithm;
use figment::providers::Serialized;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.hash_type, "blake3");
    assert!(config.hash_enabled);
    assert!(config.verify_enabled);
    assert_eq!(config.workers, None);
}

#[test]
fn test_config_load_from_env() {
    // Only variables that cannot change scan results in concurrent tests
    std::env::set_var("DUPEFIND_WORKERS", "16");
    std::env::set_var("DUPEFIND_PARTIAL_WINDOW", "2048");

    use figment::{providers::Env, Figment};
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("DUPEFIND_").split("__"));

    let config: Config = figment.extract().unwrap();

    assert_eq!(config.workers, Some(16));
    assert_eq!(config.partial_window, 2048);

    std::env::remove_var("DUPEFIND_WORKERS");
    std::env::remove_var("DUPEFIND_PARTIAL_WINDOW");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
hash_type = "sha512"
block_size = 65536
skip_inaccessible = true
exclude = ["*.tmp", "target"]
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.hash_type, "sha512");
    assert_eq!(config.block_size, 65536);
    assert!(config.skip_inaccessible);
    assert_eq!(config.exclude, vec!["*.tmp", "target"]);

    let finder_config = config.finder_config().unwrap();
    assert_eq!(finder_config.hash_algorithm, HashAlgorithm::Sha512);
    assert!(finder_config.walker_config.skip_inaccessible);
}

#[test]
fn test_config_typo_in_file_gets_suggestion() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_type = \"blak3\"\n").unwrap();

    let config = Config::from_file(&config_path).unwrap();
    let err = config.finder_config().unwrap_err();

    assert!(matches!(err, ConfigError::UnknownHashAlgorithm { .. }));
    assert!(err.to_string().contains("did you mean 'blake3'?"));
}

#[test]
fn test_config_explicit_missing_file() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(ref p) if *p == missing));
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_type = [unclosed\n").unwrap();

    assert!(matches!(
        Config::from_file(&config_path),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_default_path_is_toml() {
    if let Some(path) = Config::default_path() {
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }
}
