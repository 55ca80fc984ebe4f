use dupelink::cli::OutputFormat;
use dupelink::config::{Config, ConfigError};
use dupelink::scanner::Algorithm;
use figment::providers::Serialized;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.log_file, PathBuf::from("duplicate_log.txt"));
    assert!(config.lock);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPELINK_MAX_INDEX_ENTRIES", "4096");
    std::env::set_var("DUPELINK_SKIP_HIDDEN", "true");

    use figment::{providers::Env, Figment};
    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("DUPELINK_"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.max_index_entries, Some(4096));
    assert!(config.skip_hidden);

    std::env::remove_var("DUPELINK_MAX_INDEX_ENTRIES");
    std::env::remove_var("DUPELINK_SKIP_HIDDEN");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
algorithm = "legacy"
verify = true
min_size = 4096
ignore_patterns = ["*.tmp", "cache/"]
output = "json"
log_file = "/var/log/dupelink.txt"
lock = false
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.algorithm, Algorithm::Legacy);
    assert!(config.verify);
    assert_eq!(config.min_size, Some(4096));
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "cache/"]);
    assert_eq!(config.output, OutputFormat::Json);
    assert_eq!(config.log_file, PathBuf::from("/var/log/dupelink.txt"));
    assert!(!config.lock);
}

#[test]
fn test_config_save_roundtrip() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested/config.toml");

    let config = Config {
        algorithm: Algorithm::Legacy,
        max_size: Some(1_000_000),
        ignore_patterns: vec!["*.iso".to_string()],
        ..Config::default()
    };
    config.save(&config_path).unwrap();

    let saved_content = fs::read_to_string(&config_path).unwrap();
    assert!(saved_content.contains("algorithm = \"legacy\""));
    assert!(saved_content.contains("max_size = 1000000"));

    use figment::{
        providers::{Format, Toml},
        Figment,
    };
    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "invalid = toml").unwrap();

    let result = Config::load(Some(&config_path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_config_wrong_type_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "algorithm = \"md5\"\n").unwrap();

    assert!(Config::load(Some(&config_path)).is_err());
}
