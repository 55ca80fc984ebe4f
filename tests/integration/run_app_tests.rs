use clap::Parser;
use dupelink::cli::Cli;
use dupelink::config::Config;
use dupelink::error::ExitCode;
use dupelink::lock::LOCK_FILE_NAME;
use dupelink::scanner::Algorithm;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["dupelink", "--quiet", "--no-color"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

fn config_file(dir: &Path) -> String {
    let path = dir.join("config.toml");
    fs::write(&path, "").unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
#[cfg(unix)]
fn test_run_app_links_and_writes_log() {
    use std::os::unix::fs::MetadataExt;

    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("one"), "abc").unwrap();
    fs::write(root.join("two"), "abc").unwrap();
    let log = dir.path().join("log.txt");
    let config = config_file(dir.path());

    let code = dupelink::run_app(cli(&[
        root.to_str().unwrap(),
        "--log-file",
        log.to_str().unwrap(),
        "--config",
        &config,
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        format!(
            "Duplicate: {} -> {}\n",
            root.join("two").display(),
            root.join("one").display()
        )
    );
    assert_eq!(
        fs::metadata(root.join("one")).unwrap().ino(),
        fs::metadata(root.join("two")).unwrap().ino()
    );
    assert!(!root.join(LOCK_FILE_NAME).exists());
}

#[test]
fn test_run_app_missing_root_is_fatal_and_keeps_log() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("log.txt");
    fs::write(&log, "previous run\n").unwrap();
    let config = config_file(dir.path());

    let missing = dir.path().join("missing");
    let err = dupelink::run_app(cli(&[
        missing.to_str().unwrap(),
        "--log-file",
        log.to_str().unwrap(),
        "--config",
        &config,
    ]))
    .unwrap_err();

    assert!(format!("{err:#}").contains("Path not found"));
    assert_eq!(fs::read_to_string(&log).unwrap(), "previous run\n");
}

#[test]
fn test_run_app_file_root_is_fatal() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    fs::write(&file, "x").unwrap();
    let config = config_file(dir.path());

    let err = dupelink::run_app(cli(&[
        file.to_str().unwrap(),
        "--log-file",
        dir.path().join("log.txt").to_str().unwrap(),
        "--config",
        &config,
    ]))
    .unwrap_err();

    assert!(format!("{err:#}").contains("Not a directory"));
}

#[test]
fn test_run_app_uncreatable_log_is_fatal() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), "same").unwrap();
    fs::write(root.join("b"), "same").unwrap();
    let config = config_file(dir.path());

    let result = dupelink::run_app(cli(&[
        root.to_str().unwrap(),
        "--log-file",
        dir.path().join("no/such/dir/log.txt").to_str().unwrap(),
        "--config",
        &config,
    ]));

    assert!(result.is_err());
    assert_eq!(fs::read_to_string(root.join("b")).unwrap(), "same");
    assert!(!root.join(LOCK_FILE_NAME).exists());
}

#[test]
fn test_run_app_held_lock_is_fatal() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join(LOCK_FILE_NAME), "12345\n").unwrap();
    let config = config_file(dir.path());

    let err = dupelink::run_app(cli(&[
        root.to_str().unwrap(),
        "--log-file",
        dir.path().join("log.txt").to_str().unwrap(),
        "--config",
        &config,
    ]))
    .unwrap_err();

    assert!(err.to_string().contains(LOCK_FILE_NAME));
    assert!(root.join(LOCK_FILE_NAME).exists());
}

#[test]
#[cfg(unix)]
fn test_run_app_dry_run_leaves_tree_alone() {
    use std::os::unix::fs::MetadataExt;

    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), "same").unwrap();
    fs::write(root.join("b"), "same").unwrap();
    let log = dir.path().join("log.txt");
    let config = config_file(dir.path());

    let code = dupelink::run_app(cli(&[
        root.to_str().unwrap(),
        "--dry-run",
        "--log-file",
        log.to_str().unwrap(),
        "--config",
        &config,
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(fs::read_to_string(&log).unwrap().starts_with("Would link: "));
    assert_ne!(
        fs::metadata(root.join("a")).unwrap().ino(),
        fs::metadata(root.join("b")).unwrap().ino()
    );
    assert!(!root.join(LOCK_FILE_NAME).exists());
}

#[test]
#[cfg(unix)]
fn test_run_app_log_inside_tree_is_not_scanned() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a"), "same").unwrap();
    fs::write(root.join("b"), "same").unwrap();
    let log = root.join("duplicate_log.txt");
    let config_dir = tempdir().unwrap();
    let config = config_file(config_dir.path());

    let code = dupelink::run_app(cli(&[
        root.to_str().unwrap(),
        "--log-file",
        log.to_str().unwrap(),
        "--config",
        &config,
        "--output",
        "json",
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let content = fs::read_to_string(&log).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with(&format!("Duplicate: {}", root.join("b").display())));
}

#[test]
fn test_run_app_saves_effective_config() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("data");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("a"), "same").unwrap();
    let log = dir.path().join("log.txt");
    let saved = dir.path().join("saved/config.toml");
    let config = config_file(dir.path());

    let code = dupelink::run_app(cli(&[
        root.to_str().unwrap(),
        "--log-file",
        log.to_str().unwrap(),
        "--config",
        &config,
        "--algorithm",
        "legacy",
        "--dry-run",
        "--save-config",
        saved.to_str().unwrap(),
    ]))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let loaded = Config::load(Some(&saved)).unwrap();
    assert_eq!(loaded.algorithm, Algorithm::Legacy);
    assert!(loaded.dry_run);
    assert_eq!(loaded.log_file, log);
}
