use dupelink::dedup::{DedupEngine, EngineConfig};
use dupelink::report::MemorySink;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[cfg(unix)]
fn inode(path: &Path) -> u64 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path).unwrap().ino()
}

#[test]
#[cfg(unix)]
fn test_unicode_and_space_names() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("фото 1.jpg");
    let b = dir.path().join("写真 copy.jpg");
    fs::write(&a, b"jpeg bytes").unwrap();
    fs::write(&b, b"jpeg bytes").unwrap();

    let mut sink = MemorySink::new();
    let summary = DedupEngine::new(EngineConfig::default())
        .run(dir.path(), &mut sink)
        .unwrap();

    assert_eq!(summary.duplicates_linked, 1);
    assert_eq!(inode(&a), inode(&b));
    assert!(sink.lines[0].contains("写真 copy.jpg") || sink.lines[0].contains("фото 1.jpg"));
}

#[test]
#[cfg(unix)]
fn test_deeply_nested_duplicate() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("a/b/c/d/e/f/g");
    fs::create_dir_all(&deep).unwrap();
    fs::write(dir.path().join("top"), "needle").unwrap();
    fs::write(deep.join("bottom"), "needle").unwrap();

    let mut sink = MemorySink::new();
    let summary = DedupEngine::new(EngineConfig::default())
        .run(dir.path(), &mut sink)
        .unwrap();

    assert_eq!(summary.directories, 7);
    assert_eq!(inode(&dir.path().join("top")), inode(&deep.join("bottom")));
    assert_eq!(
        sink.lines,
        vec![format!(
            "Duplicate: {} -> {}",
            dir.path().join("a/b/c/d/e/f/g/bottom").display(),
            dir.path().join("top").display()
        )]
    );
}

#[test]
#[cfg(unix)]
fn test_symlinked_directory_not_followed() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real");
    fs::create_dir(&real).unwrap();
    fs::write(real.join("f"), "x").unwrap();
    std::os::unix::fs::symlink(&real, dir.path().join("alias")).unwrap();

    let mut sink = MemorySink::new();
    let summary = DedupEngine::new(EngineConfig::default())
        .run(dir.path(), &mut sink)
        .unwrap();

    assert_eq!(summary.files_scanned, 1);
    assert_eq!(summary.skipped_symlinks, 1);
    assert!(sink.lines.is_empty());
}

#[test]
#[cfg(unix)]
fn test_hidden_files_skipped_when_requested() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), "dup").unwrap();
    fs::write(dir.path().join("visible"), "dup").unwrap();

    let mut config = EngineConfig::default();
    config.walker.skip_hidden = true;
    let mut sink = MemorySink::new();
    let summary = DedupEngine::new(config).run(dir.path(), &mut sink).unwrap();

    assert_eq!(summary.files_scanned, 1);
    assert_ne!(
        inode(&dir.path().join(".hidden")),
        inode(&dir.path().join("visible"))
    );
}

#[test]
fn test_empty_root() {
    let dir = tempdir().unwrap();
    let mut sink = MemorySink::new();
    let summary = DedupEngine::new(EngineConfig::default())
        .run(dir.path(), &mut sink)
        .unwrap();

    assert_eq!(summary.files_scanned, 0);
    assert_eq!(summary.directories, 0);
    assert!(sink.lines.is_empty());
}
