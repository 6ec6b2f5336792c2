use std::path::Path;

use podlift_util::fs::{abs_path, ensure_dir, subdirs};

#[test]
fn ensure_dir_creates_nested() {
    let tmp = tempfile::tempdir().unwrap();
    let nested = tmp.path().join("a/b/c");
    ensure_dir(&nested).unwrap();
    assert!(nested.is_dir());
    // Idempotent.
    ensure_dir(&nested).unwrap();
}

#[test]
fn subdirs_skips_git_and_files_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("zeta")).unwrap();
    std::fs::create_dir(tmp.path().join("alpha")).unwrap();
    std::fs::create_dir(tmp.path().join(".git")).unwrap();
    std::fs::write(tmp.path().join("a-file"), "x").unwrap();

    let dirs = subdirs(tmp.path()).unwrap();
    let names: Vec<_> = dirs
        .iter()
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[test]
fn abs_path_keeps_absolute() {
    let p = Path::new("/tmp/somewhere");
    assert_eq!(abs_path(p), p);
    assert!(abs_path(Path::new("relative")).is_absolute());
}
