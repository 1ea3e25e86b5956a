use std::fs;

use asmspy::{log_filter_for, resolve_scan_root};
use tempfile::tempdir;

#[test]
fn resolve_scan_root_canonicalizes_existing_directory() {
    let tmp = tempdir().expect("tempdir");
    let nested = tmp.path().join("bin");
    fs::create_dir_all(&nested).expect("create nested");

    let resolved = resolve_scan_root(nested.to_str().unwrap()).expect("resolve");
    assert!(resolved.is_absolute());
    assert_eq!(
        resolved.canonicalize().expect("canon resolved"),
        nested.canonicalize().expect("canon nested")
    );
}

#[test]
fn resolve_scan_root_keeps_missing_paths_absolute() {
    let resolved = resolve_scan_root("definitely/not/here").expect("resolve");
    assert!(resolved.is_absolute());
    assert!(resolved.ends_with("definitely/not/here"));
}

#[test]
fn log_filter_scales_with_verbosity() {
    assert_eq!(log_filter_for(0), "error");
    assert_eq!(log_filter_for(1), "info");
    assert_eq!(log_filter_for(2), "debug");
    assert_eq!(log_filter_for(9), "trace");
}
