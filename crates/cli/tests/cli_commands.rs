use std::fs;
use std::path::Path;

use asmspy_core::fixtures::ManagedModuleBuilder;
use predicates::prelude::*;
use tempfile::tempdir;

fn diamond(dir: &Path) {
    ManagedModuleBuilder::new("A").reference("Foo", (1, 0)).write_to(dir.join("A.dll")).unwrap();
    ManagedModuleBuilder::new("B").reference("Foo", (1, 0)).write_to(dir.join("B.dll")).unwrap();
    ManagedModuleBuilder::new("C")
        .reference("Foo", (2, 0))
        .reference("Bar", (1, 0))
        .write_to(dir.join("C.exe"))
        .unwrap();
}

/// Conflicting references are listed with their referencers.
#[test]
fn reports_conflicting_reference() {
    let dir = tempdir().expect("tempdir");
    diamond(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("--path")
        .arg(dir.path())
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Check assemblies in:"))
        .stdout(predicate::str::contains("Detailing only conflicting assembly references."))
        .stdout(predicate::str::contains(
            "Reference: Foo\n   1.0.0.0 by A\n   1.0.0.0 by B\n   2.0.0.0 by C\n",
        ))
        .stdout(predicate::str::contains("Reference: Bar").not());
}

/// --all also lists references that resolve to a single version.
#[test]
fn all_flag_includes_consistent_references() {
    let dir = tempdir().expect("tempdir");
    diamond(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .args(["-a", "--no-color", "-p"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference: Bar\n   1.0.0.0 by C\n"))
        .stdout(predicate::str::contains("Detailing only").not());
}

#[test]
fn skip_system_hides_system_references() {
    let dir = tempdir().expect("tempdir");
    ManagedModuleBuilder::new("A")
        .reference("System.Net.Http", (4, 0))
        .write_to(dir.path().join("A.dll"))
        .unwrap();
    ManagedModuleBuilder::new("B")
        .reference("System.Net.Http", (4, 2))
        .write_to(dir.path().join("B.dll"))
        .unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference: System.Net.Http"));

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .args(["--skip-system", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference: System.Net.Http").not());
}

#[test]
fn subdirectories_are_scanned_only_with_recurse() {
    let dir = tempdir().expect("tempdir");
    ManagedModuleBuilder::new("Top").reference("Foo", (1, 0)).write_to(dir.path().join("Top.dll")).unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir_all(&plugins).unwrap();
    ManagedModuleBuilder::new("Plugin")
        .reference("Foo", (2, 0))
        .write_to(plugins.join("Plugin.dll"))
        .unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference: Foo").not());

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .args(["--subdirectories", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.0.0.0 by Plugin"));
}

#[test]
fn corrupt_module_is_reported_and_run_succeeds() {
    let dir = tempdir().expect("tempdir");
    diamond(dir.path());
    fs::write(dir.path().join("Broken.dll"), b"garbage").unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to load assembly"))
        .stdout(predicate::str::contains("Broken.dll"))
        .stdout(predicate::str::contains("Reference: Foo"));
}

#[test]
fn json_output_is_machine_readable() {
    let dir = tempdir().expect("tempdir");
    diamond(dir.path());

    let output = assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .args(["--json", "--threads", "2"])
        .output()
        .expect("run asmspy");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["modules_scanned"], 3);
    let results = report["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["assembly_name"], "Foo");
    assert_eq!(results[0]["versions"], serde_json::json!(["1.0.0.0", "2.0.0.0"]));
}

#[test]
fn missing_directory_fails() {
    let dir = tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn directory_without_modules_fails() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("notes.txt"), b"nothing here").unwrap();

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::starts_with("Check assemblies in:\n"))
        .stderr(predicate::str::contains("No dll files found"));
}

#[test]
fn missing_path_argument_is_a_usage_error() {
    assert_cmd::cargo::cargo_bin_cmd!("asmspy").assert().failure().code(2);
}

#[test]
fn unknown_flag_is_a_usage_error() {
    assert_cmd::cargo::cargo_bin_cmd!("asmspy").args(["-p", ".", "--bogus"]).assert().failure().code(2);
}

#[test]
fn zero_threads_is_rejected() {
    let dir = tempdir().expect("tempdir");
    diamond(dir.path());

    assert_cmd::cargo::cargo_bin_cmd!("asmspy")
        .arg("-p")
        .arg(dir.path())
        .args(["--threads", "0"])
        .assert()
        .failure()
        .code(2);
}
