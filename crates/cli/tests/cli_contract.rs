use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn id(n: u8) -> String {
    format!("00000000-0000-4000-8000-0000000000{n:02}")
}

fn run_ok(config: &Path, args: &[&str], snapshot: Option<&str>) -> String {
    let mut cmd = cargo_bin_cmd!("layerview");
    cmd.env("LAYERVIEW_CONFIG_DIR", config).args(args);
    if let Some(name) = snapshot {
        cmd.arg(fixture(name));
    }

    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("stdout should be utf8")
}

fn order_ids(stdout: &str) -> Vec<String> {
    let value: Value = serde_json::from_str(stdout).expect("stdout should contain valid json");
    value
        .as_array()
        .expect("order output is an array")
        .iter()
        .map(|entry| entry["id"].as_str().expect("id is a string").to_owned())
        .collect()
}

#[test]
fn order_sorts_by_page_then_rotated_top() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let stdout = run_ok(temp.path(), &["order"], Some("review.json"));

    assert_eq!(order_ids(&stdout), vec![id(2), id(6), id(1), id(5), id(4), id(3)]);

    let value: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(value[0]["page"], 1);
    assert_eq!(value[0]["effective_top"], 20.0);
    assert_eq!(value[4]["effective_top"], 30.0);
    assert_eq!(value[5]["effective_top"], 170.0);
}

#[test]
fn order_takes_page_geometry_from_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = fixture("review.pdf");
    let stdout = run_ok(
        temp.path(),
        &["order", "--pdf", pdf.to_str().expect("utf8 path")],
        Some("review.json"),
    );

    assert_eq!(order_ids(&stdout), vec![id(1), id(5), id(2), id(6), id(3), id(4)]);
}

#[test]
fn missing_pages_are_zero_sized_unless_strict() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let stdout = run_ok(temp.path(), &["order"], Some("missing-page.json"));
    assert_eq!(order_ids(&stdout), vec![id(9)]);

    cargo_bin_cmd!("layerview")
        .env("LAYERVIEW_CONFIG_DIR", temp.path())
        .arg("order")
        .arg(fixture("missing-page.json"))
        .arg("--strict-pages")
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 9 not found (page_count=1)"));
}

#[test]
fn stored_reject_policy_applies_without_flag() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    run_ok(temp.path(), &["prefs", "set", "--missing-page", "reject"], None);

    cargo_bin_cmd!("layerview")
        .env("LAYERVIEW_CONFIG_DIR", temp.path())
        .arg("order")
        .arg(fixture("missing-page.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to order annotations"));
}

#[test]
fn consolidate_civil_layer_as_csv() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let stdout =
        run_ok(temp.path(), &["consolidate", "--layer", "Civil"], Some("review.json"));

    insta::assert_snapshot!("consolidate_civil_csv", stdout);
}

#[test]
fn consolidate_writes_json_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("out").join("consolidated.json");

    let stdout = run_ok(
        temp.path(),
        &[
            "consolidate",
            "--format",
            "json",
            "--output",
            output_path.to_str().expect("utf8 path"),
        ],
        Some("review.json"),
    );
    assert!(stdout.contains("consolidated.json"));

    let bytes = std::fs::read(&output_path).expect("export file should exist");
    let value: Value = serde_json::from_slice(&bytes).expect("valid json");
    assert_eq!(value["count"], 4);

    let ids: Vec<&str> = value["annotations"]
        .as_array()
        .expect("annotations array")
        .iter()
        .map(|annotation| annotation["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, vec![id(1), id(5), id(4), id(3)]);
}

#[test]
fn notes_report_for_all_layers() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let stdout = run_ok(temp.path(), &["notes"], Some("review.json"));

    insta::assert_snapshot!("notes_all_layers", stdout);
}

#[test]
fn notes_respect_layer_filter() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let stdout = run_ok(temp.path(), &["notes", "--layer", "Civil"], Some("review.json"));

    assert!(stdout.contains("Subject: Beam"));
    assert!(stdout.contains("Subject: Slab"));
    assert!(!stdout.contains("Electrical"));
    assert!(!stdout.contains("Mechanical"));
}

#[test]
fn info_emits_page_metadata() {
    let output = cargo_bin_cmd!("layerview")
        .arg("info")
        .arg(fixture("review.pdf"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["page_count"], 2);
    assert_eq!(value["pages"][0]["width"], 100.0);
    assert_eq!(value["pages"][0]["height"], 200.0);
    assert_eq!(value["pages"][0]["rotation"], 2);
    assert_eq!(value["pages"][1]["width"], 300.0);
    assert_eq!(value["pages"][1]["rotation"], 0);
}

#[test]
fn info_fails_for_missing_file() {
    cargo_bin_cmd!("layerview")
        .arg("info")
        .arg(fixture("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    cargo_bin_cmd!("layerview")
        .arg("info")
        .arg(fixture("invalid.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    cargo_bin_cmd!("layerview")
        .arg("info")
        .arg(fixture("encrypted-marker.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn prefs_set_persists_between_runs() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    run_ok(
        temp.path(),
        &["prefs", "set", "--role", "Civil", "--layer", "Electrical", "--missing-page", "reject"],
        None,
    );
    assert!(temp.path().join("preferences.json").exists());

    let stdout = run_ok(temp.path(), &["prefs", "show"], None);
    let value: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(value["current_role"], "Civil");
    assert_eq!(value["missing_page"], "reject");
    assert_eq!(value["roles"].as_array().map(Vec::len), Some(3));
}

#[test]
fn prefs_set_rejects_unknown_role() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("layerview")
        .env("LAYERVIEW_CONFIG_DIR", temp.path())
        .args(["prefs", "set", "--role", "Plumbing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown role Plumbing"));
}

#[test]
fn prefs_set_rejects_unknown_layer() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("layerview")
        .env("LAYERVIEW_CONFIG_DIR", temp.path())
        .args(["prefs", "set", "--layer", "Plumbing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unknown layer Plumbing; expected all or one of: Mechanical, Civil, Electrical",
        ));
    assert!(!temp.path().join("preferences.json").exists());

    run_ok(temp.path(), &["prefs", "set", "--layer", "all"], None);
    assert!(temp.path().join("preferences.json").exists());
}

#[test]
fn missing_snapshot_is_reported() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("layerview")
        .env("LAYERVIEW_CONFIG_DIR", temp.path())
        .arg("notes")
        .arg(fixture("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("layerview")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", env!("CARGO_PKG_VERSION"))));
}
