use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

#[allow(deprecated)]
fn captioner(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("captioner").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("CAPTIONER_STORE")
        .env_remove("CAPTIONER_REMOTE")
        .env_remove("CAPTIONER_CONFIG")
        .env("RUST_LOG", "warn");
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = captioner(workdir)
        .args(args)
        .arg("--json")
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn captions(workdir: &Path) -> Vec<String> {
    run_json(workdir, &["list"])
        .as_array()
        .expect("array")
        .iter()
        .map(|item| item["caption"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Workspace with a dataset directory already imported into captions.json
fn setup_collection() -> TempDir {
    let temp = tempdir().unwrap();
    let data = temp.path().join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("01.png"), b"one").unwrap();
    fs::write(data.join("01.txt"), b"cat, sitting, indoors").unwrap();
    fs::write(data.join("02.png"), b"two").unwrap();
    fs::write(data.join("02.txt"), b"dog, sitting").unwrap();
    fs::write(data.join("03.jpg"), b"three").unwrap();
    fs::write(data.join("04.txt"), b"orphan").unwrap();

    let imported = run_json(temp.path(), &["import", "data"]);
    assert_eq!(imported["added"], 3);
    assert_eq!(imported["captioned"], 2);
    assert_eq!(imported["orphan_captions"][0], "04.txt");
    temp
}

#[test]
fn import_builds_ranked_tag_index() {
    let temp = setup_collection();
    assert!(temp.path().join("captions.json").exists());

    let tags = run_json(temp.path(), &["tags"]);
    assert_eq!(tags[0]["tag"], "sitting");
    assert_eq!(tags[0]["count"], 2);
    assert_eq!(tags[1]["tag"], "cat");

    let stats = run_json(temp.path(), &["stats"]);
    assert_eq!(stats["progress"]["total"], 3);
    assert_eq!(stats["progress"]["captioned"], 2);
}

#[test]
fn importing_twice_adds_nothing() {
    let temp = setup_collection();
    let again = run_json(temp.path(), &["import", "data"]);
    assert_eq!(again["added"], 0);
    assert_eq!(again["already_present"], 3);
}

#[test]
fn bulk_edit_requires_confirmation_when_not_interactive() {
    let temp = setup_collection();

    captioner(temp.path())
        .args(["delete-tag", "sitting"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert_eq!(captions(temp.path())[0], "cat, sitting, indoors");

    captioner(temp.path())
        .args(["delete-tag", "sitting", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Modified 2 captions"));
    assert_eq!(
        captions(temp.path()),
        vec!["cat, indoors", "dog", ""]
    );
}

#[test]
fn dry_run_reports_without_writing() {
    let temp = setup_collection();
    let dry = run_json(
        temp.path(),
        &["rename-tag", "sitting", "seated", "--dry-run"],
    );
    assert_eq!(dry["eligible"], 2);
    assert_eq!(dry["would_modify"], 2);
    assert_eq!(captions(temp.path())[1], "dog, sitting");
}

#[test]
fn regex_replace_and_invalid_pattern() {
    let temp = setup_collection();

    let report = run_json(
        temp.path(),
        &["replace", "--regex", r"(\w+), sitting", "$1 sitting", "--yes"],
    );
    assert_eq!(report["modified_count"], 2);
    assert_eq!(captions(temp.path())[1], "dog sitting");

    captioner(temp.path())
        .args(["replace", "--regex", "cat (", "dog", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid regular expression"));
}

#[test]
fn insert_is_idempotent_with_if_absent() {
    let temp = setup_collection();
    for _ in 0..2 {
        run_json(
            temp.path(),
            &["insert", "cat", "fluffy", "--if-absent", "--yes"],
        );
    }
    assert_eq!(captions(temp.path())[0], "fluffy cat, sitting, indoors");
}

#[test]
fn literal_insert_ignores_case_unless_asked() {
    let temp = setup_collection();
    captioner(temp.path())
        .args(["insert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ignoring case"));

    run_json(temp.path(), &["insert", "CAT", "big", "--yes"]);
    assert_eq!(captions(temp.path())[0], "big cat, sitting, indoors");

    let dry = run_json(
        temp.path(),
        &["insert", "DOG", "big", "--case-sensitive", "--dry-run"],
    );
    assert_eq!(dry["eligible"], 0);
}

#[test]
fn nothing_found_is_not_an_error() {
    let temp = setup_collection();
    captioner(temp.path())
        .args(["delete-tag", "unicorn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No captions contain the target"));
}

#[test]
fn matches_lists_tagged_items_in_order() {
    let temp = setup_collection();
    let found = run_json(temp.path(), &["matches", "sitting"]);
    let matches = found["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["ordinal"], 1);
    assert_eq!(matches[1]["total"], 2);

    let third = run_json(temp.path(), &["matches", "sitting", "--at", "3"]);
    assert_eq!(third["matches"][0]["ordinal"], 1);

    let none = run_json(temp.path(), &["matches", "unicorn"]);
    assert!(none["matches"].as_array().unwrap().is_empty());
}

#[test]
fn export_writes_pairs_and_skips_blank_captions() {
    let temp = setup_collection();
    let summary = run_json(temp.path(), &["export", "out"]);
    assert_eq!(summary["images_written"], 3);
    assert_eq!(summary["captions_written"], 2);

    let out = temp.path().join("out");
    assert_eq!(fs::read(out.join("03.jpg")).unwrap(), b"three");
    assert_eq!(
        fs::read_to_string(out.join("02.txt")).unwrap(),
        "dog, sitting"
    );
    assert!(!out.join("03.txt").exists());
}

#[test]
fn remove_and_clear() {
    let temp = setup_collection();
    let items = run_json(temp.path(), &["list"]);
    let first_id = items[0]["id"].as_str().unwrap().to_string();

    let removed = run_json(temp.path(), &["remove", &first_id, "--yes"]);
    assert_eq!(removed["removed"], true);

    let cleared = run_json(temp.path(), &["clear", "--yes"]);
    assert_eq!(cleared["cleared"], 2);
    assert!(run_json(temp.path(), &["tags"]).as_array().unwrap().is_empty());
}

#[test]
fn invalid_config_is_rejected() {
    let temp = setup_collection();
    fs::write(temp.path().join("engine.toml"), "write_concurrency = 0\n").unwrap();

    captioner(temp.path())
        .args(["--config", "engine.toml", "tags"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("write_concurrency"));
}
