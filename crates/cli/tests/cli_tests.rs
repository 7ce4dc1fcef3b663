//! CLI integration tests
//!
//! Nothing listens on 127.0.0.1:9, so every fetch fails fast and the
//! commands exercise their URL-only paths.
use predicates::prelude::*;
use tempfile::TempDir;

const CHAPTER_URL: &str = "http://127.0.0.1:9/novel/chapter-12.html";

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("pagewalk")
}

#[test]
fn test_cli_help_lists_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("navigate"))
        .stdout(predicate::str::contains("book"));
}

#[test]
fn test_cli_detect_from_url() {
    cmd()
        .args(["detect", CHAPTER_URL, "--retries", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12"))
        .stdout(predicate::str::contains("chapter-{n}.html"));
}

#[test]
fn test_cli_detect_json() {
    let output = cmd().args(["detect", CHAPTER_URL, "--json"]).output().unwrap();
    assert!(output.status.success());

    let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["numeric_value"], 12);
    assert_eq!(info["source"], "url");
    assert_eq!(info["url_template"], "http://127.0.0.1:9/novel/chapter-{n}.html");
}

#[test]
fn test_cli_detect_unreachable_page_without_number() {
    cmd()
        .args(["detect", "http://127.0.0.1:9/about", "--retries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to detect a chapter"));
}

#[test]
fn test_cli_navigate_by_url_arithmetic() {
    cmd()
        .args(["navigate", CHAPTER_URL, "next", "--retries", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://127.0.0.1:9/novel/chapter-13.html"));
}

#[test]
fn test_cli_navigate_json() {
    let output = cmd()
        .args(["navigate", CHAPTER_URL, "prev", "--retries", "0", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["target_url"], "http://127.0.0.1:9/novel/chapter-11.html");
    assert_eq!(outcome["chapter"], 11);
    assert_eq!(outcome["tier"], "url_arithmetic");
}

#[test]
fn test_cli_navigate_before_zero_fails() {
    cmd()
        .args(["navigate", "http://127.0.0.1:9/novel/chapter-0.html", "previous", "--retries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No previous page found"));
}

#[test]
fn test_cli_navigate_rejects_unknown_direction() {
    cmd()
        .args(["navigate", CHAPTER_URL, "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sideways"));
}

#[test]
fn test_cli_extract_invalid_url() {
    cmd()
        .args(["extract", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid URL"));
}

#[test]
fn test_cli_extract_fetch_failure() {
    cmd()
        .args(["extract", CHAPTER_URL, "--retries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch"));
}

#[test]
fn test_cli_links_fetch_failure() {
    cmd()
        .args(["links", CHAPTER_URL, "--retries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to inspect"));
}

#[test]
fn test_cli_book_failure_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("book.txt");

    cmd()
        .args(["book", CHAPTER_URL, "--retries", "0", "-o", output.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to collect chapters"));

    assert!(!output.exists());
}

#[test]
fn test_cli_verbose_banner() {
    cmd()
        .args(["-v", "detect", CHAPTER_URL])
        .assert()
        .success()
        .stderr(predicate::str::contains("Pagewalk"));
}

#[test]
fn test_cli_completions() {
    cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pagewalk"));
}
