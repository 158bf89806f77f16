use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn pullwarden(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pullwarden").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_every_bot() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("conflicts"))
        .stdout(predicate::str::contains("label-rebase"))
        .stdout(predicate::str::contains("stale"));
}

#[test]
fn test_conflicts_help_shows_modes() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .args(["conflicts", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--pull-id"))
        .stdout(predicate::str::contains("--update-comments"))
        .stdout(predicate::str::contains("--scratch-dir"));
}

#[test]
fn test_malformed_slug_is_rejected() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .args(["--github-repo", "not-a-slug", "stale"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected owner/repo"));
}

#[test]
fn test_missing_repos_exit_with_error() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .args(["stale", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No repositories given"));
}

#[test]
fn test_invalid_config_file_exit_with_error() {
    let dir = TempDir::new().unwrap();
    let config = "[polling]\nmax_attempts = \"many\"\n";
    std::fs::write(dir.path().join("pullwarden.toml"), config).unwrap();
    pullwarden(&dir)
        .args(["--github-repo", "o/r", "label-rebase"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_help_lists_reviews_lock_and_init() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("reviews"))
        .stdout(predicate::str::contains("lock-archive"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_malformed_env_file_exit_with_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(".env"), "BROKEN=\"unterminated\n").unwrap();
    pullwarden(&dir)
        .args(["--github-repo", "o/r", "stale", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load .env file"));
}

#[test]
fn test_init_writes_config_once() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .args(["--github-repo", "bitcoin/bitcoin", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file: pullwarden.toml"));
    let written = std::fs::read_to_string(dir.path().join("pullwarden.toml")).unwrap();
    assert!(written.contains("bitcoin/bitcoin"));

    pullwarden(&dir)
        .arg("init")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Use --force to overwrite"));
}

#[test]
fn test_init_to_a_new_config_path() {
    let dir = TempDir::new().unwrap();
    pullwarden(&dir)
        .args(["--config", "custom.toml", "init"])
        .assert()
        .success();
    assert!(dir.path().join("custom.toml").is_file());
}
