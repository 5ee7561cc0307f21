// Startup validation of the branch-sweeper binary: bad settings must fail
// before any request is made.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Binary running in an empty directory with a clean environment, so no
/// `.env`, config file or CI variables leak in.
fn sweeper(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("branch-sweeper").unwrap();
    cmd.current_dir(dir.path()).env_clear();
    cmd
}

#[test]
fn test_help_lists_flags() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--github-repo"))
        .stdout(predicate::str::contains("--ignore-branches"))
        .stdout(predicate::str::contains("--last-commit-age-days"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_invalid_repository_fails() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .args(["--github-repo", "not-a-slug", "--github-token", "t0ken"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid repository format 'not-a-slug'"));
}

#[test]
fn test_repository_from_environment_is_validated() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .env("GITHUB_REPOSITORY", "owner/repo/extra")
        .env("GITHUB_TOKEN", "t0ken")
        .assert()
        .failure()
        .stdout(predicate::str::contains("owner/repo/extra"));
}

#[test]
fn test_missing_token_fails() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .args(["--github-repo", "octo/widgets"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("GitHub token is required"));
}

#[test]
fn test_json_log_format() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .args(["--log-format", "json", "--github-repo", "bad"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"level\":\"ERROR\""));
}

#[test]
fn test_non_numeric_age_is_a_usage_error() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .args(["--last-commit-age-days", "soon"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--last-commit-age-days"));
}

#[test]
fn test_invalid_enterprise_url_fails() {
    let dir = TempDir::new().unwrap();

    sweeper(&dir)
        .args(["--github-repo", "octo/widgets", "--github-token", "t0ken"])
        .args(["--github-enterprise-url", "ghe.example.com"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid GitHub Enterprise URL"));
}
