// Full runs of the branch-sweeper binary against a mock GitHub Enterprise API.

use assert_cmd::prelude::*;
use chrono::{TimeDelta, Utc};
use predicates::prelude::*;
use serde_json::json;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_ROOT: &str = "/api/v3";
const REPO_PATH: &str = "/api/v3/repos/octo/widgets";

/// Run the binary with default log settings in a clean directory and
/// environment, off the async runtime so the mock server keeps serving.
async fn run_sweeper(server: &MockServer, extra_args: &[&str]) -> Output {
    let mut args = vec![
        "--github-repo".to_string(),
        "octo/widgets".to_string(),
        "--github-token".to_string(),
        "t0ken".to_string(),
        "--github-enterprise-url".to_string(),
        server.uri(),
    ];
    args.extend(extra_args.iter().map(|arg| arg.to_string()));

    tokio::task::spawn_blocking(move || {
        let dir = TempDir::new().unwrap();
        Command::cargo_bin("branch-sweeper")
            .unwrap()
            .current_dir(dir.path())
            .env_clear()
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

async fn mount_rate_limit(server: &MockServer, limit: u64, remaining: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/rate_limit")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": { "core": { "limit": limit, "remaining": remaining } }
        })))
        .mount(server)
        .await;
}

async fn mount_repository_with_branches(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(REPO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "default_branch": "main"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/pulls")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/branches")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "main", "protected": true },
            { "name": "feature-x", "protected": false },
            { "name": "release-old", "protected": false }
        ])))
        .mount(server)
        .await;

    let committed = (Utc::now() - TimeDelta::days(40)).to_rfc3339();
    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/commits")))
        .and(query_param("sha", "release-old"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "sha": "c0ffee",
            "commit": { "committer": { "date": committed } }
        }])))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_skip_reasons_visible_at_default_level() {
    let server = MockServer::start().await;
    mount_rate_limit(&server, 5000, 4900).await;
    mount_repository_with_branches(&server).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let args = [
        "--allowed-prefixes",
        "release-",
        "--last-commit-age-days",
        "30",
        "--dry-run",
    ];
    let output = run_sweeper(&server, &args).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Skipping `main`: it is the default branch"))
        .stdout(predicate::str::contains(
            "Skipping `feature-x`: does not match allowed prefixes",
        ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dry_run_lists_each_candidate() {
    let server = MockServer::start().await;
    mount_rate_limit(&server, 5000, 4900).await;
    mount_repository_with_branches(&server).await;

    let output = run_sweeper(&server, &["--last-commit-age-days", "30", "--dry-run"]).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run, would delete 1 branches"))
        .stdout(predicate::str::contains("- release-old"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_live_run_announces_deletions() {
    let server = MockServer::start().await;
    mount_rate_limit(&server, 5000, 4900).await;
    mount_repository_with_branches(&server).await;
    Mock::given(method("DELETE"))
        .and(path(format!("{REPO_PATH}/git/refs/heads/release-old")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_sweeper(&server, &["--allowed-prefixes", "release-"]).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleting 1 branches now"))
        .stdout(predicate::str::contains("Deleted branch `release-old`"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exhausted_quota_exits_successfully() {
    let server = MockServer::start().await;
    mount_rate_limit(&server, 100, 3).await;
    Mock::given(method("GET"))
        .and(path(REPO_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{REPO_PATH}/branches")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let output = run_sweeper(&server, &[]).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopping early to preserve API quota"));
}
