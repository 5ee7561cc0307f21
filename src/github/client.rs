use async_trait::async_trait;
use octocrab::params::repos::Reference;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::{Error as OctocrabError, Octocrab, Page};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use super::errors::GitHubError;
use super::types::{
    BranchRecord, CommitPayload, CommitRecord, ListPage, PullRequestPayload, PullRequestQuery,
    PullRequestRecord, RateLimitPayload, RateLimitSnapshot, RepositoryPayload,
};
use crate::config::RepoSlug;
use crate::observability::{ApiCallMetrics, ApiOperation};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Remote capabilities the sweeper needs from a repository host.
///
/// Implemented by [`GitHubClient`] for real runs and by the rate guard as a
/// decorator; tests substitute a mock.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// One page of the repository's branches, in remote order.
    async fn list_branches(&self, page: u32, per_page: u8)
        -> Result<ListPage<BranchRecord>, GitHubError>;

    /// The most recent commits reachable from `branch`, newest first.
    async fn list_commits(&self, branch: &str, per_page: u8)
        -> Result<ListPage<CommitRecord>, GitHubError>;

    async fn default_branch(&self) -> Result<String, GitHubError>;

    async fn list_pull_requests(
        &self,
        query: &PullRequestQuery,
    ) -> Result<ListPage<PullRequestRecord>, GitHubError>;

    /// Delete a fully qualified reference such as `refs/heads/stale`.
    async fn delete_ref(&self, reference: &str) -> Result<(), GitHubError>;

    async fn rate_limit(&self) -> Result<RateLimitSnapshot, GitHubError>;
}

#[derive(Debug, Serialize)]
struct PageParams {
    per_page: u8,
    page: u32,
}

#[derive(Debug, Serialize)]
struct CommitParams<'a> {
    sha: &'a str,
    per_page: u8,
}

/// Octocrab-backed GitHub REST client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
    metrics: Arc<ApiCallMetrics>,
}

impl GitHubClient {
    /// Build an authenticated client. `base_url` points at the REST root,
    /// e.g. `https://api.github.com/` or `https://ghe.example.com/api/v3/`.
    pub fn new(
        token: &str,
        base_url: &str,
        slug: &RepoSlug,
        metrics: Arc<ApiCallMetrics>,
    ) -> Result<Self, GitHubError> {
        let octocrab = Octocrab::builder()
            .personal_token(token.to_string())
            .base_uri(base_url)
            .map_err(|e| GitHubError::ClientBuild(e.to_string()))?
            .add_retry_config(RetryConfig::None)
            .build()
            .map_err(|e| GitHubError::ClientBuild(e.to_string()))?;

        Ok(Self::from_octocrab(octocrab, slug, metrics))
    }

    pub fn from_octocrab(
        octocrab: Octocrab,
        slug: &RepoSlug,
        metrics: Arc<ApiCallMetrics>,
    ) -> Self {
        Self {
            octocrab,
            owner: slug.owner.clone(),
            repo: slug.name.clone(),
            metrics,
        }
    }

    fn repo_route(&self, suffix: &str) -> String {
        format!("/repos/{}/{}{}", self.owner, self.repo, suffix)
    }

    fn track<T>(
        &self,
        operation: ApiOperation,
        result: Result<T, OctocrabError>,
    ) -> Result<T, GitHubError> {
        self.metrics.record_request(operation);
        result.map_err(|e| {
            self.metrics.record_error();
            GitHubError::Api(e)
        })
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn list_branches(
        &self,
        page: u32,
        per_page: u8,
    ) -> Result<ListPage<BranchRecord>, GitHubError> {
        debug!(page, per_page, "Listing branches");
        let params = PageParams { per_page, page };
        let result = self
            .octocrab
            .get::<Page<BranchRecord>, _, _>(self.repo_route("/branches"), Some(&params))
            .await;
        let page = self.track(ApiOperation::ListBranches, result)?;
        let next_page = next_page_number(page.next.as_ref().and_then(|uri| uri.query()));

        Ok(ListPage {
            items: page.items,
            next_page,
        })
    }

    async fn list_commits(
        &self,
        branch: &str,
        per_page: u8,
    ) -> Result<ListPage<CommitRecord>, GitHubError> {
        debug!(branch, "Listing latest commits");
        let params = CommitParams {
            sha: branch,
            per_page,
        };
        let result = self
            .octocrab
            .get::<Page<CommitPayload>, _, _>(self.repo_route("/commits"), Some(&params))
            .await;
        let page = self.track(ApiOperation::ListCommits, result)?;
        let next_page = next_page_number(page.next.as_ref().and_then(|uri| uri.query()));

        Ok(ListPage {
            items: page.items.into_iter().map(CommitRecord::from).collect(),
            next_page,
        })
    }

    async fn default_branch(&self) -> Result<String, GitHubError> {
        let result = self
            .octocrab
            .get::<RepositoryPayload, _, _>(self.repo_route(""), None::<&()>)
            .await;
        let repository = self.track(ApiOperation::GetRepository, result)?;

        repository
            .default_branch
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                GitHubError::InvalidResponse(format!(
                    "repository {}/{} has no default branch",
                    self.owner, self.repo
                ))
            })
    }

    async fn list_pull_requests(
        &self,
        query: &PullRequestQuery,
    ) -> Result<ListPage<PullRequestRecord>, GitHubError> {
        debug!(?query, "Listing pull requests");
        let result = self
            .octocrab
            .get::<Page<PullRequestPayload>, _, _>(self.repo_route("/pulls"), Some(query))
            .await;
        let page = self.track(ApiOperation::ListPullRequests, result)?;
        let next_page = next_page_number(page.next.as_ref().and_then(|uri| uri.query()));

        Ok(ListPage {
            items: page
                .items
                .into_iter()
                .map(PullRequestRecord::from)
                .collect(),
            next_page,
        })
    }

    async fn delete_ref(&self, reference: &str) -> Result<(), GitHubError> {
        let branch = reference
            .strip_prefix(BRANCH_REF_PREFIX)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GitHubError::InvalidReference(reference.to_string()))?;

        let result = self
            .octocrab
            .repos(&self.owner, &self.repo)
            .delete_ref(&Reference::Branch(branch.to_string()))
            .await;
        self.track(ApiOperation::DeleteRef, result)
    }

    async fn rate_limit(&self) -> Result<RateLimitSnapshot, GitHubError> {
        let result = self
            .octocrab
            .get::<RateLimitPayload, _, _>("/rate_limit", None::<&()>)
            .await;
        let payload = self.track(ApiOperation::RateLimit, result)?;
        Ok(payload.into())
    }
}

/// Extract the `page` parameter from the query of a `Link: rel="next"` URL.
pub(crate) fn next_page_number(query: Option<&str>) -> Option<u32> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// Fully qualified ref path for a branch name.
pub fn branch_ref(branch: &str) -> String {
    format!("{BRANCH_REF_PREFIX}{branch}")
}
