//! Quota guard applied in front of every remote call.
//!
//! The guard never terminates the process itself. When headroom runs out it
//! answers with [`GitHubError::QuotaExhausted`], which every layer passes
//! upward untouched so the binary can stop the run with a success status.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::RepositoryHost;
use super::errors::GitHubError;
use super::types::{
    BranchRecord, CommitRecord, ListPage, PullRequestQuery, PullRequestRecord, RateLimitSnapshot,
};
use crate::observability::ApiCallMetrics;

/// Remaining/limit ratio at or below which the run stops.
pub const QUOTA_HEADROOM_THRESHOLD: f64 = 0.05;

/// Wraps a [`RepositoryHost`] and checks the core quota before each call.
pub struct RateGuarded<H> {
    inner: H,
    enabled: bool,
    metrics: Arc<ApiCallMetrics>,
}

impl<H: RepositoryHost> RateGuarded<H> {
    pub fn new(inner: H, enabled: bool, metrics: Arc<ApiCallMetrics>) -> Self {
        Self {
            inner,
            enabled,
            metrics,
        }
    }

    /// Re-evaluated on every call; remaining quota moves between requests.
    async fn ensure_quota(&self) -> Result<(), GitHubError> {
        if !self.enabled {
            return Ok(());
        }
        self.metrics.record_rate_check();

        let snapshot = match self.inner.rate_limit().await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_quota_exhausted() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Error fetching rate limit status, continuing");
                return Ok(());
            }
        };

        if is_exhausted(&snapshot) {
            self.metrics.record_rate_trip();
            warn!(
                remaining = snapshot.remaining,
                limit = snapshot.limit,
                "GitHub API rate limit close to being exceeded. Stopping execution."
            );
            return Err(GitHubError::QuotaExhausted {
                remaining: snapshot.remaining,
                limit: snapshot.limit,
            });
        }

        debug!(
            remaining = snapshot.remaining,
            limit = snapshot.limit,
            "Rate limit headroom ok"
        );
        Ok(())
    }
}

/// A zero limit carries no ratio and is treated as not exhausted.
pub fn is_exhausted(snapshot: &RateLimitSnapshot) -> bool {
    snapshot
        .headroom()
        .is_some_and(|ratio| ratio <= QUOTA_HEADROOM_THRESHOLD)
}

#[async_trait]
impl<H: RepositoryHost> RepositoryHost for RateGuarded<H> {
    async fn list_branches(
        &self,
        page: u32,
        per_page: u8,
    ) -> Result<ListPage<BranchRecord>, GitHubError> {
        self.ensure_quota().await?;
        self.inner.list_branches(page, per_page).await
    }

    async fn list_commits(
        &self,
        branch: &str,
        per_page: u8,
    ) -> Result<ListPage<CommitRecord>, GitHubError> {
        self.ensure_quota().await?;
        self.inner.list_commits(branch, per_page).await
    }

    async fn default_branch(&self) -> Result<String, GitHubError> {
        self.ensure_quota().await?;
        self.inner.default_branch().await
    }

    async fn list_pull_requests(
        &self,
        query: &PullRequestQuery,
    ) -> Result<ListPage<PullRequestRecord>, GitHubError> {
        self.ensure_quota().await?;
        self.inner.list_pull_requests(query).await
    }

    async fn delete_ref(&self, reference: &str) -> Result<(), GitHubError> {
        self.ensure_quota().await?;
        self.inner.delete_ref(reference).await
    }

    async fn rate_limit(&self) -> Result<RateLimitSnapshot, GitHubError> {
        self.ensure_quota().await?;
        self.inner.rate_limit().await
    }
}
