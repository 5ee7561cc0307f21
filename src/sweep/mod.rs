//! Stale branch sweep: look up the default branch, index open pull requests,
//! evaluate every branch, then delete the eligible ones unless running dry.

pub mod collector;
pub mod eligibility;
pub mod executor;
pub mod patterns;
pub mod pull_index;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::RetentionPolicy;
use crate::github::{GitHubError, RepositoryHost};

pub use collector::{collect_deletable, Collection, BRANCH_PAGE_SIZE};
pub use eligibility::{evaluate, Decision, EvaluationContext, SkipReason, Verdict};
pub use executor::{delete_branches, DeletionFailure};
pub use patterns::{glob_contains, starts_with_any, GlobList, PrefixList};
pub use pull_index::{PullRequestIndex, PULL_REQUEST_PAGE_SIZE};

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Failed to get default branch: {0}")]
    DefaultBranch(#[source] GitHubError),
    #[error("Failed to list open pull requests: {0}")]
    OpenPullRequests(#[source] GitHubError),
    #[error("Failed to delete branch `{branch}` after deleting {deleted}: {source}")]
    Deletion {
        branch: String,
        deleted: usize,
        #[source]
        source: GitHubError,
    },
    #[error("GitHub API quota exhausted, stopping")]
    QuotaExhausted(#[source] GitHubError),
}

impl SweepError {
    /// Wrap `err`, keeping quota exhaustion distinguishable from the stage.
    fn at_stage(err: GitHubError, stage: fn(GitHubError) -> SweepError) -> Self {
        if err.is_quota_exhausted() {
            SweepError::QuotaExhausted(err)
        } else {
            stage(err)
        }
    }

    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, SweepError::QuotaExhausted(_))
    }

    /// The remote error underneath, for troubleshooting hints.
    pub fn github_error(&self) -> &GitHubError {
        match self {
            SweepError::DefaultBranch(e)
            | SweepError::OpenPullRequests(e)
            | SweepError::QuotaExhausted(e) => e,
            SweepError::Deletion { source, .. } => source,
        }
    }
}

impl From<DeletionFailure> for SweepError {
    fn from(failure: DeletionFailure) -> Self {
        if failure.source.is_quota_exhausted() {
            return SweepError::QuotaExhausted(failure.source);
        }
        SweepError::Deletion {
            branch: failure.branch,
            deleted: failure.deleted,
            source: failure.source,
        }
    }
}

/// What a completed run found and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub default_branch: String,
    pub evaluated: usize,
    pub skipped: usize,
    pub truncated: bool,
    pub eligible: Vec<String>,
    pub deleted: usize,
    pub dry_run: bool,
}

/// Drives one sweep against a repository host.
pub struct Sweeper<'a> {
    host: &'a dyn RepositoryHost,
    policy: &'a RetentionPolicy,
    dry_run: bool,
}

impl<'a> Sweeper<'a> {
    pub fn new(host: &'a dyn RepositoryHost, policy: &'a RetentionPolicy, dry_run: bool) -> Self {
        Self {
            host,
            policy,
            dry_run,
        }
    }

    pub async fn run(&self) -> Result<SweepReport, SweepError> {
        self.run_at(Utc::now()).await
    }

    /// Run with `now` as the reference time for commit age.
    #[instrument(skip(self), fields(dry_run = self.dry_run))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
        let default_branch = self
            .host
            .default_branch()
            .await
            .map_err(|e| SweepError::at_stage(e, SweepError::DefaultBranch))?;
        info!(default_branch = %default_branch, "Resolved default branch");

        let pull_requests = PullRequestIndex::collect(self.host)
            .await
            .map_err(|e| SweepError::at_stage(e, SweepError::OpenPullRequests))?;

        let ctx = EvaluationContext {
            default_branch: &default_branch,
            pull_requests: &pull_requests,
            policy: self.policy,
            now,
        };
        let collection = collect_deletable(self.host, &ctx)
            .await
            .map_err(SweepError::QuotaExhausted)?;

        let mut report = SweepReport {
            default_branch: default_branch.clone(),
            evaluated: collection.evaluated,
            skipped: collection.skipped,
            truncated: collection.truncated,
            eligible: collection.eligible,
            deleted: 0,
            dry_run: self.dry_run,
        };

        if self.dry_run {
            info!(
                count = report.eligible.len(),
                "Dry run, would delete {} branches",
                report.eligible.len()
            );
            for branch in &report.eligible {
                info!(branch = %branch, "- {}", branch);
            }
            return Ok(report);
        }

        info!(
            count = report.eligible.len(),
            "Deleting {} branches now",
            report.eligible.len()
        );
        report.deleted = delete_branches(self.host, &report.eligible).await?;
        info!(deleted = report.deleted, "Branch deletion finished");
        Ok(report)
    }
}
