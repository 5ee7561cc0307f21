//! Per-branch retention decision.
//!
//! Rules run in a fixed order and stop at the first one that keeps the
//! branch. Every rule is an independent AND-condition, so the order only
//! decides which reason gets reported. Remote failures while evaluating one
//! branch turn into a skip for that branch; only quota exhaustion escapes.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use super::pull_index::PullRequestIndex;
use crate::config::RetentionPolicy;
use crate::github::{BranchRecord, GitHubError, RepositoryHost};

/// Why a branch is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    DefaultBranch,
    Protected,
    IgnoredBranch,
    NotAllowedPrefix,
    IgnoredPrefix,
    CommitLookupFailed(String),
    TooRecent { days: u32 },
    OpenPullRequest,
    BaseCheckFailed(String),
    PullRequestBase,
}

impl SkipReason {
    /// Whether the skip came from a failed lookup rather than a rule.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SkipReason::CommitLookupFailed(_) | SkipReason::BaseCheckFailed(_)
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DefaultBranch => write!(f, "it is the default branch"),
            SkipReason::Protected => write!(f, "it is a protected branch"),
            SkipReason::IgnoredBranch => write!(f, "it is in the list of ignored branches"),
            SkipReason::NotAllowedPrefix => write!(f, "does not match allowed prefixes"),
            SkipReason::IgnoredPrefix => write!(f, "does match ignored prefixes"),
            SkipReason::CommitLookupFailed(err) => write!(f, "{err}"),
            SkipReason::TooRecent { days } => {
                write!(f, "last commit is newer than {days} days")
            }
            SkipReason::OpenPullRequest => write!(f, "has open pull requests"),
            SkipReason::BaseCheckFailed(err) => write!(
                f,
                "error checking if branch is a base for a pull request - {err}"
            ),
            SkipReason::PullRequestBase => write!(f, "is the base for a pull request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Delete,
    Skip(SkipReason),
}

/// Outcome of evaluating one branch. Logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub branch: String,
    pub decision: Decision,
}

impl Verdict {
    fn delete(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            decision: Decision::Delete,
        }
    }

    fn skip(branch: &str, reason: SkipReason) -> Self {
        Self {
            branch: branch.to_string(),
            decision: Decision::Skip(reason),
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.decision == Decision::Delete
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match &self.decision {
            Decision::Skip(reason) => Some(reason),
            Decision::Delete => None,
        }
    }
}

/// Shared, read-only inputs for evaluating every branch of a run.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub default_branch: &'a str,
    pub pull_requests: &'a PullRequestIndex,
    pub policy: &'a RetentionPolicy,
    /// Reference time for commit age
    pub now: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum CommitLookupError {
    #[error("no commits found in branch {0}")]
    NoCommits(String),
    #[error("latest commit {sha} in branch {branch} has no committer date")]
    MissingDate { branch: String, sha: String },
    #[error(transparent)]
    Remote(#[from] GitHubError),
}

/// Committer timestamp of the newest commit on `branch`.
pub async fn latest_commit_date(
    host: &dyn RepositoryHost,
    branch: &str,
) -> Result<DateTime<Utc>, CommitLookupError> {
    let page = host.list_commits(branch, 1).await?;
    let commit = page
        .items
        .into_iter()
        .next()
        .ok_or_else(|| CommitLookupError::NoCommits(branch.to_string()))?;

    commit
        .committed_at
        .ok_or_else(|| CommitLookupError::MissingDate {
            branch: branch.to_string(),
            sha: commit.sha,
        })
}

/// Rules 1-5: decidable from the listing and the policy alone.
fn check_static_rules(branch: &BranchRecord, ctx: &EvaluationContext<'_>) -> Option<SkipReason> {
    let name = branch.name.as_str();
    let policy = ctx.policy;

    if name == ctx.default_branch {
        return Some(SkipReason::DefaultBranch);
    }
    if branch.protected {
        return Some(SkipReason::Protected);
    }
    if policy.ignore_branches.matches(name) {
        return Some(SkipReason::IgnoredBranch);
    }
    if !policy.allowed_prefixes.is_empty() && !policy.allowed_prefixes.matches(name) {
        return Some(SkipReason::NotAllowedPrefix);
    }
    if !policy.ignored_prefixes.is_empty() && policy.ignored_prefixes.matches(name) {
        return Some(SkipReason::IgnoredPrefix);
    }
    None
}

/// Run the full rule chain for one branch.
///
/// Independent of every other branch's verdict; evaluating the same branch
/// against the same remote state always gives the same answer.
pub async fn evaluate(
    host: &dyn RepositoryHost,
    branch: &BranchRecord,
    ctx: &EvaluationContext<'_>,
) -> Result<Verdict, GitHubError> {
    let name = branch.name.as_str();

    if let Some(reason) = check_static_rules(branch, ctx) {
        return Ok(Verdict::skip(name, reason));
    }

    let committed_at = match latest_commit_date(host, name).await {
        Ok(date) => date,
        Err(CommitLookupError::Remote(e)) if e.is_quota_exhausted() => return Err(e),
        Err(e) => {
            let reason = SkipReason::CommitLookupFailed(e.to_string());
            return Ok(Verdict::skip(name, reason));
        }
    };

    if ctx.now.signed_duration_since(committed_at) < ctx.policy.min_age() {
        return Ok(Verdict::skip(
            name,
            SkipReason::TooRecent {
                days: ctx.policy.last_commit_age_days,
            },
        ));
    }

    if ctx.pull_requests.has_open_head(name) {
        return Ok(Verdict::skip(name, SkipReason::OpenPullRequest));
    }

    match ctx.pull_requests.is_open_base(host, name).await {
        Ok(true) => Ok(Verdict::skip(name, SkipReason::PullRequestBase)),
        Ok(false) => Ok(Verdict::delete(name)),
        Err(e) if e.is_quota_exhausted() => Err(e),
        Err(e) => Ok(Verdict::skip(name, SkipReason::BaseCheckFailed(e.to_string()))),
    }
}
