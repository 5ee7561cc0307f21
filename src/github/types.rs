use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A branch as listed by the remote. The last commit timestamp is not part of
/// the listing and is resolved separately when a branch needs it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchRecord {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

impl BranchRecord {
    pub fn new(name: &str, protected: bool) -> Self {
        Self {
            name: name.to_string(),
            protected,
        }
    }
}

/// A commit on a branch, reduced to what retention decisions need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub sha: String,
    pub committed_at: Option<DateTime<Utc>>,
}

/// An open pull request, reduced to its head and base refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub state: String,
    pub head_ref: String,
    pub base_ref: String,
}

impl PullRequestRecord {
    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }
}

/// Filter for pull request listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestQuery {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    pub per_page: u8,
    pub page: u32,
}

impl PullRequestQuery {
    pub fn open(per_page: u8, page: u32) -> Self {
        Self {
            state: "open".to_string(),
            base: None,
            per_page,
            page,
        }
    }

    pub fn open_with_base(base: &str, per_page: u8) -> Self {
        Self {
            base: Some(base.to_string()),
            ..Self::open(per_page, 1)
        }
    }
}

/// Core quota status reported by the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u64,
    pub remaining: u64,
}

impl RateLimitSnapshot {
    /// Fraction of the quota still available. `None` when the limit is zero.
    pub fn headroom(&self) -> Option<f64> {
        if self.limit == 0 {
            return None;
        }
        Some(self.remaining as f64 / self.limit as f64)
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Page number to request next; `None` on the last page.
    pub next_page: Option<u32>,
}

impl<T> ListPage<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }

    pub fn with_next(items: Vec<T>, next_page: u32) -> Self {
        Self {
            items,
            next_page: Some(next_page),
        }
    }
}

// Wire formats. Only the fields the sweeper reads are modelled.

#[derive(Debug, Deserialize)]
pub(crate) struct CommitPayload {
    pub sha: String,
    pub commit: CommitDetailPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitDetailPayload {
    pub committer: Option<CommitSignaturePayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommitSignaturePayload {
    pub date: Option<DateTime<Utc>>,
}

impl From<CommitPayload> for CommitRecord {
    fn from(payload: CommitPayload) -> Self {
        Self {
            sha: payload.sha,
            committed_at: payload.commit.committer.and_then(|c| c.date),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPayload {
    pub default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PullRequestPayload {
    pub number: u64,
    pub state: String,
    pub head: RefPayload,
    pub base: RefPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefPayload {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

impl From<PullRequestPayload> for PullRequestRecord {
    fn from(payload: PullRequestPayload) -> Self {
        Self {
            number: payload.number,
            state: payload.state,
            head_ref: payload.head.ref_name,
            base_ref: payload.base.ref_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitPayload {
    pub resources: RateLimitResourcesPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResourcesPayload {
    pub core: RateWindowPayload,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateWindowPayload {
    pub limit: u64,
    pub remaining: u64,
}

impl From<RateLimitPayload> for RateLimitSnapshot {
    fn from(payload: RateLimitPayload) -> Self {
        Self {
            limit: payload.resources.core.limit,
            remaining: payload.resources.core.remaining,
        }
    }
}
