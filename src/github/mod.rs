pub mod client;
pub mod errors;
pub mod rate_guard;
pub mod types;

pub use client::{branch_ref, GitHubClient, RepositoryHost};
pub use errors::GitHubError;
pub use rate_guard::{RateGuarded, QUOTA_HEADROOM_THRESHOLD};
pub use types::{
    BranchRecord, CommitRecord, ListPage, PullRequestQuery, PullRequestRecord, RateLimitSnapshot,
};
