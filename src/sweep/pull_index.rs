use std::collections::HashSet;
use tracing::{debug, info};

use crate::github::{GitHubError, PullRequestQuery, PullRequestRecord, RepositoryHost};

pub const PULL_REQUEST_PAGE_SIZE: u8 = 100;

/// Cross-reference of the repository's open pull requests.
#[derive(Debug, Clone, Default)]
pub struct PullRequestIndex {
    heads: HashSet<String>,
    bases: HashSet<String>,
    count: usize,
}

impl PullRequestIndex {
    /// Build an index from pull requests; anything not open is ignored.
    pub fn from_pull_requests<I>(pull_requests: I) -> Self
    where
        I: IntoIterator<Item = PullRequestRecord>,
    {
        let mut index = Self::default();
        for pr in pull_requests.into_iter().filter(PullRequestRecord::is_open) {
            index.heads.insert(pr.head_ref);
            index.bases.insert(pr.base_ref);
            index.count += 1;
        }
        index
    }

    /// Page through every open pull request. Any page failure fails the whole
    /// collection: a partial index could let a referenced branch be deleted.
    pub async fn collect(host: &dyn RepositoryHost) -> Result<Self, GitHubError> {
        let mut pull_requests = Vec::new();
        let mut page = 1;

        loop {
            let query = PullRequestQuery::open(PULL_REQUEST_PAGE_SIZE, page);
            let result = host.list_pull_requests(&query).await?;
            debug!(page, items = result.items.len(), "Fetched open pull requests");
            pull_requests.extend(result.items);

            match result.next_page {
                Some(next) => page = next,
                None => break,
            }
        }

        let index = Self::from_pull_requests(pull_requests);
        info!(open_pull_requests = index.len(), "Indexed open pull requests");
        Ok(index)
    }

    /// Whether `branch` is the head ref of an open pull request.
    pub fn has_open_head(&self, branch: &str) -> bool {
        self.heads.contains(branch)
    }

    /// Whether `branch` is the base of an open pull request.
    ///
    /// The snapshot answers first; otherwise the remote is asked for open
    /// pull requests targeting `branch`, so ones opened after the snapshot
    /// are still seen.
    pub async fn is_open_base(
        &self,
        host: &dyn RepositoryHost,
        branch: &str,
    ) -> Result<bool, GitHubError> {
        if self.bases.contains(branch) {
            return Ok(true);
        }
        let query = PullRequestQuery::open_with_base(branch, 1);
        let page = host.list_pull_requests(&query).await?;
        Ok(page.items.iter().any(|pr| pr.is_open() && pr.base_ref == branch))
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
