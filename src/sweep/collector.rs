use tracing::{debug, info, warn};

use super::eligibility::{evaluate, EvaluationContext};
use crate::github::{GitHubError, RepositoryHost};

pub const BRANCH_PAGE_SIZE: u8 = 100;

/// Branches that passed every rule, plus counts for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    /// Eligible branch names in listing order
    pub eligible: Vec<String>,
    pub evaluated: usize,
    pub skipped: usize,
    /// A listing page failed and later pages were never fetched
    pub truncated: bool,
}

/// Walk every branch page and evaluate each branch.
///
/// A failed page stops pagination but keeps whatever was already collected.
/// Quota exhaustion is the only error returned.
pub async fn collect_deletable(
    host: &dyn RepositoryHost,
    ctx: &EvaluationContext<'_>,
) -> Result<Collection, GitHubError> {
    let mut collection = Collection::default();
    let mut page = 1;

    loop {
        let listing = match host.list_branches(page, BRANCH_PAGE_SIZE).await {
            Ok(listing) => listing,
            Err(e) if e.is_quota_exhausted() => return Err(e),
            Err(e) => {
                warn!(page, error = %e, "Failed to list branches, stopping pagination");
                collection.truncated = true;
                break;
            }
        };
        debug!(page, items = listing.items.len(), "Fetched branch page");

        for branch in &listing.items {
            let verdict = evaluate(host, branch, ctx).await?;
            collection.evaluated += 1;

            match verdict.skip_reason() {
                Some(reason) if reason.is_error() => {
                    collection.skipped += 1;
                    warn!(branch = %verdict.branch, "Skipping `{}`: {}", verdict.branch, reason);
                }
                Some(reason) => {
                    collection.skipped += 1;
                    info!(branch = %verdict.branch, "Skipping `{}`: {}", verdict.branch, reason);
                }
                None => {
                    info!(branch = %verdict.branch, "Branch `{}` will be deleted", verdict.branch);
                    collection.eligible.push(verdict.branch);
                }
            }
        }

        match listing.next_page {
            Some(next) => page = next,
            None => break,
        }
    }

    Ok(collection)
}
