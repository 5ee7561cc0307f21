use tracing::{error, info};

use crate::github::{branch_ref, GitHubError, RepositoryHost};

/// Deletion stopped partway through the list.
#[derive(Debug)]
pub struct DeletionFailure {
    pub branch: String,
    /// Branches removed before the failure
    pub deleted: usize,
    pub source: GitHubError,
}

/// Delete `branches` in order, stopping at the first failure.
///
/// Returns the number of branches deleted. Branches deleted before a failure
/// stay deleted.
pub async fn delete_branches(
    host: &dyn RepositoryHost,
    branches: &[String],
) -> Result<usize, DeletionFailure> {
    for (deleted, branch) in branches.iter().enumerate() {
        if let Err(source) = host.delete_ref(&branch_ref(branch)).await {
            error!(branch = %branch, error = %source, "Failed to delete branch");
            return Err(DeletionFailure {
                branch: branch.clone(),
                deleted,
                source,
            });
        }
        info!(branch = %branch, "Deleted branch `{}`", branch);
    }

    Ok(branches.len())
}
