use octocrab::Error as OctocrabError;
use thiserror::Error;

/// Errors raised by the remote repository layer.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The rate guard tripped. Not a failure: callers stop the run cleanly.
    #[error(
        "GitHub API rate limit close to being exceeded ({remaining}/{limit} requests remaining)"
    )]
    QuotaExhausted { remaining: u64, limit: u64 },

    #[error("GitHub API request failed: {0}")]
    Api(#[from] OctocrabError),

    #[error("unsupported reference '{0}', expected refs/heads/<branch>")]
    InvalidReference(String),

    #[error("unexpected response from GitHub: {0}")]
    InvalidResponse(String),

    #[error("failed to build GitHub client: {0}")]
    ClientBuild(String),
}

impl GitHubError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, GitHubError::QuotaExhausted { .. })
    }

    /// HTTP status returned by GitHub, when the failure came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GitHubError::Api(OctocrabError::GitHub { source, .. }) => {
                Some(source.status_code.as_u16())
            }
            _ => None,
        }
    }

    /// Short operator-facing hint for fatal errors.
    pub fn troubleshooting(&self) -> &'static str {
        match self {
            GitHubError::QuotaExhausted { .. } => {
                "Wait for the rate limit window to reset, or pass --rate-limit=false"
            }
            GitHubError::InvalidReference(_) => {
                "Only branch references (refs/heads/...) can be deleted"
            }
            GitHubError::ClientBuild(_) => "Check the token and --github-enterprise-url values",
            GitHubError::InvalidResponse(_) => {
                "Unexpected API payload; check --github-enterprise-url targets the REST API"
            }
            GitHubError::Api(OctocrabError::Http { .. }) => {
                "Network connection to the GitHub API failed; check connectivity and proxy settings"
            }
            GitHubError::Api(_) => match self.status_code() {
                Some(401) => "Token is invalid or expired",
                Some(403) => "Token lacks required permissions (needs 'repo' or 'contents: write')",
                Some(404) => "Repository may not exist or the token cannot see it",
                Some(422) => "GitHub rejected the request; the branch may be gone or protected",
                _ => "Check authentication, repository access and rate limits",
            },
        }
    }
}
