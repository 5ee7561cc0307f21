use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Remote operation classes counted by [`ApiCallMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    ListBranches,
    ListCommits,
    GetRepository,
    ListPullRequests,
    DeleteRef,
    RateLimit,
}

impl ApiOperation {
    const ALL: [ApiOperation; 6] = [
        ApiOperation::ListBranches,
        ApiOperation::ListCommits,
        ApiOperation::GetRepository,
        ApiOperation::ListPullRequests,
        ApiOperation::DeleteRef,
        ApiOperation::RateLimit,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiOperation::ListBranches => "list_branches",
            ApiOperation::ListCommits => "list_commits",
            ApiOperation::GetRepository => "get_repository",
            ApiOperation::ListPullRequests => "list_pull_requests",
            ApiOperation::DeleteRef => "delete_ref",
            ApiOperation::RateLimit => "rate_limit",
        }
    }
}

/// GitHub API usage for one run. Shared between the client and the rate guard.
#[derive(Debug, Default)]
pub struct ApiCallMetrics {
    requests: [AtomicU64; 6],
    errors: AtomicU64,
    rate_limit_checks: AtomicU64,
    rate_limit_trips: AtomicU64,
}

impl ApiCallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, operation: ApiOperation) {
        self.requests[operation.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_check(&self) {
        self.rate_limit_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_trip(&self) {
        self.rate_limit_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_for(&self, operation: ApiOperation) -> u64 {
        self.requests[operation.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ApiCallStats {
        ApiCallStats {
            total_requests: ApiOperation::ALL
                .iter()
                .map(|op| self.requests_for(*op))
                .sum(),
            errors: self.errors.load(Ordering::Relaxed),
            rate_limit_checks: self.rate_limit_checks.load(Ordering::Relaxed),
            rate_limit_trips: self.rate_limit_trips.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        let per_operation = ApiOperation::ALL
            .iter()
            .map(|op| format!("{}={}", op.as_str(), self.requests_for(*op)))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            total_requests = stats.total_requests,
            errors = stats.errors,
            rate_limit_checks = stats.rate_limit_checks,
            rate_limit_trips = stats.rate_limit_trips,
            "GitHub API usage: {}",
            per_operation
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiCallStats {
    pub total_requests: u64,
    pub errors: u64,
    pub rate_limit_checks: u64,
    pub rate_limit_trips: u64,
}

/// Create the span wrapping a whole sweep run
pub fn create_sweep_span(run_id: &str, repository: &str, dry_run: bool) -> tracing::Span {
    tracing::info_span!(
        "sweep",
        run.id = run_id,
        repository = repository,
        dry_run = dry_run,
    )
}

/// Time an operation and log its duration
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            operation = %self.operation,
            duration_ms = duration.as_millis() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_operation() {
        let metrics = ApiCallMetrics::new();
        metrics.record_request(ApiOperation::ListBranches);
        metrics.record_request(ApiOperation::ListBranches);
        metrics.record_request(ApiOperation::DeleteRef);
        metrics.record_error();
        metrics.record_rate_check();

        assert_eq!(metrics.requests_for(ApiOperation::ListBranches), 2);
        assert_eq!(metrics.requests_for(ApiOperation::ListCommits), 0);

        let stats = metrics.snapshot();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.rate_limit_checks, 1);
        assert_eq!(stats.rate_limit_trips, 0);
    }
}
