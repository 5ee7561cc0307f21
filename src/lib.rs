// Branch Sweeper Library - stale branch cleanup for GitHub repositories
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod github;
pub mod observability;
pub mod sweep;
pub mod telemetry;

// Re-export key types for easy access
pub use cli::Cli;
pub use config::{ConfigError, RepoSlug, RetentionPolicy, SettingsOverrides, SweepConfig};
pub use github::{GitHubClient, GitHubError, RateGuarded, RepositoryHost};
pub use observability::{create_sweep_span, ApiCallMetrics, ApiCallStats, OperationTimer};
pub use sweep::{SweepError, SweepReport, Sweeper};
pub use telemetry::{generate_run_id, init_telemetry, LogFormat};
