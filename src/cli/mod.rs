use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::SettingsOverrides;
use crate::telemetry::LogFormat;

#[derive(Parser, Debug)]
#[command(name = "branch-sweeper")]
#[command(version)]
#[command(about = "Delete stale branches from a GitHub repository")]
#[command(long_about = "Deletes branches whose latest commit is older than a threshold, \
                       keeping the default branch, protected branches, ignored names and prefixes, \
                       and anything an open pull request depends on. Use --dry-run to preview.")]
pub struct Cli {
    /// Repository to sweep, as owner/repository
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub github_repo: Option<String>,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Comma-separated branch names or `*` globs to keep
    #[arg(long, env = "IGNORE_BRANCHES")]
    pub ignore_branches: Option<String>,

    /// Comma-separated prefixes; when set, only matching branches are deleted
    #[arg(long, env = "ALLOWED_PREFIXES")]
    pub allowed_prefixes: Option<String>,

    /// Comma-separated prefixes of branches to keep
    #[arg(long, env = "IGNORED_PREFIXES")]
    pub ignored_prefixes: Option<String>,

    /// Minimum age in days of a branch's latest commit
    #[arg(long, env = "LAST_COMMIT_AGE_DAYS")]
    pub last_commit_age_days: Option<u32>,

    /// Report eligible branches without deleting them
    #[arg(
        long,
        env = "DRY_RUN",
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub dry_run: Option<bool>,

    /// Stop when the API quota is nearly used up
    #[arg(
        long,
        env = "RATE_LIMIT",
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub rate_limit: Option<bool>,

    /// GitHub Enterprise base URL
    #[arg(long, env = "GITHUB_ENTERPRISE_URL")]
    pub github_enterprise_url: Option<String>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Everything given explicitly, ready to layer over file and env settings.
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            github_repo: self.github_repo.clone(),
            github_token: self.github_token.clone(),
            github_enterprise_url: self.github_enterprise_url.clone(),
            ignore_branches: self.ignore_branches.clone(),
            allowed_prefixes: self.allowed_prefixes.clone(),
            ignored_prefixes: self.ignored_prefixes.clone(),
            last_commit_age_days: self.last_commit_age_days,
            dry_run: self.dry_run,
            rate_limit: self.rate_limit,
            config_file: self.config.clone(),
        }
    }
}
