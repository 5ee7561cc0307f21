use chrono::TimeDelta;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::sweep::patterns::{GlobList, PrefixList};

pub const DEFAULT_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_CONFIG_FILE: &str = "branch-sweeper.toml";
const ENV_PREFIX: &str = "BRANCH_SWEEPER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid repository format '{0}', must be in format owner/repository")]
    InvalidRepository(String),
    #[error("GitHub token is required (--github-token or GITHUB_TOKEN)")]
    MissingToken,
    #[error("Invalid GitHub Enterprise URL '{0}'")]
    InvalidApiUrl(String),
    #[error("Invalid branch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Repository identifier in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoSlug {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(ConfigError::InvalidRepository(s.to_string())),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Retention rules for one run. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    /// Exact names or `*` globs that are never deleted
    pub ignore_branches: GlobList,
    /// When non-empty, only branches starting with one of these are candidates
    pub allowed_prefixes: PrefixList,
    /// Branches starting with any of these are never deleted
    pub ignored_prefixes: PrefixList,
    /// Minimum age of the latest commit, in whole days
    pub last_commit_age_days: u32,
}

impl RetentionPolicy {
    pub fn from_lists(
        ignore_branches: &str,
        allowed_prefixes: &str,
        ignored_prefixes: &str,
        last_commit_age_days: u32,
    ) -> Result<Self, ConfigError> {
        let ignore = split_list(ignore_branches);
        let ignore_branches = GlobList::new(ignore.as_slice()).map_err(|(pattern, source)| {
            ConfigError::InvalidPattern { pattern, source }
        })?;

        Ok(Self {
            ignore_branches,
            allowed_prefixes: PrefixList::new(split_list(allowed_prefixes)),
            ignored_prefixes: PrefixList::new(split_list(ignored_prefixes)),
            last_commit_age_days,
        })
    }

    pub fn min_age(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.last_commit_age_days))
    }
}

/// Validated settings for a sweep, constructed once at startup.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub repository: RepoSlug,
    pub token: String,
    /// REST API root the client talks to
    pub api_url: String,
    pub dry_run: bool,
    pub rate_limit_check: bool,
    pub policy: RetentionPolicy,
}

/// Values supplied explicitly on the command line or through the bound
/// environment variables. They take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub github_repo: Option<String>,
    pub github_token: Option<String>,
    pub github_enterprise_url: Option<String>,
    pub ignore_branches: Option<String>,
    pub allowed_prefixes: Option<String>,
    pub ignored_prefixes: Option<String>,
    pub last_commit_age_days: Option<u32>,
    pub dry_run: Option<bool>,
    pub rate_limit: Option<bool>,
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawSettings {
    github_repo: Option<String>,
    github_token: Option<String>,
    github_enterprise_url: Option<String>,
    dry_run: bool,
    rate_limit: bool,
    policy: RawPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawPolicy {
    ignore_branches: String,
    allowed_prefixes: String,
    ignored_prefixes: String,
    last_commit_age_days: u32,
}

impl SweepConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`--config` or branch-sweeper.toml)
    /// 3. Environment variables (prefixed with BRANCH_SWEEPER_)
    /// 4. Command line arguments and their bound environment variables
    pub fn load(overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("dry_run", false)?
            .set_default("rate_limit", true)?
            .set_default("policy.ignore_branches", "")?
            .set_default("policy.allowed_prefixes", "")?
            .set_default("policy.ignored_prefixes", "")?
            .set_default("policy.last_commit_age_days", 0_i64)?;

        match &overrides.config_file {
            Some(path) => builder = builder.add_source(File::from(path.as_path()).required(true)),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_FILE));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let raw: RawSettings = builder
            .set_override_option("github_repo", overrides.github_repo.clone())?
            .set_override_option("github_token", overrides.github_token.clone())?
            .set_override_option(
                "github_enterprise_url",
                overrides.github_enterprise_url.clone(),
            )?
            .set_override_option("dry_run", overrides.dry_run)?
            .set_override_option("rate_limit", overrides.rate_limit)?
            .set_override_option(
                "policy.ignore_branches",
                overrides.ignore_branches.clone(),
            )?
            .set_override_option(
                "policy.allowed_prefixes",
                overrides.allowed_prefixes.clone(),
            )?
            .set_override_option(
                "policy.ignored_prefixes",
                overrides.ignored_prefixes.clone(),
            )?
            .set_override_option(
                "policy.last_commit_age_days",
                overrides.last_commit_age_days.map(i64::from),
            )?
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let repository: RepoSlug = raw.github_repo.unwrap_or_default().parse()?;

        let token = raw
            .github_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let api_url = match raw.github_enterprise_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => enterprise_api_url(url)?,
            _ => DEFAULT_API_URL.to_string(),
        };

        let policy = RetentionPolicy::from_lists(
            &raw.policy.ignore_branches,
            &raw.policy.allowed_prefixes,
            &raw.policy.ignored_prefixes,
            raw.policy.last_commit_age_days,
        )?;

        Ok(Self {
            repository,
            token,
            api_url,
            dry_run: raw.dry_run,
            rate_limit_check: raw.rate_limit,
            policy,
        })
    }

    /// Load .env file if it exists. `None` when there is no file.
    pub fn load_env_file() -> Option<Result<PathBuf, dotenvy::Error>> {
        Path::new(".env").exists().then(dotenvy::dotenv)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn a GitHub Enterprise address into its REST API root.
///
/// `https://ghe.example.com` becomes `https://ghe.example.com/api/v3/`; URLs
/// already ending in `/api/v3/` and `api.` hosts are only given a trailing slash.
pub fn enterprise_api_url(url: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidApiUrl(url.to_string());

    let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
    if scheme != "https" && scheme != "http" {
        return Err(invalid());
    }

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (host, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    if host.is_empty() {
        return Err(invalid());
    }

    let mut path = path.to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    if !path.ends_with("/api/v3/") && !host.starts_with("api.") && !host.contains(".api.") {
        path.push_str("api/v3/");
    }

    Ok(format!("{scheme}://{host}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_repo_slug_parsing() {
        let slug: RepoSlug = "owner/repo".parse().unwrap();
        assert_eq!(slug.owner, "owner");
        assert_eq!(slug.name, "repo");
        assert_eq!(slug.to_string(), "owner/repo");

        for invalid in ["/repo", "owner/", "owner", "owner/repo/extra", ""] {
            let result = invalid.parse::<RepoSlug>();
            assert!(
                matches!(result, Err(ConfigError::InvalidRepository(_))),
                "expected '{invalid}' to be rejected"
            );
        }
    }

    #[test]
    fn test_split_list() {
        assert!(split_list("").is_empty());
        assert_eq!(split_list("a"), vec!["a"]);
        assert_eq!(split_list("a,b"), vec!["a", "b"]);
        assert_eq!(split_list("a, b, c"), vec!["a", "b", "c"]);
        assert_eq!(split_list("a,,c"), vec!["a", "c"]);
        assert!(split_list(",,,").is_empty());
    }

    #[test]
    fn test_enterprise_api_url() {
        assert_eq!(
            enterprise_api_url("https://ghe.example.com").unwrap(),
            "https://ghe.example.com/api/v3/"
        );
        assert_eq!(
            enterprise_api_url("https://ghe.example.com/").unwrap(),
            "https://ghe.example.com/api/v3/"
        );
        assert_eq!(
            enterprise_api_url("https://ghe.example.com/api/v3").unwrap(),
            "https://ghe.example.com/api/v3/"
        );
        assert_eq!(
            enterprise_api_url("https://api.ghe.example.com").unwrap(),
            "https://api.ghe.example.com/"
        );
        assert_eq!(
            enterprise_api_url("https://corp.api.example.com/").unwrap(),
            "https://corp.api.example.com/"
        );
        assert!(enterprise_api_url("ghe.example.com").is_err());
        assert!(enterprise_api_url("ftp://ghe.example.com").is_err());
        assert!(enterprise_api_url("https://").is_err());
    }

    #[test]
    fn test_policy_from_lists() {
        let policy = RetentionPolicy::from_lists("main, release-*", "feature-", "", 30).unwrap();
        assert!(policy.ignore_branches.matches("release-1.0"));
        assert!(policy.allowed_prefixes.matches("feature-x"));
        assert!(policy.ignored_prefixes.is_empty());
        assert_eq!(policy.min_age(), TimeDelta::days(30));
    }

    #[test]
    fn test_load_from_overrides() {
        let overrides = SettingsOverrides {
            github_repo: Some("octo/widgets".to_string()),
            github_token: Some("secret".to_string()),
            allowed_prefixes: Some("release-".to_string()),
            last_commit_age_days: Some(30),
            dry_run: Some(true),
            config_file: Some(PathBuf::from("/nonexistent/ignored.toml")),
            ..Default::default()
        };

        // An explicit config file must exist
        assert!(matches!(
            SweepConfig::load(&overrides),
            Err(ConfigError::Load(_))
        ));

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "rate_limit = false\n\n[policy]\nignored_prefixes = \"keep-\"\nlast_commit_age_days = 7"
        )
        .unwrap();

        let overrides = SettingsOverrides {
            config_file: Some(file.path().to_path_buf()),
            ..overrides
        };
        let config = SweepConfig::load(&overrides).unwrap();

        assert_eq!(config.repository.to_string(), "octo/widgets");
        assert_eq!(config.token, "secret");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.dry_run);
        assert!(!config.rate_limit_check);
        assert!(config.policy.allowed_prefixes.matches("release-v1"));
        assert!(config.policy.ignored_prefixes.matches("keep-me"));
        // The command line wins over the file
        assert_eq!(config.policy.last_commit_age_days, 30);
    }

    #[test]
    fn test_missing_token_and_bad_repo() {
        let raw = RawSettings {
            github_repo: Some("octo/widgets".to_string()),
            github_token: None,
            github_enterprise_url: None,
            dry_run: false,
            rate_limit: true,
            policy: RawPolicy {
                ignore_branches: String::new(),
                allowed_prefixes: String::new(),
                ignored_prefixes: String::new(),
                last_commit_age_days: 0,
            },
        };
        assert!(matches!(
            SweepConfig::from_raw(raw.clone()),
            Err(ConfigError::MissingToken)
        ));

        let raw = RawSettings {
            github_repo: Some("not-a-slug".to_string()),
            github_token: Some("t".to_string()),
            ..raw
        };
        assert!(matches!(
            SweepConfig::from_raw(raw),
            Err(ConfigError::InvalidRepository(_))
        ));
    }

    #[test]
    fn test_enterprise_url_applied() {
        let raw = RawSettings {
            github_repo: Some("octo/widgets".to_string()),
            github_token: Some("t".to_string()),
            github_enterprise_url: Some("https://ghe.corp.local".to_string()),
            dry_run: false,
            rate_limit: true,
            policy: RawPolicy {
                ignore_branches: String::new(),
                allowed_prefixes: String::new(),
                ignored_prefixes: String::new(),
                last_commit_age_days: 0,
            },
        };
        let config = SweepConfig::from_raw(raw).unwrap();
        assert_eq!(config.api_url, "https://ghe.corp.local/api/v3/");
    }
}
