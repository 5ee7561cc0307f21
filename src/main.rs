use branch_sweeper::{
    create_sweep_span, generate_run_id, init_telemetry, ApiCallMetrics, Cli, GitHubClient,
    OperationTimer, RateGuarded, SweepConfig, SweepError, Sweeper,
};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> ExitCode {
    // Before parsing, so `.env` values reach env-bound flags
    let env_file = SweepConfig::load_env_file();
    let cli = Cli::parse();

    if let Err(e) = init_telemetry(cli.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    match env_file {
        Some(Ok(path)) => {
            info!(path = %path.display(), "Loaded environment variables from .env file")
        }
        Some(Err(e)) => warn!(error = %e, "Failed to load .env file"),
        None => {}
    }

    let config = match SweepConfig::load(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let run_id = generate_run_id();
    let span = create_sweep_span(&run_id, &config.repository.to_string(), config.dry_run);
    run(config).instrument(span).await
}

async fn run(config: SweepConfig) -> ExitCode {
    let metrics = Arc::new(ApiCallMetrics::new());
    let client = match GitHubClient::new(
        &config.token,
        &config.api_url,
        &config.repository,
        Arc::clone(&metrics),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, hint = e.troubleshooting(), "Failed to create GitHub client");
            return ExitCode::FAILURE;
        }
    };
    let host = RateGuarded::new(client, config.rate_limit_check, Arc::clone(&metrics));

    info!(
        api_url = %config.api_url,
        min_age_days = config.policy.last_commit_age_days,
        rate_limit_check = config.rate_limit_check,
        "Starting branch sweep"
    );

    let timer = OperationTimer::new("sweep");
    let result = Sweeper::new(&host, &config.policy, config.dry_run).run().await;
    timer.finish();
    metrics.log_stats();

    match result {
        Ok(report) => {
            info!(
                default_branch = %report.default_branch,
                evaluated = report.evaluated,
                skipped = report.skipped,
                eligible = report.eligible.len(),
                deleted = report.deleted,
                truncated = report.truncated,
                dry_run = report.dry_run,
                "Branch sweep complete"
            );
            ExitCode::SUCCESS
        }
        Err(e @ SweepError::QuotaExhausted(_)) => {
            warn!(error = %e.github_error(), "Stopping early to preserve API quota");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(
                error = %e,
                hint = e.github_error().troubleshooting(),
                "Branch sweep failed"
            );
            ExitCode::FAILURE
        }
    }
}
