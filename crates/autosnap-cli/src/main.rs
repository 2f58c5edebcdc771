//! autosnap - scheduled EBS snapshot rotation
//!
//! Meant to be invoked periodically by an external scheduler. With no
//! arguments it snapshots every volume of every instance tagged `ToSnap`,
//! then deletes managed snapshots older than 14 days.
//!
//! ## Commands
//!
//! - `run` (default): create, then reap
//! - `create`: create today's snapshots only
//! - `reap`: delete expired snapshots only

use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use autosnap_aws::{is_aws_cli_available, AwsCliConfig, AwsCliProvider};
use autosnap_core::{
    create_snapshots_for_day, delete_old_snapshots, init_tracing, run_rotation, RotationConfig,
    DEFAULT_ELIGIBILITY_TAG, DEFAULT_MARKER_TAG, DEFAULT_RETENTION_DAYS,
};
use autosnap_provider::CloudProvider;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "autosnap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create dated EBS snapshots for tagged instances and retire old ones", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    rotation: RotationArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct RotationArgs {
    /// AWS region (default: AWS_REGION, AWS_DEFAULT_REGION, then us-west-2)
    #[arg(long, env = "AUTOSNAP_REGION", global = true)]
    region: Option<String>,

    /// AWS credentials profile (default: AWS_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// AWS CLI executable (default: AUTOSNAP_AWS_CLI, then `aws`)
    #[arg(long, global = true)]
    aws_cli: Option<String>,

    /// Delete snapshots dated more than this many days ago
    #[arg(long, env = "AUTOSNAP_RETENTION_DAYS", default_value_t = DEFAULT_RETENTION_DAYS, global = true)]
    retention_days: u32,

    /// Instance tag key that opts an instance in
    #[arg(long, env = "AUTOSNAP_ELIGIBILITY_TAG", default_value = DEFAULT_ELIGIBILITY_TAG, global = true)]
    eligibility_tag: String,

    /// Snapshot tag key marking snapshots managed by autosnap
    #[arg(long, env = "AUTOSNAP_MARKER_TAG", default_value = DEFAULT_MARKER_TAG, global = true)]
    marker_tag: String,

    /// Require tag values to equal `True` instead of only checking the key
    #[arg(long, global = true)]
    match_value: bool,

    /// Ask the provider to validate mutating calls without performing them
    #[arg(long, global = true)]
    dry_run: bool,
}

impl RotationArgs {
    fn rotation_config(&self) -> RotationConfig {
        RotationConfig::new()
            .with_eligibility_tag(&self.eligibility_tag)
            .with_marker_tag(&self.marker_tag)
            .with_retention_days(self.retention_days)
            .with_match_value(self.match_value)
            .with_dry_run(self.dry_run)
    }

    fn aws_config(&self) -> AwsCliConfig {
        let mut config = AwsCliConfig::from_env();
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(profile) = &self.profile {
            config = config.with_profile(profile);
        }
        if let Some(binary) = &self.aws_cli {
            config = config.with_binary(binary);
        }
        config
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Create today's snapshots, then delete expired ones (default)
    Run,

    /// Create today's snapshots only
    Create,

    /// Delete expired snapshots only
    Reap,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    let config = cli.rotation.rotation_config();
    let provider = AwsCliProvider::new(cli.rotation.aws_config());
    info!(
        region = %provider.config().region,
        dry_run = config.dry_run,
        "autosnap starting"
    );

    let command = cli.command.unwrap_or(Commands::Run);
    let today = Local::now().date_naive();

    let outcome = match ensure_aws_cli(provider.config()) {
        Ok(()) => execute(&provider, command, &config, today).await,
        Err(e) => Err(e),
    };
    ExitCode::from(report_outcome(outcome))
}

/// Fail before any stage runs when the AWS CLI cannot be executed.
fn ensure_aws_cli(config: &AwsCliConfig) -> Result<()> {
    if !is_aws_cli_available(&config.binary) {
        bail!(
            "AWS CLI `{}` is not installed or not in PATH (set --aws-cli or AUTOSNAP_AWS_CLI)",
            config.binary
        );
    }
    Ok(())
}

/// Run one command against `provider`.
async fn execute(
    provider: &dyn CloudProvider,
    command: Commands,
    config: &RotationConfig,
    today: NaiveDate,
) -> Result<()> {
    match command {
        Commands::Run => {
            run_rotation(provider, config, today)
                .await
                .context("snapshot rotation failed")?;
        }
        Commands::Create => {
            let report = create_snapshots_for_day(provider, config, today)
                .await
                .context("snapshot creation failed")?;
            info!("{}", report);
        }
        Commands::Reap => {
            let report = delete_old_snapshots(provider, config, today)
                .await
                .context("snapshot cleanup failed")?;
            info!("{}", report);
        }
    }
    Ok(())
}

/// Top-level error boundary: print the failure and pick the exit status.
fn report_outcome(result: Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %format!("{err:#}"), "autosnap aborted");
            println!("{err:?}");
            println!("Error: {err:#}");
            println!("Not continuing!");
            1
        }
    }
}
