//! fstab-hardener - Main entry point
//!
//! Loads the policy, runs pre-flight checks, reconciles the persisted mount
//! table with the live mounts and prints what changed.

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use fstab_hardener::cli::{Cli, Commands};
use fstab_hardener::{HardeningPolicy, LinuxSystem, Reconciler, sanity};

/// Initialize the logger with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build the effective policy from defaults, the policy file and flags
fn load_policy(cli: &Cli) -> Result<HardeningPolicy> {
    let mut policy = match &cli.config {
        Some(path) => {
            info!("Loading policy from {:?}", path);
            HardeningPolicy::load_from_file(path)?
        }
        None => HardeningPolicy::default(),
    };

    if let Some(fstab) = &cli.fstab {
        policy.fstab_path = fstab.clone();
    }
    if cli.no_remount {
        policy.remount_live = false;
    }

    policy.validate().context("Invalid policy")?;
    Ok(policy)
}

fn run(cli: &Cli) -> Result<()> {
    let policy = load_policy(cli)?;

    if let Some(Commands::Policy) = cli.command {
        println!("{}", policy.to_json()?);
        return Ok(());
    }

    if cli.dry_run {
        debug!("Dry run: skipping pre-flight checks");
    } else {
        sanity::run_preflight_checks();
    }

    let system = LinuxSystem::new();
    let report = Reconciler::new(&system, &policy)
        .dry_run(cli.dry_run)
        .run()
        .with_context(|| format!("Reconciling {} failed", policy.fstab_path.display()))?;

    for line in report.summary_lines() {
        println!("{line}");
    }
    info!("Run finished: {}", report.outcome);
    Ok(())
}

/// Main application entry point
fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("fstab-hardener: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
