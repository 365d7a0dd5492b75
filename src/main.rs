use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use site_deploy::config::{Cli, Config};
use site_deploy::pipeline::{Outcome, Pipeline};
use site_deploy::runner::{CommandRunner, DryRunRunner, SystemRunner};
use site_deploy::style;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            style::error(&format!("An unexpected error occurred: {e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("site_deploy=debug")
        } else {
            EnvFilter::new("site_deploy=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::from_cli(cli).context("Invalid configuration")?;

    let runner: &dyn CommandRunner = if config.dry_run {
        &DryRunRunner
    } else {
        &SystemRunner
    };

    let report = Pipeline::new(&config, runner)
        .run()
        .with_context(|| format!("Deployment of {} aborted", config.root.display()))?;

    if let Some(scan) = &report.scan {
        if !scan.unused.is_empty() {
            eprintln!(
                "{} of {} scanned file(s) look unused",
                scan.unused.len(),
                scan.checked
            );
        }
    }

    match report.outcome {
        Outcome::Deployed(provider) => style::success(&format!(
            "Successfully deployed with {provider} in {:.2}s",
            report.duration.as_secs_f64()
        )),
        Outcome::BuildFailed | Outcome::DeployFailed(_) => {}
    }

    Ok(ExitCode::from(report.outcome.exit_code()))
}
