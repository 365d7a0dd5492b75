//! Deployment orchestration.
//!
//! Stages run strictly in order: Clean, Scan, Optimize, Build, Deploy. The
//! first three report their own problems and never stop the run; Build and
//! Deploy are gates, and a failure there ends the run before any later
//! stage starts.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::builder::build_project;
use crate::clean::{clean, CleanReport};
use crate::config::Config;
use crate::error::DeployError;
use crate::optimize::{optimize_assets, OptimizeSummary};
use crate::provider::{deploy_project, Provider};
use crate::runner::CommandRunner;
use crate::scan::{find_unused, ScanReport};
use crate::style;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    Scan,
    Optimize,
    Build,
    Deploy,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Clean,
        Stage::Scan,
        Stage::Optimize,
        Stage::Build,
        Stage::Deploy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Scan => "scan",
            Stage::Optimize => "optimize",
            Stage::Build => "build",
            Stage::Deploy => "deploy",
        }
    }

    /// Whether a failure in this stage ends the run
    pub fn is_gate(&self) -> bool {
        matches!(self, Stage::Build | Stage::Deploy)
    }

    fn banner(&self) -> &'static str {
        match self {
            Stage::Clean => "Cleaning unnecessary files",
            Stage::Scan => "Identifying unused files",
            Stage::Optimize => "Optimizing assets",
            Stage::Build => "Building the project",
            Stage::Deploy => "Deploying the project",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Deployed(Provider),
    BuildFailed,
    DeployFailed(Provider),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Deployed(_))
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    /// Stages that actually ran, in order
    pub stages: Vec<Stage>,
    pub clean: Option<CleanReport>,
    pub scan: Option<ScanReport>,
    pub optimize: Option<OptimizeSummary>,
    pub duration: Duration,
}

/// A configured run over one project
pub struct Pipeline<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    /// Gates always run; only advisory stages honor their skip flags
    fn enabled(&self, stage: Stage) -> bool {
        let skipped = match stage {
            Stage::Clean => self.config.skip_clean,
            Stage::Scan => self.config.skip_scan,
            Stage::Optimize => self.config.skip_optimize,
            Stage::Build | Stage::Deploy => false,
        };
        stage.is_gate() || !skipped
    }

    fn enter(&self, stage: Stage, stages: &mut Vec<Stage>) {
        info!(stage = %stage, gate = stage.is_gate(), "Entering stage");
        style::heading(stage.banner());
        stages.push(stage);
    }

    /// Run every stage. `Err` is reserved for problems outside any command
    /// (e.g. an unreadable manifest); a failing build or deploy command is
    /// an [`Outcome`].
    pub fn run(&self) -> Result<RunReport, DeployError> {
        let start = Instant::now();
        let root = self.config.root.as_path();
        let mut stages = Vec::with_capacity(Stage::ALL.len());
        let mut clean_report = None;
        let mut scan_report = None;
        let mut optimize_summary = None;

        if self.enabled(Stage::Clean) {
            self.enter(Stage::Clean, &mut stages);
            let patterns = &self.config.cleanup_patterns;
            clean_report = Some(clean(root, patterns, self.config.dry_run));
        }

        if self.enabled(Stage::Scan) {
            self.enter(Stage::Scan, &mut stages);
            scan_report = Some(find_unused(self.runner, root, &self.config.scan_dirs));
        }

        if self.enabled(Stage::Optimize) {
            self.enter(Stage::Optimize, &mut stages);
            optimize_summary = Some(optimize_assets(self.runner, root, &self.config.optimize));
        }

        let report = |outcome, stages| RunReport {
            outcome,
            stages,
            clean: clean_report,
            scan: scan_report,
            optimize: optimize_summary,
            duration: start.elapsed(),
        };

        self.enter(Stage::Build, &mut stages);
        if !build_project(self.runner, root)? {
            style::error("Build failed. Deployment aborted.");
            return Ok(report(Outcome::BuildFailed, stages));
        }

        self.enter(Stage::Deploy, &mut stages);
        let (provider, deployed) = deploy_project(self.runner, root, self.config.provider);
        if !deployed {
            style::error("Deployment failed.");
            return Ok(report(Outcome::DeployFailed(provider), stages));
        }

        info!(provider = %provider, "Deployment complete");
        Ok(report(Outcome::Deployed(provider), stages))
    }
}
