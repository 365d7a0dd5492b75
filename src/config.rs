//! CLI configuration and runtime settings for a deployment run.

use clap::Parser;
use std::ffi::OsStr;
use std::path::PathBuf;

use crate::clean::DEFAULT_CLEANUP_PATTERNS;
use crate::error::DeployError;
use crate::optimize::OptimizeSettings;
use crate::provider::Provider;
use crate::scan::DEFAULT_SCAN_DIRS;

/// Environment variable that disables CSS minification when non-empty
pub const SKIP_CSS_MINIFY_ENV: &str = "SKIP_CSS_MINIFY";

/// Clean, optimize, build and deploy a static site
#[derive(Parser, Debug)]
#[command(name = "site-deploy")]
#[command(version)]
#[command(about = "Clean, optimize, build and deploy a static site")]
pub struct Cli {
    /// Project root directory
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Deploy with this provider instead of detecting it (vercel, netlify, firebase, wix)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Skip workspace cleanup
    #[arg(long)]
    pub skip_clean: bool,

    /// Skip the unused file scan
    #[arg(long)]
    pub skip_scan: bool,

    /// Skip image and CSS optimization
    #[arg(long)]
    pub skip_optimize: bool,

    /// Do not minify CSS (also set by SKIP_CSS_MINIFY)
    #[arg(long)]
    pub skip_css_minify: bool,

    /// Print commands instead of running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Runtime configuration parsed from CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; every relative path and command is anchored here
    pub root: PathBuf,
    /// Forced provider (None = detect from marker files)
    pub provider: Option<Provider>,
    /// Cleanup patterns, in order
    pub cleanup_patterns: Vec<String>,
    /// Directories scanned for unused files
    pub scan_dirs: Vec<String>,
    pub optimize: OptimizeSettings,
    pub skip_clean: bool,
    pub skip_scan: bool,
    pub skip_optimize: bool,
    pub dry_run: bool,
}

impl Config {
    /// Create Config from CLI arguments and the process environment
    pub fn from_cli(cli: Cli) -> Result<Self, DeployError> {
        let env = std::env::var_os(SKIP_CSS_MINIFY_ENV);
        Self::from_cli_with_env(cli, env.as_deref())
    }

    /// Create Config from CLI arguments and an explicit `SKIP_CSS_MINIFY` value
    pub fn from_cli_with_env(cli: Cli, skip_css_env: Option<&OsStr>) -> Result<Self, DeployError> {
        if !cli.root.is_dir() {
            return Err(DeployError::RootNotFound { path: cli.root });
        }
        let root = cli.root.canonicalize().unwrap_or(cli.root);

        let provider = cli.provider.as_deref().map(str::parse::<Provider>).transpose()?;

        Ok(Config {
            root,
            provider,
            cleanup_patterns: DEFAULT_CLEANUP_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scan_dirs: DEFAULT_SCAN_DIRS.iter().map(|s| s.to_string()).collect(),
            optimize: OptimizeSettings {
                skip_css_minify: cli.skip_css_minify || env_flag_set(skip_css_env),
                ..OptimizeSettings::default()
            },
            skip_clean: cli.skip_clean,
            skip_scan: cli.skip_scan,
            skip_optimize: cli.skip_optimize,
            dry_run: cli.dry_run,
        })
    }
}

/// Any non-empty value counts as set
fn env_flag_set(value: Option<&OsStr>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}
