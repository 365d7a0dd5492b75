//! Hosting providers and the deploy step.
//!
//! The provider is picked from marker files in the project root, checked in
//! [`PROVIDERS`] order; the first marker present wins.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::error::DeployError;
use crate::runner::{execute, CommandRunner, CommandSpec};
use crate::style;

/// Static hosting provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Vercel,
    Netlify,
    Firebase,
    Wix,
}

/// Detection order: marker file and the provider it selects
pub const PROVIDERS: &[(&str, Provider)] = &[
    ("vercel.json", Provider::Vercel),
    ("netlify.toml", Provider::Netlify),
    ("firebase.json", Provider::Firebase),
    ("wix.config.js", Provider::Wix),
];

/// Used when no marker file is present
pub const DEFAULT_PROVIDER: Provider = Provider::Vercel;

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Vercel => "vercel",
            Provider::Netlify => "netlify",
            Provider::Firebase => "firebase",
            Provider::Wix => "wix",
        }
    }

    /// Marker file that selects this provider
    pub fn marker(&self) -> &'static str {
        PROVIDERS
            .iter()
            .find(|(_, provider)| provider == self)
            .map(|(marker, _)| *marker)
            .unwrap_or_default()
    }

    /// Provider CLI program
    pub fn program(&self) -> &'static str {
        self.as_str()
    }

    /// Arguments for a production deploy
    pub fn deploy_args(&self) -> &'static [&'static str] {
        match self {
            Provider::Vercel => &["--prod"],
            Provider::Netlify => &["deploy", "--prod"],
            Provider::Firebase => &["deploy"],
            Provider::Wix => &["sites", "publish"],
        }
    }

    pub fn deploy_command(&self, root: &Path) -> CommandSpec {
        CommandSpec::new(self.program(), root, "Deployment failed")
            .args(self.deploy_args().iter().copied())
            .fatal()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vercel" => Ok(Provider::Vercel),
            "netlify" => Ok(Provider::Netlify),
            "firebase" => Ok(Provider::Firebase),
            "wix" => Ok(Provider::Wix),
            _ => Err(DeployError::UnknownProvider {
                name: s.to_string(),
            }),
        }
    }
}

/// How the provider was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Forced from the command line
    Explicit(Provider),
    /// Marker file found
    Detected(Provider),
    /// Nothing found, using [`DEFAULT_PROVIDER`]
    Fallback(Provider),
}

impl Selection {
    pub fn provider(&self) -> Provider {
        match *self {
            Selection::Explicit(p) | Selection::Detected(p) | Selection::Fallback(p) => p,
        }
    }
}

/// First provider whose marker file exists in `root`
pub fn detect_provider(root: &Path) -> Option<Provider> {
    PROVIDERS
        .iter()
        .find(|(marker, _)| root.join(marker).exists())
        .map(|(_, provider)| *provider)
}

pub fn select_provider(root: &Path, explicit: Option<Provider>) -> Selection {
    if let Some(provider) = explicit {
        return Selection::Explicit(provider);
    }
    match detect_provider(root) {
        Some(provider) => Selection::Detected(provider),
        None => Selection::Fallback(DEFAULT_PROVIDER),
    }
}

/// Deploy with the selected provider. Returns whether the deploy succeeded.
pub fn deploy_project(
    runner: &dyn CommandRunner,
    root: &Path,
    explicit: Option<Provider>,
) -> (Provider, bool) {
    let selection = select_provider(root, explicit);
    match selection {
        Selection::Explicit(p) => debug!(provider = %p, "Provider set on command line"),
        Selection::Detected(p) => debug!(provider = %p, marker = p.marker(), "Provider detected"),
        Selection::Fallback(p) => {
            debug!(provider = %p, "No marker file found");
            style::warn(&format!(
                "No deployment configuration detected, defaulting to {p}"
            ));
        }
    }

    let provider = selection.provider();
    (provider, execute(runner, &provider.deploy_command(root)))
}
