//! Project build step.
//!
//! The build command comes from the `scripts` table of `package.json`:
//! `npm run build:prod` when that script is declared, `npm run build`
//! otherwise (including when there is no manifest at all). Only invalid
//! JSON is fatal; a manifest with an odd shape just declares no scripts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::DeployError;
use crate::runner::{execute, CommandRunner, CommandSpec};

pub const MANIFEST_FILE: &str = "package.json";

/// Production build script, preferred when declared
pub const PROD_SCRIPT: &str = "build:prod";
pub const DEFAULT_SCRIPT: &str = "build";

/// The parts of `package.json` the build step reads
#[derive(Debug, Default, Deserialize)]
pub struct PackageManifest {
    /// Script bodies are not interpreted, so any JSON value is accepted
    #[serde(default)]
    pub scripts: Option<BTreeMap<String, Value>>,
}

impl PackageManifest {
    pub fn has_script(&self, name: &str) -> bool {
        self.scripts
            .as_ref()
            .is_some_and(|scripts| scripts.contains_key(name))
    }

    /// Interpret parsed JSON; a shape that is not a manifest declares nothing
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            debug!("Ignoring unexpected manifest shape: {e}");
            Self::default()
        })
    }
}

/// Read `package.json` from `root`; `Ok(None)` when there is none
pub fn read_manifest(root: &Path) -> Result<Option<PackageManifest>, DeployError> {
    let path = root.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path).map_err(|source| DeployError::ManifestRead {
        path: path.clone(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|source| DeployError::Manifest { path, source })?;
    Ok(Some(PackageManifest::from_value(value)))
}

/// Name of the npm script to run
pub fn select_build_script(manifest: Option<&PackageManifest>) -> &'static str {
    match manifest {
        Some(m) if m.has_script(PROD_SCRIPT) => PROD_SCRIPT,
        _ => DEFAULT_SCRIPT,
    }
}

pub fn build_command(root: &Path, script: &str) -> CommandSpec {
    CommandSpec::new("npm", root, "Build failed")
        .args(["run", script])
        .fatal()
}

/// Build the project. `Ok(false)` when the build command fails.
pub fn build_project(runner: &dyn CommandRunner, root: &Path) -> Result<bool, DeployError> {
    let manifest = read_manifest(root)?;
    let script = select_build_script(manifest.as_ref());
    debug!(script, manifest = manifest.is_some(), "Selected build script");

    Ok(execute(runner, &build_command(root, script)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutcome;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Recorder {
        exit: i32,
        seen: RefCell<Vec<String>>,
    }

    impl Recorder {
        fn exiting(exit: i32) -> Self {
            Self {
                exit,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for Recorder {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
            self.seen.borrow_mut().push(spec.command_line());
            Ok(CommandOutcome::exited(self.exit))
        }

        fn is_available(&self, _program: &str) -> bool {
            true
        }
    }

    fn write_manifest(root: &Path, json: &str) {
        fs::write(root.join(MANIFEST_FILE), json).unwrap();
    }

    // ==================== read_manifest tests ====================

    #[test]
    fn test_read_manifest_missing() {
        let temp = TempDir::new().unwrap();
        assert!(read_manifest(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_manifest_scripts() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            r#"{"name": "site", "scripts": {"build": "vite build", "test": "vitest"}}"#,
        );

        let manifest = read_manifest(temp.path()).unwrap().unwrap();

        assert!(manifest.has_script("build"));
        assert!(manifest.has_script("test"));
        assert!(!manifest.has_script(PROD_SCRIPT));
    }

    #[test]
    fn test_read_manifest_without_scripts() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"name": "site"}"#);

        let manifest = read_manifest(temp.path()).unwrap().unwrap();

        assert!(manifest.scripts.is_none());
    }

    #[test]
    fn test_read_manifest_null_scripts() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"name": "site", "scripts": null}"#);

        let manifest = read_manifest(temp.path()).unwrap().unwrap();

        assert!(!manifest.has_script(DEFAULT_SCRIPT));
    }

    #[test]
    fn test_read_manifest_non_string_script_values() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            r#"{"scripts": {"build:prod": ["vite", "build"], "lint": 3, "build": "vite build"}}"#,
        );

        let manifest = read_manifest(temp.path()).unwrap().unwrap();

        assert!(manifest.has_script(PROD_SCRIPT));
        assert!(manifest.has_script("lint"));
        assert_eq!(select_build_script(Some(&manifest)), PROD_SCRIPT);
    }

    #[test]
    fn test_read_manifest_scripts_wrong_type() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"scripts": ["build"]}"#);

        let manifest = read_manifest(temp.path()).unwrap().unwrap();

        assert!(manifest.scripts.is_none());
    }

    #[test]
    fn test_read_manifest_malformed() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "{ not json");

        let result = read_manifest(temp.path());

        assert!(matches!(result, Err(DeployError::Manifest { .. })));
    }

    // ==================== select_build_script tests ====================

    #[test]
    fn test_select_prefers_prod_script() {
        let temp = TempDir::new().unwrap();
        write_manifest(
            temp.path(),
            r#"{"scripts": {"build": "vite build", "build:prod": "vite build --mode production"}}"#,
        );
        let manifest = read_manifest(temp.path()).unwrap();

        assert_eq!(select_build_script(manifest.as_ref()), "build:prod");
    }

    #[test]
    fn test_select_default_without_manifest() {
        assert_eq!(select_build_script(None), "build");
    }

    #[test]
    fn test_select_default_without_build_script() {
        let manifest = PackageManifest::default();
        assert_eq!(select_build_script(Some(&manifest)), "build");
    }

    // ==================== build_project tests ====================

    #[test]
    fn test_build_command_is_fatal() {
        let spec = build_command(Path::new("/site"), "build");
        assert_eq!(spec.command_line(), "npm run build");
        assert_eq!(spec.severity, crate::runner::Severity::Fatal);
    }

    #[test]
    fn test_build_project_without_build_script_still_runs_default() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), r#"{"scripts": {"start": "serve"}}"#);
        let runner = Recorder::exiting(1);

        let ok = build_project(&runner, temp.path()).unwrap();

        assert!(!ok);
        assert_eq!(runner.seen.borrow().as_slice(), ["npm run build"]);
    }

    #[test]
    fn test_build_project_success() {
        let temp = TempDir::new().unwrap();
        let runner = Recorder::exiting(0);

        assert!(build_project(&runner, temp.path()).unwrap());
    }

    #[test]
    fn test_build_project_non_object_manifest_runs_default() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "42");
        let runner = Recorder::exiting(0);

        assert!(build_project(&runner, temp.path()).unwrap());
        assert_eq!(runner.seen.borrow().as_slice(), ["npm run build"]);
    }

    #[test]
    fn test_build_project_malformed_manifest_is_error() {
        let temp = TempDir::new().unwrap();
        write_manifest(temp.path(), "{\"scripts\": {");
        let runner = Recorder::exiting(0);

        let result = build_project(&runner, temp.path());

        assert!(result.is_err());
        assert!(runner.seen.borrow().is_empty());
    }
}
