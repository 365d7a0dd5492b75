//! Workspace cleanup ahead of a deployment.
//!
//! Patterns come in three shapes:
//! - `dir/` removes a directory tree
//! - `base/*.ext` removes matching immediate entries of `base`
//! - anything else removes that exact file or directory

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::DeployError;
use crate::style;

/// Transient, development and test artifacts that never ship
pub const DEFAULT_CLEANUP_PATTERNS: &[&str] = &[
    // OS metadata
    ".DS_Store",
    "Thumbs.db",
    // Local environment
    ".env.local",
    ".env.development",
    // Tool caches
    "node_modules/.cache",
    // Package manager logs
    "npm-debug.log",
    "yarn-debug.log",
    "yarn-error.log",
    // Tests
    "coverage/",
    "__tests__/",
    "*.test.js",
    "*.spec.js",
    // Editor backups
    "*.bak",
    "*~",
    // Unpublished content
    "content/drafts/",
];

/// A parsed cleanup pattern, relative to the project root
#[derive(Debug, Clone)]
pub enum CleanupPattern {
    /// Trailing separator: remove the directory tree
    Directory(PathBuf),
    /// Contains `*`: match entry names inside `base`
    Glob { base: PathBuf, pattern: Pattern },
    /// Remove this file or directory
    Exact(PathBuf),
}

impl CleanupPattern {
    /// Classify a raw pattern string
    pub fn parse(raw: &str) -> Result<Self, DeployError> {
        if let Some(dir) = raw.strip_suffix('/') {
            return Ok(Self::Directory(PathBuf::from(dir)));
        }

        if raw.contains('*') {
            let (base, name) = match raw.rsplit_once('/') {
                Some((base, name)) => (PathBuf::from(base), name),
                None => (PathBuf::new(), raw),
            };
            let pattern = Pattern::new(name).map_err(|source| DeployError::InvalidPattern {
                pattern: raw.to_string(),
                source,
            })?;
            return Ok(Self::Glob { base, pattern });
        }

        Ok(Self::Exact(PathBuf::from(raw)))
    }
}

/// What a cleanup pass did
#[derive(Debug, Default)]
pub struct CleanReport {
    /// Paths removed, relative to the project root
    pub removed: Vec<PathBuf>,
    /// Pattern and the error that interrupted it
    pub failures: Vec<(String, DeployError)>,
}

/// Removes one entry, given the project root and a path relative to it
type RemoveFn<'a> = &'a dyn Fn(&Path, &Path) -> Result<(), DeployError>;

/// Remove everything matching `patterns` under `root`.
///
/// Best-effort: a failing pattern is reported and the pass moves on. A
/// missing target is not a failure. With `dry_run` nothing is deleted and
/// `removed` lists what would have been.
pub fn clean(root: &Path, patterns: &[String], dry_run: bool) -> CleanReport {
    if dry_run {
        clean_with(root, patterns, true, &|_, _| Ok(()))
    } else {
        clean_with(root, patterns, false, &remove_entry)
    }
}

fn clean_with(root: &Path, patterns: &[String], dry_run: bool, remove: RemoveFn) -> CleanReport {
    let mut report = CleanReport::default();
    let verb = if dry_run { "Would remove" } else { "Removing" };

    for raw in patterns {
        let result = CleanupPattern::parse(raw).and_then(|pattern| {
            apply_pattern(root, &pattern, verb, remove, &mut report.removed)
        });

        if let Err(e) = result {
            debug!(pattern = %raw, "{e:#}");
            style::error(&format!("Error removing {raw}: {}", e.chain()));
            report.failures.push((raw.clone(), e));
        }
    }

    debug!(
        removed = report.removed.len(),
        failed = report.failures.len(),
        dry_run,
        "Cleanup done"
    );
    report
}

fn apply_pattern(
    root: &Path,
    pattern: &CleanupPattern,
    verb: &str,
    remove: RemoveFn,
    removed: &mut Vec<PathBuf>,
) -> Result<(), DeployError> {
    match pattern {
        CleanupPattern::Directory(rel) => {
            if root.join(rel).is_dir() {
                style::info(&format!("{verb} directory: {}", rel.display()));
                remove(root, rel)?;
                removed.push(rel.clone());
            }
            Ok(())
        }
        CleanupPattern::Glob { base, pattern } => {
            // Every match is attempted; the first failure fails the pattern
            let mut first_error = None;
            for rel in matching_entries(root, base, pattern)? {
                style::info(&format!("{verb} file: {}", rel.display()));
                match remove(root, &rel) {
                    Ok(()) => removed.push(rel),
                    Err(e) => {
                        debug!(path = %rel.display(), "{e:#}");
                        style::warn(&format!("Could not remove {}: {}", rel.display(), e.chain()));
                        first_error.get_or_insert(e);
                    }
                }
            }
            first_error.map_or(Ok(()), Err)
        }
        CleanupPattern::Exact(rel) => {
            // symlink_metadata so a dangling link still counts as present
            if fs::symlink_metadata(root.join(rel)).is_ok() {
                style::info(&format!("{verb}: {}", rel.display()));
                remove(root, rel)?;
                removed.push(rel.clone());
            }
            Ok(())
        }
    }
}

/// Immediate entries of `root/base` whose names match `pattern`, sorted by name
pub fn matching_entries(
    root: &Path,
    base: &Path,
    pattern: &Pattern,
) -> Result<Vec<PathBuf>, DeployError> {
    let dir = root.join(base);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| DeployError::ListFailed {
            path: dir.clone(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy();
        if pattern.matches(&name) {
            matches.push(base.join(entry.file_name()));
        }
    }

    Ok(matches)
}

/// Remove a file, link or directory tree, tolerating a concurrent disappearance
fn remove_entry(root: &Path, rel: &Path) -> Result<(), DeployError> {
    let path = root.join(rel);
    let metadata = match fs::symlink_metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => return Err(DeployError::RemoveFailed { path, source }),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DeployError::RemoveFailed { path, source }),
    }
}
