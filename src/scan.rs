//! Heuristic detection of assets nothing imports.
//!
//! For every file in a watched directory the source tree is searched for an
//! import of the file's stem (`from '.../Button'`). Files without a hit are
//! reported as potentially unused. Nothing is ever deleted; the result is
//! advisory and can be wrong in both directions (dynamic imports,
//! re-exports, names that only appear in comments).

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::DeployError;
use crate::runner::{CommandRunner, CommandSpec};
use crate::style;

/// Directories checked for unused files
pub const DEFAULT_SCAN_DIRS: &[&str] = &[
    "public/images",
    "src/components",
    "src/pages",
    "src/styles",
];

/// Source files searched for references
pub const SOURCE_GLOBS: &[&str] = &["*.js", "*.jsx", "*.ts", "*.tsx"];

/// Directories never searched
const SEARCH_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git"];

/// grep exits 1 when nothing matched
const GREP_NO_MATCH: i32 = 1;

/// Findings of one scan
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files with no import reference, relative to the project root
    pub unused: Vec<PathBuf>,
    /// Files whose search could not be completed
    pub failed: Vec<PathBuf>,
    /// Number of files checked
    pub checked: usize,
}

/// Result of searching for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Found,
    Missing,
}

/// Scan each of `dirs` (relative to `root`) for unreferenced files
pub fn find_unused(runner: &dyn CommandRunner, root: &Path, dirs: &[String]) -> ScanReport {
    let mut report = ScanReport::default();

    for dir in dirs {
        let dir = Path::new(dir);
        if !root.join(dir).is_dir() {
            debug!(dir = %dir.display(), "Scan directory missing, skipping");
            continue;
        }

        style::info(&format!("Checking directory: {}", dir.display()));
        let listing = list_files(root, dir);

        for (path, e) in listing.unreadable {
            debug!(path = %path.display(), "{e:#}");
            style::warn(&format!("Could not read {}: {}", path.display(), e.chain()));
            report.failed.push(path);
        }

        for file in listing.files {
            report.checked += 1;
            match search_reference(runner, root, &file) {
                Ok(Reference::Found) => {}
                Ok(Reference::Missing) => {
                    style::warn(&format!("Potentially unused file: {}", file.display()));
                    report.unused.push(file);
                }
                Err(e) => {
                    debug!(file = %file.display(), "{e:#}");
                    style::warn(&format!("Could not search for {}: {}", file.display(), e.chain()));
                    report.failed.push(file);
                }
            }
        }
    }

    report
}

/// Entries of one scan directory
#[derive(Debug, Default)]
pub struct Listing {
    /// Regular files, sorted, relative to the project root
    pub files: Vec<PathBuf>,
    /// Entries that could not be inspected (e.g. dangling links)
    pub unreadable: Vec<(PathBuf, DeployError)>,
}

/// Regular files directly inside `root/dir`. An entry that cannot be
/// inspected is recorded and the walk continues.
pub fn list_files(root: &Path, dir: &Path) -> Listing {
    let mut listing = Listing::default();
    for entry in WalkDir::new(root.join(dir))
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                listing.files.push(dir.join(entry.file_name()));
            }
            Ok(_) => {}
            Err(source) => {
                let path = source
                    .path()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                listing.unreadable.push((
                    path,
                    DeployError::ListFailed {
                        path: root.join(dir),
                        source,
                    },
                ));
            }
        }
    }
    listing
}

/// Search the tree under `root` for an import of `file`'s stem
pub fn search_reference(
    runner: &dyn CommandRunner,
    root: &Path,
    file: &Path,
) -> Result<Reference, DeployError> {
    let Some(stem) = file.file_stem().map(|s| s.to_string_lossy()) else {
        return Ok(Reference::Missing);
    };

    let spec = reference_search_command(root, &stem);
    let outcome = runner.run(&spec)?;

    match outcome.code {
        Some(0) if !outcome.stdout.trim().is_empty() => Ok(Reference::Found),
        Some(0) | Some(GREP_NO_MATCH) => Ok(Reference::Missing),
        code => Err(DeployError::CommandFailed {
            label: spec.label.clone(),
            command: spec.command_line(),
            code,
        }),
    }
}

/// `grep` invocation matching `from '<anything><stem>'` in source files
pub fn reference_search_command(root: &Path, stem: &str) -> CommandSpec {
    let pattern = format!(r#"from ['"].*{}['"]"#, escape_ere(stem));

    let mut spec = CommandSpec::new("grep", root, "Reference search failed")
        .args(["-r", "-E", "-l"])
        .captured();
    for glob in SOURCE_GLOBS {
        spec = spec.arg(format!("--include={glob}"));
    }
    for dir in SEARCH_EXCLUDED_DIRS {
        spec = spec.arg(format!("--exclude-dir={dir}"));
    }
    spec.args(["-e".to_string(), pattern, ".".to_string()])
}

/// Escape POSIX extended-regex metacharacters
fn escape_ere(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '.' | '[' | ']' | '(' | ')' | '*' | '+' | '?' | '{' | '}' | '|' | '^' | '$' | '\\'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutcome;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    /// Answers each search by looking the pattern up in a table
    struct GrepStub {
        hits: Vec<&'static str>,
        error_for: Option<&'static str>,
        calls: RefCell<usize>,
    }

    impl GrepStub {
        fn new(hits: &[&'static str]) -> Self {
            Self {
                hits: hits.to_vec(),
                error_for: None,
                calls: RefCell::new(0),
            }
        }
    }

    impl CommandRunner for GrepStub {
        fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
            *self.calls.borrow_mut() += 1;
            let pattern = spec.args.iter().rev().nth(1).cloned().unwrap_or_default();
            if self.error_for.is_some_and(|stem| pattern.contains(stem)) {
                return Ok(CommandOutcome::exited(2));
            }
            if self.hits.iter().any(|stem| pattern.contains(stem)) {
                Ok(CommandOutcome::exited(0).with_stdout("./src/index.js\n"))
            } else {
                Ok(CommandOutcome::exited(GREP_NO_MATCH))
            }
        }

        fn is_available(&self, _program: &str) -> bool {
            true
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn dirs(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    // ==================== reference_search_command tests ====================

    #[test]
    fn test_search_command_shape() {
        let spec = reference_search_command(Path::new("/site"), "Button");
        assert_eq!(spec.program, "grep");
        assert_eq!(spec.current_dir, PathBuf::from("/site"));
        assert!(spec.args.contains(&"--include=*.tsx".to_string()));
        assert!(spec.args.contains(&"--exclude-dir=node_modules".to_string()));
        assert_eq!(spec.args.last().map(String::as_str), Some("."));
        assert_eq!(
            spec.args.iter().rev().nth(1).map(String::as_str),
            Some(r#"from ['"].*Button['"]"#)
        );
        assert_eq!(spec.output, crate::runner::OutputMode::Capture);
    }

    #[test]
    fn test_escape_ere() {
        assert_eq!(escape_ere("app.test"), r"app\.test");
        assert_eq!(escape_ere("a(1)+b"), r"a\(1\)\+b");
        assert_eq!(escape_ere("plain-name_2"), "plain-name_2");
    }

    // ==================== search_reference tests ====================

    #[test]
    fn test_search_reference_found() {
        let stub = GrepStub::new(&["Header"]);
        let file = Path::new("src/components/Header.jsx");
        let result = search_reference(&stub, Path::new("."), file);
        assert_eq!(result.unwrap(), Reference::Found);
    }

    #[test]
    fn test_search_reference_no_match_exit() {
        let stub = GrepStub::new(&[]);
        let file = Path::new("src/components/Old.jsx");
        let result = search_reference(&stub, Path::new("."), file);
        assert_eq!(result.unwrap(), Reference::Missing);
    }

    #[test]
    fn test_search_reference_empty_output_is_missing() {
        struct Silent;
        impl CommandRunner for Silent {
            fn run(&self, _spec: &CommandSpec) -> Result<CommandOutcome, DeployError> {
                Ok(CommandOutcome::exited(0))
            }
            fn is_available(&self, _program: &str) -> bool {
                true
            }
        }
        let result = search_reference(&Silent, Path::new("."), Path::new("a/b.js"));
        assert_eq!(result.unwrap(), Reference::Missing);
    }

    #[test]
    fn test_search_reference_genuine_error() {
        let mut stub = GrepStub::new(&[]);
        stub.error_for = Some("Broken");
        let result = search_reference(&stub, Path::new("."), Path::new("x/Broken.js"));
        assert!(matches!(
            result,
            Err(DeployError::CommandFailed { code: Some(2), .. })
        ));
    }

    // ==================== find_unused tests ====================

    #[test]
    fn test_find_unused_reports_unreferenced_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/components/Header.jsx");
        touch(temp.path(), "src/components/Legacy.jsx");
        touch(temp.path(), "public/images/logo.png");

        let stub = GrepStub::new(&["Header", "logo"]);
        let report = find_unused(&stub, temp.path(), &dirs(DEFAULT_SCAN_DIRS));

        assert_eq!(report.unused, vec![PathBuf::from("src/components/Legacy.jsx")]);
        assert!(report.failed.is_empty());
        assert_eq!(report.checked, 3);
    }

    #[test]
    fn test_find_unused_is_not_recursive() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/pages/nested/Deep.jsx");

        let stub = GrepStub::new(&[]);
        let report = find_unused(&stub, temp.path(), &dirs(&["src/pages"]));

        assert_eq!(report.checked, 0);
        assert_eq!(*stub.calls.borrow(), 0);
    }

    #[test]
    fn test_find_unused_skips_missing_directories() {
        let temp = TempDir::new().unwrap();
        let stub = GrepStub::new(&[]);

        let report = find_unused(&stub, temp.path(), &dirs(DEFAULT_SCAN_DIRS));

        assert_eq!(report, ScanReport::default());
    }

    #[test]
    fn test_find_unused_search_error_not_flagged() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/styles/Broken.css");

        let mut stub = GrepStub::new(&[]);
        stub.error_for = Some("Broken");
        let report = find_unused(&stub, temp.path(), &dirs(&["src/styles"]));

        assert!(report.unused.is_empty());
        assert_eq!(report.failed, vec![PathBuf::from("src/styles/Broken.css")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_unused_dangling_link_does_not_hide_directory() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/components/Legacy.jsx");
        touch(temp.path(), "src/components/Old.jsx");
        std::os::unix::fs::symlink(
            "gone.jsx",
            temp.path().join("src/components/Broken.jsx"),
        )
        .unwrap();

        let stub = GrepStub::new(&[]);
        let report = find_unused(&stub, temp.path(), &dirs(&["src/components"]));

        assert_eq!(report.checked, 2);
        assert_eq!(
            report.unused,
            vec![
                PathBuf::from("src/components/Legacy.jsx"),
                PathBuf::from("src/components/Old.jsx")
            ]
        );
        assert_eq!(report.failed, vec![PathBuf::from("src/components/Broken.jsx")]);
    }

    #[test]
    fn test_find_unused_idempotent_and_read_only() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/components/B.jsx");
        touch(temp.path(), "src/components/A.jsx");

        let stub = GrepStub::new(&[]);
        let first = find_unused(&stub, temp.path(), &dirs(&["src/components"]));
        let second = find_unused(&stub, temp.path(), &dirs(&["src/components"]));

        assert_eq!(first, second);
        assert_eq!(
            first.unused,
            vec![
                PathBuf::from("src/components/A.jsx"),
                PathBuf::from("src/components/B.jsx")
            ]
        );
        assert!(temp.path().join("src/components/A.jsx").exists());
        assert!(temp.path().join("src/components/B.jsx").exists());
    }
}
