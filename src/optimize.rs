//! Optional image and stylesheet optimization.
//!
//! Both branches are best-effort: a failing tool is reported and the
//! pipeline carries on with whatever assets it has.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::runner::{execute, CommandRunner, CommandSpec};
use crate::style;

/// Image optimizer binary
pub const IMAGEMIN: &str = "imagemin";

/// Where optimization inputs live, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeSettings {
    pub image_dir: PathBuf,
    pub styles_dir: PathBuf,
    pub skip_css_minify: bool,
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("public/images"),
            styles_dir: PathBuf::from("public/styles"),
            skip_css_minify: false,
        }
    }
}

/// Commands attempted and how many of them failed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeSummary {
    pub attempted: usize,
    pub failed: usize,
}

impl OptimizeSummary {
    fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if !ok {
            self.failed += 1;
        }
    }
}

/// Run the image and CSS branches
pub fn optimize_assets(
    runner: &dyn CommandRunner,
    root: &Path,
    settings: &OptimizeSettings,
) -> OptimizeSummary {
    let mut summary = OptimizeSummary::default();

    if !runner.is_available(IMAGEMIN) {
        style::info("Installing imagemin for image optimization...");
        summary.record(execute(runner, &install_imagemin_command(root)));
    }

    if root.join(&settings.image_dir).is_dir() {
        let images = expand(root, &settings.image_dir, "*");
        match optimize_images_command(root, &settings.image_dir, &images) {
            Some(spec) => {
                style::info("Optimizing images...");
                summary.record(execute(runner, &spec));
            }
            None => debug!(dir = %settings.image_dir.display(), "No images to optimize"),
        }
    }

    if root.join(&settings.styles_dir).is_dir() {
        if settings.skip_css_minify {
            debug!("CSS minification skipped");
        } else {
            let sheets = expand(root, &settings.styles_dir, "*.css");
            match minify_css_command(root, &settings.styles_dir, &sheets) {
                Some(spec) => {
                    style::info("Minifying CSS...");
                    summary.record(execute(runner, &spec));
                }
                None => debug!(dir = %settings.styles_dir.display(), "No stylesheets to minify"),
            }
        }
    }

    summary
}

pub fn install_imagemin_command(root: &Path) -> CommandSpec {
    CommandSpec::new("npm", root, "Failed to install imagemin").args([
        "install",
        "-g",
        "imagemin-cli",
    ])
}

/// `imagemin <files> --out-dir=<dir>`, or `None` with nothing to process
pub fn optimize_images_command(
    root: &Path,
    image_dir: &Path,
    images: &[PathBuf],
) -> Option<CommandSpec> {
    if images.is_empty() {
        return None;
    }
    Some(
        CommandSpec::new(IMAGEMIN, root, "Image optimization failed")
            .args(images.iter().map(|p| p.display().to_string()))
            .arg(format!("--out-dir={}", image_dir.display())),
    )
}

/// `npx postcss <sheets> --use cssnano --dir <dir>/min`, or `None` with nothing to process
pub fn minify_css_command(
    root: &Path,
    styles_dir: &Path,
    sheets: &[PathBuf],
) -> Option<CommandSpec> {
    if sheets.is_empty() {
        return None;
    }
    Some(
        CommandSpec::new("npx", root, "CSS minification failed")
            .arg("postcss")
            .args(sheets.iter().map(|p| p.display().to_string()))
            .args(["--use", "cssnano", "--dir"])
            .arg(styles_dir.join("min").display().to_string()),
    )
}

/// Expand `dir/pattern` the way a shell would, relative to `root`, files only
fn expand(root: &Path, dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let base = root.join(dir);
    let Some(base) = base.to_str() else {
        warn!(dir = %dir.display(), "Non UTF-8 path, skipping expansion");
        return Vec::new();
    };
    // The directory part is literal; only `pattern` may carry wildcards
    let full = format!(
        "{}{}{pattern}",
        glob::Pattern::escape(base),
        std::path::MAIN_SEPARATOR
    );

    // `*` skips dotfiles, as in a shell
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let paths = match glob::glob_with(&full, options) {
        Ok(paths) => paths,
        Err(e) => {
            warn!(pattern = %full, "{e}");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = paths
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .filter_map(|p| p.strip_prefix(root).map(Path::to_path_buf).ok())
        .collect();
    files.sort();
    files
}
