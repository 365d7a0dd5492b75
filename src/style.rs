//! Console formatting for progress output.
//!
//! Styling is a pure function of a semantic [`Tone`]; nothing here keeps
//! process-wide state. `colored` already drops escape codes when stdout is
//! not a terminal or `NO_COLOR` is set.

use colored::{ColoredString, Colorize};

/// Semantic category of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Stage banner
    Heading,
    /// Progress detail
    Info,
    /// Advisory problem
    Warn,
    /// Fatal problem
    Error,
    /// Final confirmation
    Success,
}

/// Style `text` for its tone
pub fn paint(tone: Tone, text: &str) -> ColoredString {
    match tone {
        Tone::Heading => text.bold(),
        Tone::Info => text.dimmed(),
        Tone::Warn => text.yellow(),
        Tone::Error => text.red().bold(),
        Tone::Success => text.green().bold(),
    }
}

/// Print a stage banner
pub fn heading(text: &str) {
    println!("\n{}", paint(Tone::Heading, text));
}

pub fn info(text: &str) {
    println!("{}", paint(Tone::Info, text));
}

pub fn warn(text: &str) {
    eprintln!("{}", paint(Tone::Warn, text));
}

pub fn error(text: &str) {
    eprintln!("{}", paint(Tone::Error, text));
}

pub fn success(text: &str) {
    println!("{}", paint(Tone::Success, text));
}
