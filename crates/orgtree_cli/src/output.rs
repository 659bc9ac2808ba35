use owo_colors::OwoColorize;
use serde::Serialize;

/// Standard output formatting for the CLI
///
/// Results are written to stdout as JSON; everything else goes to stderr.
#[derive(Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    /// Print a result as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> miette::Result<()> {
        let rendered = serde_json::to_string_pretty(value)
            .map_err(|e| miette::miette!("Could not render output: {}", e))?;
        println!("{}", rendered);
        Ok(())
    }

    /// Print an info message (indented)
    pub fn info(&self, label: &str, value: &str) {
        eprintln!("  {} {}", label.bright_blue(), value);
    }

    /// Print a success message (indented)
    pub fn success(&self, message: &str) {
        eprintln!("  {} {}", "✓".bright_green(), message);
    }

    /// Print a warning message (indented)
    pub fn warning(&self, message: &str) {
        eprintln!("  {} {}", "⚠".yellow(), message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        eprintln!();
        eprintln!("{}", title.bright_cyan().bold());
        eprintln!("{}", "─".repeat(40).dimmed());
    }
}
