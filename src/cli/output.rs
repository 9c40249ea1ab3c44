//! Terminal output for the CLI.
//!
//! Styled progress, success and warning lines, plus indented subprocess
//! output shown in verbose mode.

use console::{Term, style};
use std::io;

/// Writes user-facing messages honouring verbose/quiet flags.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    /// Creates an output manager.
    ///
    /// `quiet` wins over `verbose`: only warnings and errors are printed.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Whether verbose output is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Whether normal output is suppressed.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Prints a dimmed message in verbose mode.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.is_verbose() {
            return Ok(());
        }
        Term::stdout().write_line(&format!("  {}", style(message).dim()))
    }

    /// Prints subprocess output, indented, in verbose mode.
    pub fn indent(&self, message: &str) -> io::Result<()> {
        if !self.is_verbose() {
            return Ok(());
        }
        Term::stdout().write_line(&format!("    {}", message))
    }

    /// Prints a progress message.
    pub fn progress(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        Term::stdout().write_line(&format!("{} {}", style("→").cyan(), message))
    }

    /// Prints a success message.
    pub fn success(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        Term::stdout().write_line(&format!("{} {}", style("✓").green().bold(), message))
    }

    /// Prints a warning to stderr.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        Term::stderr().write_line(&format!("{} {}", style("⚠").yellow().bold(), message))
    }

    /// Prints an error to stderr.
    pub fn error(&self, message: &str) -> io::Result<()> {
        Term::stderr().write_line(&format!("{} {}", style("✗").red().bold(), message))
    }

    /// Prints a section header.
    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let term = Term::stdout();
        term.write_line("")?;
        term.write_line(&style(title).bold().to_string())
    }
}
