//! Console output formatting for the CLI.

use colored::Colorize;

/// Prints human-readable status lines, respecting `--no-color` and
/// verbosity.
pub struct OutputFormatter {
    use_color: bool,
    verbosity: u8,
}

impl OutputFormatter {
    /// Creates a formatter. `use_color` is further gated on `NO_COLOR`.
    pub fn new(use_color: bool, verbosity: u8) -> Self {
        Self {
            use_color: use_color && std::env::var("NO_COLOR").is_err(),
            verbosity,
        }
    }

    /// A section header for a phase or command group.
    pub fn section(&self, title: &str) {
        if self.use_color {
            println!("\n{}", title.cyan().bold());
        } else {
            println!("\n{title}");
        }
    }

    /// A successful outcome line.
    pub fn success(&self, message: &str) {
        if self.use_color {
            println!("{} {message}", "✓".green().bold());
        } else {
            println!("OK: {message}");
        }
    }

    /// A warning line, always shown regardless of verbosity.
    pub fn warn(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {message}", "!".yellow().bold());
        } else {
            eprintln!("WARN: {message}");
        }
    }

    /// An error line, always shown.
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {message}", "✗".red().bold());
        } else {
            eprintln!("ERROR: {message}");
        }
    }

    /// A debug line, only shown at verbosity >= 2.
    pub fn debug(&self, message: &str) {
        if self.verbosity >= 2 {
            println!("  {message}");
        }
    }

    /// A plain informational line.
    pub fn info(&self, message: &str) {
        println!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_gated_on_verbosity() {
        let quiet = OutputFormatter::new(false, 0);
        let loud = OutputFormatter::new(false, 2);
        quiet.debug("should not print, but should not panic either");
        loud.debug("should not panic");
    }
}
