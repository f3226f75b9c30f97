//! Terminal console for gitbridge.
//!
//! Renders console lines to stdout/stderr for terminal display.
//! This module is allowed to use stdout/stderr directly as it's the output layer.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::console::{ConsoleSink, ConsoleStyle};
use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_DIM: &str = "\x1b[2m";
const ANSI_RESET: &str = "\x1b[0m";

/// Terminal console configuration.
#[derive(Debug, Clone)]
pub struct TerminalConsoleConfig {
    /// Whether to use ANSI colors.
    pub colors: bool,
    /// Whether to show system output (command lines, version notices).
    pub show_system_output: bool,
}

impl Default for TerminalConsoleConfig {
    fn default() -> Self {
        Self {
            colors: io::stderr().is_terminal(),
            show_system_output: true,
        }
    }
}

/// Console sink that writes normal output to stdout and everything else to stderr.
#[derive(Debug, Default)]
pub struct TerminalConsole {
    config: TerminalConsoleConfig,
}

impl TerminalConsole {
    /// Create a new terminal console with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new terminal console with the given configuration.
    #[must_use]
    pub const fn with_config(config: TerminalConsoleConfig) -> Self {
        Self { config }
    }

    fn decorate(&self, style: ConsoleStyle) -> (&'static str, &'static str) {
        if !self.config.colors {
            return ("", "");
        }
        match style {
            ConsoleStyle::Normal => ("", ""),
            ConsoleStyle::Error => (ANSI_RED, ANSI_RESET),
            ConsoleStyle::SystemOutput => (ANSI_DIM, ANSI_RESET),
        }
    }
}

impl ConsoleSink for TerminalConsole {
    fn write(&self, text: &str, style: ConsoleStyle) {
        if style == ConsoleStyle::SystemOutput && !self.config.show_system_output {
            return;
        }
        let (prefix, suffix) = self.decorate(style);
        // Broken pipes are not worth surfacing from a console sink
        let _ = match style {
            ConsoleStyle::Normal => writeln!(io::stdout().lock(), "{text}"),
            ConsoleStyle::Error | ConsoleStyle::SystemOutput => {
                writeln!(io::stderr().lock(), "{prefix}{text}{suffix}")
            }
        };
    }
}
