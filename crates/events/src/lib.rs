//! Console sink for gitbridge.
//!
//! Every piece of user-visible text produced by the bridge goes through a
//! single call shape: [`ConsoleSink::write`] with a [`ConsoleStyle`]. The host
//! owns the sink and decides how (or whether) to render it.
//!
//! # Sinks
//!
//! - [`MemoryConsole`] records lines; useful for embedding hosts and tests.
//! - [`TracingConsole`] turns every line into a tracing event on the
//!   `gitbridge::console` target.
//! - [`TerminalConsole`] writes to stdout/stderr, optionally with ANSI colours.
//!
//! # Usage
//!
//! ```rust
//! use gitbridge_events::{ConsoleSink, ConsoleStyle, MemoryConsole};
//!
//! let console = MemoryConsole::new();
//! console.write("git --version", ConsoleStyle::SystemOutput);
//! assert_eq!(console.lines().len(), 1);
//! ```

pub mod console;
pub mod renderers;

pub use console::{ConsoleLine, ConsoleSink, ConsoleStyle, MemoryConsole, SharedConsole};
pub use renderers::{TerminalConsole, TerminalConsoleConfig, TracingConsole};

/// Tracing target used for console lines.
pub const CONSOLE_TARGET: &str = "gitbridge::console";

// ============================================================================
// Emit Macros
// ============================================================================

/// Emit a console line as a tracing event.
///
/// Error-styled lines are emitted at `WARN`, everything else at `INFO`.
///
/// # Example
/// ```rust,ignore
/// emit_console_line!(ConsoleStyle::Error, "git exited with code 128");
/// ```
#[macro_export]
macro_rules! emit_console_line {
    ($style:expr, $text:expr) => {{
        let style: $crate::ConsoleStyle = $style;
        match style {
            $crate::ConsoleStyle::Error => ::tracing::warn!(
                target: $crate::CONSOLE_TARGET,
                event_type = "console.line",
                style = %style,
                text = %$text,
            ),
            _ => ::tracing::info!(
                target: $crate::CONSOLE_TARGET,
                event_type = "console.line",
                style = %style,
                text = %$text,
            ),
        }
    }};
}
