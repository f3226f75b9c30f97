//! Console sinks that render lines somewhere other than memory.

mod cli;
mod tracing;

pub use cli::{TerminalConsole, TerminalConsoleConfig};
pub use self::tracing::TracingConsole;
