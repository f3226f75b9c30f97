//! The console sink contract and an in-memory implementation.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How a console line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleStyle {
    /// Regular output.
    Normal,
    /// Error output.
    Error,
    /// Output produced by the bridge itself (command lines, version notices).
    SystemOutput,
}

impl fmt::Display for ConsoleStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Error => write!(f, "error"),
            Self::SystemOutput => write!(f, "system"),
        }
    }
}

/// Host-owned destination for user-visible text.
///
/// Implementations must be cheap to call from any thread. A single call may
/// carry several lines separated by `\n`.
pub trait ConsoleSink: Send + Sync {
    /// Write `text` with the given style.
    fn write(&self, text: &str, style: ConsoleStyle);
}

/// A console sink shared between the bridge and its collaborators.
pub type SharedConsole = Arc<dyn ConsoleSink>;

impl<T: ConsoleSink + ?Sized> ConsoleSink for Arc<T> {
    fn write(&self, text: &str, style: ConsoleStyle) {
        (**self).write(text, style);
    }
}

/// A single recorded console write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleLine {
    /// The text as written.
    pub text: String,
    /// The style it was written with.
    pub style: ConsoleStyle,
}

/// Console sink that records every write in memory.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl MemoryConsole {
    /// Create an empty console.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty console behind an `Arc`, ready to be shared.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of all writes so far.
    #[must_use]
    pub fn lines(&self) -> Vec<ConsoleLine> {
        self.lines.lock().clone()
    }

    /// Writes recorded with the given style.
    #[must_use]
    pub fn lines_with_style(&self, style: ConsoleStyle) -> Vec<ConsoleLine> {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.style == style)
            .cloned()
            .collect()
    }

    /// Number of writes so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Drop all recorded writes.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ConsoleSink for MemoryConsole {
    fn write(&self, text: &str, style: ConsoleStyle) {
        self.lines.lock().push(ConsoleLine {
            text: text.to_string(),
            style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_console_records_in_order() {
        let console = MemoryConsole::new();
        console.write("first", ConsoleStyle::Normal);
        console.write("second", ConsoleStyle::Error);

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].style, ConsoleStyle::Error);
    }

    #[test]
    fn test_lines_with_style_filters() {
        let console = MemoryConsole::new();
        console.write("a", ConsoleStyle::Normal);
        console.write("b", ConsoleStyle::SystemOutput);
        console.write("c", ConsoleStyle::SystemOutput);

        assert_eq!(console.lines_with_style(ConsoleStyle::SystemOutput).len(), 2);
        assert!(console.lines_with_style(ConsoleStyle::Error).is_empty());
    }

    #[test]
    fn test_shared_console_forwards_through_arc() {
        let memory = MemoryConsole::shared();
        let shared: SharedConsole = memory.clone();
        shared.write("via arc", ConsoleStyle::Normal);
        assert_eq!(memory.len(), 1);

        memory.clear();
        assert!(memory.is_empty());
    }

    #[test]
    fn test_style_display() {
        assert_eq!(ConsoleStyle::Normal.to_string(), "normal");
        assert_eq!(ConsoleStyle::Error.to_string(), "error");
        assert_eq!(ConsoleStyle::SystemOutput.to_string(), "system");
    }
}
