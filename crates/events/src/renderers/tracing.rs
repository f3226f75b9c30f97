//! Console sink backed by tracing events.

use crate::console::{ConsoleSink, ConsoleStyle};

/// Console sink that emits each write as a tracing event.
///
/// Hosts without a console of their own can install a subscriber and filter on
/// the `gitbridge::console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl TracingConsole {
    /// Create a new tracing console.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ConsoleSink for TracingConsole {
    fn write(&self, text: &str, style: ConsoleStyle) {
        crate::emit_console_line!(style, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_tracing_console_emits_on_console_target() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .with_target(true)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingConsole::new().write("git version 2.43.0", ConsoleStyle::SystemOutput);
            TracingConsole::new().write("fatal: not a git repository", ConsoleStyle::Error);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("gitbridge::console"));
        assert!(output.contains("git version 2.43.0"));
        assert!(output.contains("WARN"));
    }
}
