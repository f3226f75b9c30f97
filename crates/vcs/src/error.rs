//! Error types for the git bridge.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the external git executable.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A revision string matched none of the known encodings.
    #[error("Malformed revision '{revision}': {reason}")]
    #[diagnostic(
        code(gitbridge::revision::malformed),
        help("Pass a commit hash, a ref name, or a '<date>[<hash>]' encoded revision")
    )]
    MalformedRevision {
        /// The revision string as given.
        revision: String,
        /// Why it could not be interpreted.
        reason: String,
    },

    /// The external tool failed to launch, exited non-zero, or timed out.
    #[error("{}", describe_invocation(.command, .exit_code, .stderr, .timed_out, .source))]
    #[diagnostic(
        code(gitbridge::tool::invocation),
        help("Check that the configured git executable exists and is runnable")
    )]
    ToolInvocation {
        /// The command line that was run.
        command: String,
        /// Exit code, when the process ran to completion.
        exit_code: Option<i32>,
        /// Captured standard error.
        stderr: String,
        /// Whether the process was killed after exceeding its timeout.
        timed_out: bool,
        /// Launch or I/O failure, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid bridge settings.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(gitbridge::config))]
    Configuration {
        /// The error message.
        message: String,
    },

    /// I/O error with path context.
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(gitbridge::io))]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// The path involved, if any.
        path: Option<PathBuf>,
        /// Description of the operation that failed.
        operation: String,
    },

    /// A file-system listener could not be attached.
    #[error("File-system listener error: {message}")]
    #[diagnostic(code(gitbridge::listener))]
    Listener {
        /// The error message.
        message: String,
    },
}

fn describe_invocation(
    command: &str,
    exit_code: &Option<i32>,
    stderr: &str,
    timed_out: &bool,
    source: &Option<std::io::Error>,
) -> String {
    if *timed_out {
        return format!("'{command}' timed out");
    }
    if let Some(source) = source {
        return format!("Failed to run '{command}': {source}");
    }
    let stderr = stderr.trim();
    match (exit_code, stderr.is_empty()) {
        (Some(code), true) => format!("'{command}' exited with code {code}"),
        (Some(code), false) => format!("'{command}' exited with code {code}: {stderr}"),
        (None, true) => format!("'{command}' was terminated by a signal"),
        (None, false) => format!("'{command}' was terminated by a signal: {stderr}"),
    }
}

impl Error {
    /// Create a malformed revision error.
    #[must_use]
    pub fn malformed_revision(revision: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRevision {
            revision: revision.into(),
            reason: reason.into(),
        }
    }

    /// Create an error for a process that could not be launched or read.
    #[must_use]
    pub fn launch_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::ToolInvocation {
            command: command.into(),
            exit_code: None,
            stderr: String::new(),
            timed_out: false,
            source: Some(source),
        }
    }

    /// Create an error for a process that exited unsuccessfully.
    #[must_use]
    pub fn exit_failure(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::ToolInvocation {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
            timed_out: false,
            source: None,
        }
    }

    /// Create an error for a process killed after its timeout.
    #[must_use]
    pub fn timed_out(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::ToolInvocation {
            command: command.into(),
            exit_code: None,
            stderr: stderr.into(),
            timed_out: true,
            source: None,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path,
            operation: operation.into(),
        }
    }

    /// Create a listener error.
    #[must_use]
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }

    /// Whether this error is a tool invocation that hit its timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ToolInvocation {
                timed_out: true,
                ..
            }
        )
    }

    /// The most specific human-readable reason for this error.
    ///
    /// For launch failures this is the underlying I/O error rather than the
    /// wrapper message.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::ToolInvocation {
                source: Some(source),
                ..
            } => source.to_string(),
            other => other.to_string(),
        }
    }
}
