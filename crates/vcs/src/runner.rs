//! Invoking the external git executable.
//!
//! [`CommandRunner`] is the seam between the bridge and the operating system.
//! [`ProcessRunner`] is the real implementation; tests substitute their own.

use crate::error::{Error, Result};
use gitbridge_events::{ConsoleStyle, SharedConsole};
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output readers may take to finish after a killed process group.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    /// Create a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The arguments passed to the program.
    #[must_use]
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// The command line as shown to the user.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy())
            .chain(self.args.iter().map(|a| a.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Options controlling a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Do not echo the command line to the console.
    pub silent: bool,
    /// Disable every authentication path that could prompt the user.
    pub no_interactive_auth: bool,
    /// Directory to run in; the current directory when `None`.
    pub working_directory: Option<PathBuf>,
    /// Kill the process after this long.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    /// Options for internal queries: silent and never prompting.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            silent: true,
            no_interactive_auth: true,
            ..Self::default()
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set the timeout. `None` waits indefinitely.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs external commands and captures their output.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion and return its trimmed standard output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolInvocation`] if the process cannot be launched,
    /// exits non-zero, or exceeds `options.timeout`.
    fn run(&self, command: &ToolCommand, options: &RunOptions) -> Result<String>;
}

/// Environment applied when interactive authentication is disabled.
const NON_INTERACTIVE_ENV: &[(&str, &str)] = &[
    ("GIT_TERMINAL_PROMPT", "0"),
    ("GCM_INTERACTIVE", "never"),
    ("GIT_SSH_COMMAND", "ssh -o BatchMode=yes"),
];

/// Askpass helpers removed when interactive authentication is disabled.
const ASKPASS_ENV: &[&str] = &["GIT_ASKPASS", "SSH_ASKPASS"];

/// [`CommandRunner`] backed by `std::process`.
///
/// Non-silent invocations are echoed to the console as system output before
/// the process starts.
#[derive(Clone)]
pub struct ProcessRunner {
    console: SharedConsole,
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner").finish_non_exhaustive()
    }
}

impl ProcessRunner {
    /// Create a runner that echoes to `console`.
    #[must_use]
    pub fn new(console: SharedConsole) -> Self {
        Self { console }
    }

    fn build(command: &ToolCommand, options: &RunOptions) -> Command {
        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        if let Some(dir) = &options.working_directory {
            cmd.current_dir(dir);
        }

        // Own process group, so a timeout also reaches ssh and credential helpers
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        if options.no_interactive_auth {
            for (key, value) in NON_INTERACTIVE_ENV {
                cmd.env(key, value);
            }
            for key in ASKPASS_ENV {
                cmd.env_remove(key);
            }
        }

        cmd
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand, options: &RunOptions) -> Result<String> {
        let command_line = command.command_line();
        if !options.silent {
            self.console.write(&command_line, ConsoleStyle::SystemOutput);
        }
        debug!(command = %command_line, dir = ?options.working_directory, "Running git");

        let mut child = Self::build(command, options)
            .spawn()
            .map_err(|e| Error::launch_failed(&command_line, e))?;
        let pid = child.id();

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);
        let status =
            wait(&mut child, deadline).map_err(|e| Error::launch_failed(&command_line, e))?;

        // Helpers that inherited the pipes can outlive git; the deadline covers them too
        let read_deadline = if status.is_some() {
            deadline
        } else {
            Some(Instant::now() + KILL_GRACE)
        };
        let stdout = collect(stdout, read_deadline);
        let stderr = collect(stderr, read_deadline);

        let (Some(status), Some(stdout), Some(stderr)) = (status, stdout, stderr.clone()) else {
            kill_group(pid);
            warn!(command = %command_line, timeout = ?options.timeout, "git timed out");
            return Err(Error::timed_out(command_line, stderr.unwrap_or_default()));
        };

        if !status.success() {
            debug!(command = %command_line, code = ?status.code(), "git failed");
            return Err(Error::exit_failure(command_line, status.code(), stderr));
        }

        Ok(stdout.trim().to_string())
    }
}

/// Read a pipe to the end on a background thread so the child never blocks on
/// a full pipe buffer. The text arrives on the returned channel.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<String>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });
        rx
    })
}

/// Output of a reader, or `None` if it is still open at `deadline`.
fn collect(reader: Option<Receiver<String>>, deadline: Option<Instant>) -> Option<String> {
    let Some(reader) = reader else {
        return Some(String::new());
    };
    let Some(deadline) = deadline else {
        return Some(reader.recv().unwrap_or_default());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

/// Wait for `child`, killing its process group once `deadline` passes.
///
/// Returns `Ok(None)` when the child was killed. On an I/O error the child is
/// killed and reaped before the error is returned.
fn wait(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let result = poll(child, deadline);
    if result.is_err() {
        terminate(child);
    }
    result
}

fn poll(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            terminate(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill `child` with its process group and reap it.
fn terminate(child: &mut Child) {
    kill_group(child.id());
    // The child may exit between try_wait and kill
    let _ = child.kill();
    let _ = child.wait();
}

/// Send `SIGKILL` to the process group led by `pid`.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_group(pid: u32) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers; a negative pid addresses the
    // group created at spawn, and a vanished group only yields ESRCH.
    unsafe {
        libc::kill(-pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use gitbridge_events::MemoryConsole;
    use std::sync::Arc;

    fn runner() -> (ProcessRunner, Arc<MemoryConsole>) {
        let console = MemoryConsole::shared();
        (ProcessRunner::new(console.clone()), console)
    }

    #[test]
    fn test_command_line_rendering() {
        let cmd = ToolCommand::new("git").arg("rev-list").args(["--max-count=1", "HEAD"]);
        assert_eq!(cmd.command_line(), "git rev-list --max-count=1 HEAD");
        assert_eq!(cmd.arguments().len(), 3);
    }

    #[test]
    fn test_quiet_options() {
        let options = RunOptions::quiet().in_dir("/tmp");
        assert!(options.silent);
        assert!(options.no_interactive_auth);
        assert_eq!(options.working_directory, Some(PathBuf::from("/tmp")));
        assert_eq!(options.timeout, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_trimmed_stdout_and_echoes() {
        let (runner, console) = runner();
        let out = runner
            .run(&ToolCommand::new("echo").arg("  hello  "), &RunOptions::default())
            .unwrap();
        assert_eq!(out, "hello");

        let lines = console.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].style, ConsoleStyle::SystemOutput);
        assert!(lines[0].text.starts_with("echo"));
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_run_does_not_echo() {
        let (runner, console) = runner();
        runner
            .run(&ToolCommand::new("true"), &RunOptions::quiet())
            .unwrap();
        assert!(console.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_maps_to_invocation_error() {
        let (runner, _) = runner();
        let err = runner
            .run(
                &ToolCommand::new("sh").args(["-c", "echo oops >&2; exit 3"]),
                &RunOptions::quiet(),
            )
            .unwrap_err();
        match err {
            Error::ToolInvocation {
                exit_code,
                stderr,
                timed_out,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr.trim(), "oops");
                assert!(!timed_out);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_executable_is_launch_failure() {
        let (runner, _) = runner();
        let err = runner
            .run(
                &ToolCommand::new("/definitely/not/a/real/git").arg("--version"),
                &RunOptions::quiet(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ToolInvocation {
                source: Some(_),
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let (runner, _) = runner();
        let start = Instant::now();
        let err = runner
            .run(
                &ToolCommand::new("sleep").arg("10"),
                &RunOptions::quiet().with_timeout(Some(Duration::from_millis(200))),
            )
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_background_helpers() {
        let (runner, _) = runner();
        let start = Instant::now();
        let err = runner
            .run(
                &ToolCommand::new("sh").args(["-c", "sleep 5 & sleep 5; echo done"]),
                &RunOptions::quiet().with_timeout(Some(Duration::from_millis(200))),
            )
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_covers_helpers_holding_output_open() {
        let (runner, _) = runner();
        let start = Instant::now();
        let err = runner
            .run(
                &ToolCommand::new("sh").args(["-c", "sleep 5 & echo started"]),
                &RunOptions::quiet().with_timeout(Some(Duration::from_millis(300))),
            )
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_reaps_child_and_group() {
        let options = RunOptions::quiet();
        let mut child = ProcessRunner::build(
            &ToolCommand::new("sh").args(["-c", "sleep 10 & sleep 10"]),
            &options,
        )
        .spawn()
        .unwrap();
        let stdout = drain(child.stdout.take());

        let start = Instant::now();
        terminate(&mut child);

        assert!(child.try_wait().unwrap().is_some());
        let deadline = Some(Instant::now() + Duration::from_secs(3));
        assert_eq!(collect(stdout, deadline), Some(String::new()));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_no_interactive_auth_sets_environment() {
        let (runner, _) = runner();
        let out = runner
            .run(
                &ToolCommand::new("sh").args(["-c", "echo $GIT_TERMINAL_PROMPT"]),
                &RunOptions::quiet(),
            )
            .unwrap();
        assert_eq!(out, "0");
    }

    #[cfg(unix)]
    #[test]
    fn test_working_directory_is_honoured() {
        let dir = tempfile::TempDir::new().unwrap();
        let (runner, _) = runner();
        let out = runner
            .run(&ToolCommand::new("pwd"), &RunOptions::quiet().in_dir(dir.path()))
            .unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(PathBuf::from(out).canonicalize().unwrap(), expected);
    }
}
