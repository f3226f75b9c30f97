//! End-to-end scenarios through [`VcsBridge`] with scripted git runners.

#![allow(clippy::unwrap_used)]

use gitbridge_events::{ConsoleStyle, MemoryConsole};
use gitbridge_vcs::{
    BridgeSettings, CommandRunner, Error, Result, RunOptions, ToolCommand, ToolVersion, VcsBridge,
    VersionNumber,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Answers `--version` with a fixed string, or fails as a missing executable.
struct VersionRunner {
    output: Option<&'static str>,
    calls: AtomicUsize,
}

impl VersionRunner {
    fn new(output: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            output,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CommandRunner for VersionRunner {
    fn run(&self, command: &ToolCommand, _options: &RunOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output.map(str::to_string).ok_or_else(|| {
            Error::launch_failed(
                command.command_line(),
                io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            )
        })
    }
}

fn bridge(runner: Arc<dyn CommandRunner>, minimum: VersionNumber) -> (VcsBridge, Arc<MemoryConsole>) {
    let console = MemoryConsole::shared();
    let bridge = VcsBridge::builder(console.clone())
        .runner(runner)
        .settings(BridgeSettings {
            minimum_version: minimum,
            ..BridgeSettings::default()
        })
        .build();
    (bridge, console)
}

#[test]
fn repeated_checks_hit_the_cache() {
    let runner = VersionRunner::new(Some("git version 2.39.2"));
    let (bridge, console) = bridge(runner.clone(), ToolVersion::MIN);

    let first = bridge.version();
    let second = bridge.version();

    assert_eq!(first, second);
    assert_eq!(first.number(), Some(VersionNumber::new(2, 39, 2, 0)));
    assert_eq!(runner.calls(), 1);
    assert!(console.is_empty());
}

#[test]
fn changed_executable_detects_again() {
    let runner = VersionRunner::new(Some("git version 2.39.2"));
    let (bridge, _) = bridge(runner.clone(), ToolVersion::MIN);

    bridge.version();
    bridge.set_git_executable("/usr/local/bin/git");
    bridge.version();
    bridge.set_git_executable("git");
    bridge.version();

    assert_eq!(runner.calls(), 3);
}

#[test]
fn old_version_warns_once_and_is_cached() {
    let runner = VersionRunner::new(Some("git version 1.2.3"));
    let (bridge, console) = bridge(runner.clone(), VersionNumber::new(1, 5, 0, 0));

    let version = bridge.version();
    bridge.version();

    assert_eq!(version.number(), Some(VersionNumber::new(1, 2, 3, 0)));
    assert_eq!(runner.calls(), 1);
    let warnings = console.lines_with_style(ConsoleStyle::SystemOutput);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].text,
        "Unsupported git version 1.2.3; minimum supported is 1.5.0"
    );
}

#[test]
fn missing_executable_is_invalid_and_cached() {
    let runner = VersionRunner::new(None);
    let (bridge, console) = bridge(runner.clone(), ToolVersion::MIN);
    bridge.set_git_executable("/nowhere/git");

    assert_eq!(bridge.version(), ToolVersion::Invalid);
    assert_eq!(bridge.version(), ToolVersion::Invalid);

    assert_eq!(runner.calls(), 1);
    let lines = console.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].style, ConsoleStyle::Error);
    assert!(lines[0].text.starts_with("Unable to run git executable '/nowhere/git'"));
}

/// Asks the bridge for the version while the bridge is detecting it.
struct ReentrantRunner {
    bridge: OnceLock<Weak<VcsBridge>>,
    observed: Mutex<Vec<ToolVersion>>,
}

impl CommandRunner for ReentrantRunner {
    fn run(&self, _command: &ToolCommand, _options: &RunOptions) -> Result<String> {
        if let Some(bridge) = self.bridge.get().and_then(Weak::upgrade) {
            self.observed.lock().unwrap().push(bridge.version());
        }
        Ok("git version 2.0.0".to_string())
    }
}

#[test]
fn reentrant_check_observes_invalid() {
    let runner = Arc::new(ReentrantRunner {
        bridge: OnceLock::new(),
        observed: Mutex::new(Vec::new()),
    });
    let (bridge, _) = bridge(runner.clone(), ToolVersion::MIN);
    let bridge = Arc::new(bridge);
    runner.bridge.set(Arc::downgrade(&bridge)).unwrap();

    let version = bridge.version();

    assert_eq!(version.number(), Some(VersionNumber::new(2, 0, 0, 0)));
    assert_eq!(*runner.observed.lock().unwrap(), vec![ToolVersion::Invalid]);
}

#[test]
fn full_hash_is_literal() {
    let (bridge, _) = bridge(VersionRunner::new(None), ToolVersion::MIN);
    let hash = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

    let revision = bridge.parse_revision(hash, None).unwrap().unwrap();

    assert_eq!(revision.hash(), hash);
    assert!(revision.timestamp().is_none());
    assert!(revision.is_full_hash());
}

#[test]
fn combined_revision_from_date_string() {
    let (bridge, _) = bridge(VersionRunner::new(None), ToolVersion::MIN);
    let revision = "Mon Jan 05 10:00:00 GMT 2009[a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";

    let parsed = bridge.parse_revision(revision, None).unwrap().unwrap();

    assert_eq!(parsed.hash(), "a1b2c3d4e5f");
    assert_eq!(parsed.timestamp().unwrap().timestamp(), 1_231_149_600);
    assert_eq!(parsed.raw(), revision);
}

#[test]
fn empty_revision_is_none() {
    let (bridge, _) = bridge(VersionRunner::new(None), ToolVersion::MIN);
    assert!(bridge.parse_revision("", None).unwrap().is_none());
}

#[test]
fn batch_errors_are_one_message() {
    let (bridge, console) = bridge(VersionRunner::new(None), ToolVersion::MIN);

    bridge.report_errors::<Error>(&[], "commit");
    assert!(console.is_empty());

    let errors: Vec<Error> = ["a.txt", "b.txt", "c.txt"]
        .iter()
        .map(|file| {
            Error::exit_failure(
                format!("git add {file}"),
                Some(128),
                format!("fatal: pathspec '{file}' did not match any files\nhint: check the path"),
            )
        })
        .collect();
    bridge.report_errors(&errors, "commit");

    let lines = console.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].style, ConsoleStyle::Error);
    assert_eq!(lines[0].text.lines().count(), errors.len() + 1);
    assert!(lines[0].text.starts_with("Errors occurred during commit:\n"));
}

#[test]
fn settings_file_configures_bridge() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("gitbridge.toml");
    std::fs::write(&path, "gitExecutable = \"/opt/git/bin/git\"\ncommandTimeoutSecs = 0\n").unwrap();

    let settings = BridgeSettings::load(&path).unwrap();
    let bridge = VcsBridge::builder(MemoryConsole::shared())
        .runner(VersionRunner::new(None))
        .settings(settings)
        .build();

    assert_eq!(bridge.git_executable(), PathBuf::from("/opt/git/bin/git"));
    assert_eq!(bridge.settings().command_timeout(), None);
}
