//! Cached git version detection.
//!
//! The cache remembers the version reported by one executable path. Detection
//! runs `<git> --version` only when nothing is cached yet or the configured
//! path has changed; failed detections are cached as [`ToolVersion::Invalid`]
//! too.
//!
//! Before the tool runs, the cached value is set to `Invalid` and the calling
//! thread is recorded as the detector. If anything on that thread asks for
//! the version again while detection is in flight (for example while the
//! runner resolves the executable), it gets `Invalid` straight back instead of
//! recursing. Other threads wait for the detector to finish. The lock itself
//! is never held while git runs.

use crate::error::Error;
use crate::runner::{CommandRunner, RunOptions, ToolCommand};
use crate::version::{ToolVersion, VersionNumber};
use gitbridge_events::{ConsoleStyle, SharedConsole};
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct CacheState {
    version: ToolVersion,
    executable: PathBuf,
    detecting: Option<ThreadId>,
}

/// Options for a [`VersionCache`].
#[derive(Debug, Clone)]
pub struct VersionCacheConfig {
    /// Versions below this are reported as unsupported.
    pub minimum: VersionNumber,
    /// Timeout for `git --version`.
    pub timeout: Option<Duration>,
    /// Whether detection problems are written to the console.
    pub report_problems: bool,
}

impl Default for VersionCacheConfig {
    fn default() -> Self {
        Self {
            minimum: ToolVersion::MIN,
            timeout: None,
            report_problems: true,
        }
    }
}

/// Caches the detected git version per executable path.
pub struct VersionCache {
    state: Mutex<CacheState>,
    detected: Condvar,
    runner: Arc<dyn CommandRunner>,
    console: SharedConsole,
    config: VersionCacheConfig,
}

impl std::fmt::Debug for VersionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCache")
            .field("state", &*self.state.lock())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Clears the detecting mark and wakes waiters when detection ends, including
/// by unwinding.
struct DetectionGuard<'a> {
    cache: &'a VersionCache,
}

impl Drop for DetectionGuard<'_> {
    fn drop(&mut self) {
        self.cache.state.lock().detecting = None;
        self.cache.detected.notify_all();
    }
}

impl VersionCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        console: SharedConsole,
        config: VersionCacheConfig,
    ) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            detected: Condvar::new(),
            runner,
            console,
            config,
        }
    }

    /// The minimum supported version.
    #[must_use]
    pub const fn minimum(&self) -> VersionNumber {
        self.config.minimum
    }

    /// The cached version and the executable it belongs to, without detecting.
    #[must_use]
    pub fn cached(&self) -> (ToolVersion, PathBuf) {
        let state = self.state.lock();
        (state.version, state.executable.clone())
    }

    /// Forget the cached version so the next call detects again.
    ///
    /// Has no effect on a detection already in flight.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        if state.detecting.is_none() {
            state.version = ToolVersion::Unknown;
        }
    }

    /// Return the version of `executable`, detecting it if the cache is stale.
    ///
    /// Never fails: problems are reported to the console and yield
    /// [`ToolVersion::Invalid`].
    pub fn ensure_version(&self, executable: &Path) -> ToolVersion {
        let me = thread::current().id();
        let mut state = self.state.lock();

        loop {
            let detecting = state.detecting;
            match detecting {
                Some(detector) if detector == me => {
                    debug!(executable = %executable.display(), "Reentrant git version check");
                    return ToolVersion::Invalid;
                }
                Some(_) => self.detected.wait(&mut state),
                None => break,
            }
        }

        if state.version.is_checked() && state.executable == executable {
            return state.version;
        }

        state.executable = executable.to_path_buf();
        state.version = ToolVersion::Invalid;
        state.detecting = Some(me);
        drop(state);

        let guard = DetectionGuard { cache: self };
        let detected = self.detect(executable);
        self.state.lock().version = detected;
        drop(guard);

        detected
    }

    fn detect(&self, executable: &Path) -> ToolVersion {
        let command = ToolCommand::new(executable).arg("--version");
        let options = RunOptions::quiet().with_timeout(self.config.timeout);

        let output = match self.runner.run(&command, &options) {
            Ok(output) => output,
            Err(e) => {
                warn!(executable = %executable.display(), error = %e, "Unable to run git");
                self.report_failure(executable, &e);
                return ToolVersion::Invalid;
            }
        };

        let version = ToolVersion::parse(&output);
        info!(executable = %executable.display(), %version, "Detected git version");

        if !version.is_supported_by(self.config.minimum) {
            warn!(%version, minimum = %self.config.minimum, "Unsupported git version");
            if self.config.report_problems {
                let shown = version
                    .number()
                    .map_or_else(|| output.trim().to_string(), |n| n.to_string());
                self.console.write(
                    &format!(
                        "Unsupported git version {shown}; minimum supported is {}",
                        self.config.minimum
                    ),
                    ConsoleStyle::SystemOutput,
                );
            }
        }

        version
    }

    fn report_failure(&self, executable: &Path, error: &Error) {
        if self.config.report_problems {
            self.console.write(
                &format!(
                    "Unable to run git executable '{}': {}",
                    executable.display(),
                    error.reason()
                ),
                ConsoleStyle::Error,
            );
        }
    }
}
