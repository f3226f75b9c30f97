//! The façade the host talks to.
//!
//! [`VcsBridge`] owns the version cache, the command runner and the console,
//! hands out the capability providers it was built with, and is the single
//! place where errors become user-visible text.

use crate::cache::{VersionCache, VersionCacheConfig};
use crate::error::Result;
use crate::listener::{ListenerFactory, ListenerHandle};
use crate::providers::{
    AnnotationProvider, CapabilityProviders, ChangeProvider, CheckinEnvironment, Configurable,
    DiffProvider, HistoryProvider, MergeProvider, RevisionSelector, RollbackEnvironment,
    UpdateEnvironment,
};
use crate::repository;
use crate::revision::{GitRevisionResolver, REVISION_PATTERN, RevisionId};
use crate::runner::{CommandRunner, ProcessRunner, RunOptions, ToolCommand};
use crate::settings::BridgeSettings;
use crate::version::ToolVersion;
use gitbridge_events::{ConsoleStyle, SharedConsole};
use parking_lot::{Mutex, RwLock};
use std::ffi::OsString;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the version control system.
pub const NAME: &str = "Git";

/// Host-facing entry point for everything git.
pub struct VcsBridge {
    providers: CapabilityProviders,
    settings: RwLock<BridgeSettings>,
    versions: Arc<VersionCache>,
    runner: Arc<dyn CommandRunner>,
    console: SharedConsole,
    listener_factory: Option<Arc<dyn ListenerFactory>>,
    listener: Mutex<Option<Box<dyn ListenerHandle>>>,
}

impl fmt::Debug for VcsBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcsBridge")
            .field("providers", &self.providers)
            .field("settings", &*self.settings.read())
            .field("versions", &self.versions)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Builder for [`VcsBridge`].
pub struct VcsBridgeBuilder {
    console: SharedConsole,
    settings: BridgeSettings,
    runner: Option<Arc<dyn CommandRunner>>,
    providers: CapabilityProviders,
    listener_factory: Option<Arc<dyn ListenerFactory>>,
}

impl VcsBridgeBuilder {
    /// Use these settings instead of the defaults.
    #[must_use]
    pub fn settings(mut self, settings: BridgeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run git through `runner` instead of a [`ProcessRunner`].
    #[must_use]
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Capability providers exposed by the bridge.
    #[must_use]
    pub fn providers(mut self, providers: CapabilityProviders) -> Self {
        self.providers = providers;
        self
    }

    /// Factory used by [`VcsBridge::activate`].
    #[must_use]
    pub fn listener_factory(mut self, factory: Arc<dyn ListenerFactory>) -> Self {
        self.listener_factory = Some(factory);
        self
    }

    /// Build the bridge.
    #[must_use]
    pub fn build(self) -> VcsBridge {
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ProcessRunner::new(Arc::clone(&self.console))));
        let versions = VersionCache::new(
            Arc::clone(&runner),
            Arc::clone(&self.console),
            VersionCacheConfig {
                minimum: self.settings.minimum_version,
                timeout: self.settings.command_timeout(),
                report_problems: self.settings.report_version_problems,
            },
        );

        VcsBridge {
            providers: self.providers,
            settings: RwLock::new(self.settings),
            versions: Arc::new(versions),
            runner,
            console: self.console,
            listener_factory: self.listener_factory,
            listener: Mutex::new(None),
        }
    }
}

impl VcsBridge {
    /// Start building a bridge that writes to `console`.
    #[must_use]
    pub fn builder(console: SharedConsole) -> VcsBridgeBuilder {
        VcsBridgeBuilder {
            console,
            settings: BridgeSettings::default(),
            runner: None,
            providers: CapabilityProviders::default(),
            listener_factory: None,
        }
    }

    /// Internal name of the version control system.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        NAME
    }

    /// Name shown to the user.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        NAME
    }

    /// Pattern matching a full commit hash.
    #[must_use]
    pub const fn revision_pattern(&self) -> &'static str {
        REVISION_PATTERN
    }

    /// All capability providers.
    #[must_use]
    pub const fn providers(&self) -> &CapabilityProviders {
        &self.providers
    }

    /// Detects changed files.
    #[must_use]
    pub fn change_provider(&self) -> Option<&Arc<dyn ChangeProvider>> {
        self.providers.change()
    }

    /// Produces diffs.
    #[must_use]
    pub fn diff_provider(&self) -> Option<&Arc<dyn DiffProvider>> {
        self.providers.diff()
    }

    /// Lists history.
    #[must_use]
    pub fn history_provider(&self) -> Option<&Arc<dyn HistoryProvider>> {
        self.providers.history()
    }

    /// Resolves merge conflicts.
    #[must_use]
    pub fn merge_provider(&self) -> Option<&Arc<dyn MergeProvider>> {
        self.providers.merge()
    }

    /// Reverts local changes.
    #[must_use]
    pub fn rollback_environment(&self) -> Option<&Arc<dyn RollbackEnvironment>> {
        self.providers.rollback()
    }

    /// Commits changes.
    #[must_use]
    pub fn checkin_environment(&self) -> Option<&Arc<dyn CheckinEnvironment>> {
        self.providers.checkin()
    }

    /// Annotates files.
    #[must_use]
    pub fn annotation_provider(&self) -> Option<&Arc<dyn AnnotationProvider>> {
        self.providers.annotation()
    }

    /// Updates from upstream.
    #[must_use]
    pub fn update_environment(&self) -> Option<&Arc<dyn UpdateEnvironment>> {
        self.providers.update()
    }

    /// Status refresh is served by the update environment.
    #[must_use]
    pub fn status_environment(&self) -> Option<&Arc<dyn UpdateEnvironment>> {
        self.providers.update()
    }

    /// Integration is served by the update environment.
    #[must_use]
    pub fn integrate_environment(&self) -> Option<&Arc<dyn UpdateEnvironment>> {
        self.providers.update()
    }

    /// Settings UI.
    #[must_use]
    pub fn configurable(&self) -> Option<&Arc<dyn Configurable>> {
        self.providers.configurable()
    }

    /// Picks revisions.
    #[must_use]
    pub fn revision_selector(&self) -> Option<&Arc<dyn RevisionSelector>> {
        self.providers.revision_selector()
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn settings(&self) -> BridgeSettings {
        self.settings.read().clone()
    }

    /// The configured git executable.
    #[must_use]
    pub fn git_executable(&self) -> PathBuf {
        self.settings.read().git_executable.clone()
    }

    /// Point the bridge at another git executable. The next [`Self::version`]
    /// call detects its version.
    pub fn set_git_executable(&self, executable: impl Into<PathBuf>) {
        let executable = executable.into();
        info!(executable = %executable.display(), "Git executable changed");
        self.settings.write().git_executable = executable;
    }

    /// The version of the configured executable, detected if not cached.
    pub fn version(&self) -> ToolVersion {
        self.versions.ensure_version(&self.git_executable())
    }

    /// Detect the version now so problems are reported early.
    pub fn check_version(&self) {
        let version = self.version();
        debug!(%version, "Checked git version");
    }

    /// Parse a revision string, resolving it in the repository containing
    /// `path_hint` when given.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedRevision`] if a combined
    /// `<date>[<hash>` encoding cannot be interpreted.
    pub fn parse_revision(
        &self,
        revision: &str,
        path_hint: Option<&Path>,
    ) -> Result<Option<RevisionId>> {
        let settings = self.settings();
        let timeout = settings.command_timeout();
        let resolver =
            GitRevisionResolver::new(self.runner.as_ref(), settings.git_executable, timeout);
        RevisionId::parse_in(revision, path_hint, &resolver)
    }

    /// Whether `dir` is a directory inside a git repository.
    #[must_use]
    pub fn is_versioned_directory(&self, dir: &Path) -> bool {
        repository::is_versioned_directory(dir)
    }

    /// Run the configured git executable with `args`.
    ///
    /// The settings timeout applies unless `options` sets its own.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ToolInvocation`] if git cannot be launched,
    /// exits non-zero, or times out.
    pub fn run<I, S>(&self, args: I, options: &RunOptions) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let settings = self.settings();
        let command = ToolCommand::new(&settings.git_executable).args(args);
        let mut options = options.clone();
        if options.timeout.is_none() {
            options.timeout = settings.command_timeout();
        }
        self.runner.run(&command, &options)
    }

    /// Whether a file-system listener is attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Attach the file-system listener if it is not attached yet.
    ///
    /// Failures are reported to the console, never returned.
    pub fn activate(&self) {
        let Some(factory) = &self.listener_factory else {
            debug!("No file-system listener configured");
            return;
        };
        if self.is_active() {
            return;
        }

        // Attach without holding the lock; the listener may call back into us.
        let handle = match factory.attach(self) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Failed to attach file-system listener");
                self.show_error_line(&format!("Unable to start file-system listener: {e}"));
                return;
            }
        };

        let mut slot = self.listener.lock();
        if slot.is_some() {
            drop(slot);
            let mut handle = handle;
            handle.dispose();
            return;
        }
        *slot = Some(handle);
        info!("Git bridge activated");
    }

    /// Detach and dispose the file-system listener if attached.
    pub fn deactivate(&self) {
        let handle = self.listener.lock().take();
        if let Some(mut handle) = handle {
            handle.dispose();
            info!("Git bridge deactivated");
        }
    }

    /// Report errors collected during `action` as one error-styled write.
    ///
    /// The message is a header line plus exactly one line per error; multi-line
    /// errors are folded onto a single line. Nothing is written when `errors`
    /// is empty.
    pub fn report_errors<E: fmt::Display>(&self, errors: &[E], action: &str) {
        if errors.is_empty() {
            return;
        }
        let mut message = format!("Errors occurred during {action}:");
        for error in errors {
            let _ = write!(message, "\n{}", single_line(&error.to_string()));
        }
        warn!(%action, count = errors.len(), "Reporting errors");
        self.console.write(&message, ConsoleStyle::Error);
    }

    /// Write a styled message. Empty messages are dropped.
    pub fn report_message(&self, text: &str, style: ConsoleStyle) {
        if text.is_empty() {
            return;
        }
        self.console.write(text, style);
    }

    /// Echo a command line.
    pub fn show_command_line(&self, command_line: &str) {
        self.report_message(command_line, ConsoleStyle::SystemOutput);
    }

    /// Show a line of tool error output.
    pub fn show_error_line(&self, line: &str) {
        self.report_message(line, ConsoleStyle::Error);
    }
}

/// Join the non-blank lines of `text` with single spaces.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Drop for VcsBridge {
    fn drop(&mut self) {
        self.deactivate();
    }
}
