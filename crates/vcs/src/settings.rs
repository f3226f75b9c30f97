//! Bridge settings.
//!
//! Settings come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, and `GITBRIDGE_*` environment variables.
//!
//! ```toml
//! gitExecutable = "/usr/local/bin/git"
//! minimumVersion = "1.7.0"
//! commandTimeoutSecs = 30
//! reportVersionProblems = true
//! ```

use crate::error::{Error, Result};
use crate::version::{ToolVersion, VersionNumber};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding [`BridgeSettings::git_executable`].
pub const ENV_GIT_EXECUTABLE: &str = "GITBRIDGE_GIT_EXECUTABLE";
/// Environment variable overriding [`BridgeSettings::command_timeout_secs`].
pub const ENV_COMMAND_TIMEOUT: &str = "GITBRIDGE_COMMAND_TIMEOUT_SECS";

/// Default timeout for git commands, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Settings for a [`crate::VcsBridge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Path to (or name of) the git executable.
    pub git_executable: PathBuf,

    /// Versions below this are reported as unsupported.
    #[serde(
        serialize_with = "serialize_version",
        deserialize_with = "deserialize_version"
    )]
    pub minimum_version: VersionNumber,

    /// Timeout for each git invocation; 0 disables the timeout.
    pub command_timeout_secs: u64,

    /// Whether version problems are written to the console. Hosts turn this
    /// off for template projects that never run git themselves.
    pub report_version_problems: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            git_executable: PathBuf::from("git"),
            minimum_version: ToolVersion::MIN,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            report_version_problems: true,
        }
    }
}

impl BridgeSettings {
    /// Parse settings from TOML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the text is not valid settings TOML.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::configuration(format!("Invalid settings: {e}")))
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading bridge settings");
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "reading settings"))?;
        Self::from_toml(&text)
    }

    /// Apply `GITBRIDGE_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an override has an invalid value.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(executable) = std::env::var_os(ENV_GIT_EXECUTABLE).filter(|v| !v.is_empty()) {
            self.git_executable = PathBuf::from(executable);
        }
        if let Ok(timeout) = std::env::var(ENV_COMMAND_TIMEOUT) {
            self.command_timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::configuration(format!("{ENV_COMMAND_TIMEOUT} must be a number of seconds, got '{timeout}'"))
            })?;
        }
        Ok(self)
    }

    /// The command timeout, or `None` when disabled.
    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        if self.command_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.command_timeout_secs))
        }
    }
}

fn serialize_version<S: Serializer>(version: &VersionNumber, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(version)
}

fn deserialize_version<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<VersionNumber, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}
