//! Detected git versions.
//!
//! git reports its version as free text (`git version 2.43.0`,
//! `git version 1.7.1.msysgit.0`, `git version 2.39.3 (Apple Git-145)`).
//! Up to four leading numeric components are kept; anything after them is
//! ignored.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// An ordered four-component version number (`major.minor.revision.patch`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionNumber {
    /// Major version number.
    pub major: u32,
    /// Minor version number.
    pub minor: u32,
    /// Revision number.
    pub revision: u32,
    /// Patch level.
    pub patch: u32,
}

impl VersionNumber {
    /// Create a new version number.
    #[must_use]
    pub const fn new(major: u32, minor: u32, revision: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            revision,
            patch,
        }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)?;
        if self.patch != 0 {
            write!(f, ".{}", self.patch)?;
        }
        Ok(())
    }
}

impl FromStr for VersionNumber {
    type Err = Error;

    /// Parse a bare dotted version such as `1.6.0` or `1.7.1.1`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let mut parts = [0_u32; 4];
        let mut count = 0;
        for (slot, part) in parts.iter_mut().zip(s.split('.')) {
            *slot = part
                .parse()
                .map_err(|_| Error::configuration(format!("Invalid version number: {s}")))?;
            count += 1;
        }
        if count == 0 || s.split('.').count() > 4 {
            return Err(Error::configuration(format!("Invalid version number: {s}")));
        }
        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

/// A detected git version, or the reason there isn't one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "version", rename_all = "lowercase")]
pub enum ToolVersion {
    /// Detection has never run.
    #[default]
    Unknown,
    /// Detection failed, or is in progress on the current thread.
    Invalid,
    /// The executable reported this version.
    Detected(VersionNumber),
}

impl ToolVersion {
    /// Oldest git release the bridge supports.
    pub const MIN: VersionNumber = VersionNumber::new(1, 6, 0, 0);

    /// Parse the output of `git --version`.
    ///
    /// Returns [`ToolVersion::Invalid`] when no numeric version can be found.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let text = output.trim();
        let text = text.strip_prefix("git version").unwrap_or(text).trim_start();
        let token = text.split_whitespace().next().unwrap_or_default();

        let mut parts = [0_u32; 4];
        let mut found = 0;
        for (slot, part) in parts.iter_mut().zip(token.split('.')) {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            let Ok(value) = digits.parse() else {
                break;
            };
            *slot = value;
            found += 1;
            if digits.len() != part.len() {
                // `2.39.3-rc0`: stop after the component carrying the suffix
                break;
            }
        }

        if found == 0 {
            return Self::Invalid;
        }
        Self::Detected(VersionNumber::new(parts[0], parts[1], parts[2], parts[3]))
    }

    /// Whether detection ran and produced a version.
    #[must_use]
    pub const fn is_detected(&self) -> bool {
        matches!(self, Self::Detected(_))
    }

    /// Whether detection has run at all (successfully or not).
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The detected version number, if any.
    #[must_use]
    pub const fn number(&self) -> Option<VersionNumber> {
        match self {
            Self::Detected(number) => Some(*number),
            Self::Unknown | Self::Invalid => None,
        }
    }

    /// Whether this version is at least [`ToolVersion::MIN`].
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.is_supported_by(Self::MIN)
    }

    /// Whether this version is at least `minimum`. Sentinels are never supported.
    #[must_use]
    pub fn is_supported_by(&self, minimum: VersionNumber) -> bool {
        self.number().is_some_and(|number| number >= minimum)
    }
}

impl PartialOrd for ToolVersion {
    /// Only detected versions are ordered; sentinels compare as unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Detected(a), Self::Detected(b)) => Some(a.cmp(b)),
            (a, b) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Invalid => write!(f, "invalid"),
            Self::Detected(number) => write!(f, "{number}"),
        }
    }
}
