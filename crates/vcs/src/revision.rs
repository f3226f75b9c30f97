//! Revision identifiers and their textual encodings.
//!
//! A revision arrives as one of:
//!
//! - a combined `<date>[<hash>]` string longer than 40 characters, as written
//!   by older hosts into their own history caches;
//! - anything git itself understands (`HEAD~2`, a branch, an abbreviated hash),
//!   resolved against the repository when a path is known;
//! - a literal hash, used as-is.

use crate::error::{Error, Result};
use crate::repository;
use crate::runner::{CommandRunner, RunOptions, ToolCommand};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, error};

/// Length of a full SHA-1 commit hash, and the absolute offset at which the
/// hash part of a combined encoding ends.
pub const HASH_LENGTH: usize = 40;

/// Pattern matching a full commit hash.
pub const REVISION_PATTERN: &str = "[0-9a-fA-F]{40}";

static FULL_HASH: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!("^{REVISION_PATTERN}$")).ok());

/// A point in repository history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionId {
    raw: String,
    hash: String,
    timestamp: Option<DateTime<Utc>>,
}

/// Resolves a revision expression against a repository.
pub trait ResolveRevision {
    /// Resolve `revision` in the repository rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the revision cannot be resolved.
    fn resolve(&self, root: &Path, revision: &str) -> Result<RevisionId>;
}

impl RevisionId {
    /// A literal revision: the hash is the input, with no timestamp.
    #[must_use]
    pub fn literal(revision: impl Into<String>) -> Self {
        let raw = revision.into();
        Self {
            hash: raw.clone(),
            raw,
            timestamp: None,
        }
    }

    /// A revision with a known commit time.
    #[must_use]
    pub fn with_timestamp(
        raw: impl Into<String>,
        hash: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            raw: raw.into(),
            hash: hash.into(),
            timestamp: Some(timestamp),
        }
    }

    /// The string this revision was parsed from.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The canonical identifier.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The commit time, when known.
    #[must_use]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Whether the hash is a full 40-digit commit hash.
    #[must_use]
    pub fn is_full_hash(&self) -> bool {
        FULL_HASH
            .as_ref()
            .is_some_and(|re| re.is_match(&self.hash))
    }

    /// Parse a revision without consulting git.
    ///
    /// Returns `Ok(None)` for empty input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRevision`] for a combined encoding whose
    /// date or bracket position cannot be interpreted.
    pub fn parse(revision: &str) -> Result<Option<Self>> {
        Self::parse_with(revision, None)
    }

    /// Parse a revision, resolving it through git when `path_hint` is given.
    ///
    /// Resolution failures are logged and the revision is taken literally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRevision`] as [`RevisionId::parse`] does.
    pub fn parse_in(
        revision: &str,
        path_hint: Option<&Path>,
        resolver: &dyn ResolveRevision,
    ) -> Result<Option<Self>> {
        Self::parse_with(revision, path_hint.map(|path| (path, resolver)))
    }

    fn parse_with(
        revision: &str,
        hint: Option<(&Path, &dyn ResolveRevision)>,
    ) -> Result<Option<Self>> {
        if revision.is_empty() {
            return Ok(None);
        }

        if revision.chars().count() > HASH_LENGTH {
            return parse_combined(revision).map(Some);
        }

        if let Some((path, resolver)) = hint {
            match repository::find_root(path) {
                Some(root) => match resolver.resolve(&root, revision) {
                    Ok(resolved) => return Ok(Some(resolved)),
                    Err(e) => {
                        error!(%revision, root = %root.display(), error = %e, "Unexpected problem resolving git revision");
                    }
                },
                None => {
                    debug!(%revision, path = %path.display(), "No git repository for revision hint");
                }
            }
        }

        Ok(Some(Self::literal(revision)))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// Split a `<date>[<hash>` string. The hash ends at absolute character offset
/// [`HASH_LENGTH`], wherever the bracket is.
fn parse_combined(revision: &str) -> Result<RevisionId> {
    let bracket = revision
        .find('[')
        .ok_or_else(|| Error::malformed_revision(revision, "expected '<date>[<hash>'"))?;

    let hash_start = bracket + 1;
    let hash_end = revision
        .char_indices()
        .nth(HASH_LENGTH)
        .map_or(revision.len(), |(index, _)| index);

    // A bracket at offset 39 or later would leave an empty hash
    if hash_start >= hash_end {
        return Err(Error::malformed_revision(
            revision,
            format!("no hash before offset {HASH_LENGTH}"),
        ));
    }

    let date = &revision[..bracket];
    let hash = &revision[hash_start..hash_end];
    let timestamp = parse_legacy_date(date).ok_or_else(|| {
        Error::malformed_revision(revision, format!("unrecognized date '{date}'"))
    })?;

    Ok(RevisionId::with_timestamp(revision, hash, timestamp))
}

/// Zone abbreviations understood by the legacy date rule, in hours from UTC.
const ZONES: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

const ZONED_FORMATS: &[&str] = &[
    // git's default date format
    "%a %b %e %H:%M:%S %Y %z",
    // git's iso format
    "%Y-%m-%d %H:%M:%S %z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a date written in one of the broad, locale-independent formats older
/// hosts produced. Dates without a zone are taken as UTC.
#[must_use]
pub fn parse_legacy_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_named_zone(text) {
        return Some(dt);
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// `Mon Jan 05 10:00:00 GMT 2009`: the zone is an abbreviation between the
/// time and the year.
fn parse_named_zone(text: &str) -> Option<DateTime<Utc>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [weekday, month, day, time, zone, year] = tokens.as_slice() else {
        return None;
    };
    let hours = ZONES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(zone))
        .map(|(_, hours)| *hours)?;
    let naive = NaiveDateTime::parse_from_str(
        &format!("{weekday} {month} {day} {time} {year}"),
        "%a %b %d %H:%M:%S %Y",
    )
    .ok()?;
    let offset = FixedOffset::east_opt(hours * 3600)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Resolves revisions with `git rev-list --timestamp --max-count=1`.
pub struct GitRevisionResolver<'a> {
    runner: &'a dyn CommandRunner,
    executable: PathBuf,
    timeout: Option<Duration>,
}

impl<'a> GitRevisionResolver<'a> {
    /// Create a resolver that runs `executable` through `runner`.
    #[must_use]
    pub fn new(
        runner: &'a dyn CommandRunner,
        executable: impl Into<PathBuf>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            runner,
            executable: executable.into(),
            timeout,
        }
    }
}

impl ResolveRevision for GitRevisionResolver<'_> {
    fn resolve(&self, root: &Path, revision: &str) -> Result<RevisionId> {
        let command = ToolCommand::new(&self.executable)
            .args(["rev-list", "--timestamp", "--max-count=1"])
            .arg(revision)
            .arg("--");
        let options = RunOptions::quiet()
            .in_dir(root)
            .with_timeout(self.timeout);
        let output = self.runner.run(&command, &options)?;
        parse_rev_list(revision, &output)
    }
}

/// Parse `<unix-seconds> <hash>` as printed by `rev-list --timestamp`.
fn parse_rev_list(revision: &str, output: &str) -> Result<RevisionId> {
    let line = output.lines().next().unwrap_or_default().trim();
    let (seconds, hash) = line
        .split_once(' ')
        .ok_or_else(|| Error::malformed_revision(revision, format!("unexpected git output '{line}'")))?;
    let timestamp = seconds
        .parse::<i64>()
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| {
            Error::malformed_revision(revision, format!("invalid commit time '{seconds}'"))
        })?;
    Ok(RevisionId::with_timestamp(revision, hash.trim(), timestamp))
}
