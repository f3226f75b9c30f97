//! Version-gated bridge to an external git executable.
//!
//! A host drives git through a [`VcsBridge`]. The bridge detects and caches
//! the version of the configured executable, parses revision identifiers,
//! runs git commands, and reports problems to a host-owned console.
//!
//! # Architecture
//!
//! - [`cache`] - version detection, cached per executable path and guarded
//!   against recursive and concurrent checks
//! - [`revision`] - revision identifiers: literal, `<date>[<hash>` encoded,
//!   or resolved through `git rev-list`
//! - [`runner`] - the [`CommandRunner`] seam and its process-backed default
//! - [`bridge`] - the host-facing façade, lifecycle and error reporting
//! - [`settings`] - TOML and environment configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use gitbridge_events::TracingConsole;
//! use gitbridge_vcs::VcsBridge;
//! use std::sync::Arc;
//!
//! let bridge = VcsBridge::builder(Arc::new(TracingConsole::new())).build();
//! if !bridge.version().is_supported() {
//!     // already reported to the console
//! }
//! let head = bridge.parse_revision("HEAD", Some(std::path::Path::new(".")))?;
//! ```

pub mod bridge;
pub mod cache;
pub mod error;
pub mod listener;
pub mod providers;
pub mod repository;
pub mod revision;
pub mod runner;
pub mod settings;
pub mod version;

// Re-export main types
pub use bridge::{NAME, VcsBridge, VcsBridgeBuilder};
pub use cache::{VersionCache, VersionCacheConfig};
pub use error::{Error, Result};
pub use listener::{ListenerFactory, ListenerHandle};
pub use providers::{
    AnnotationProvider, CapabilityProviders, ChangeProvider, CheckinEnvironment, Configurable,
    DiffProvider, HistoryProvider, MergeProvider, Provider, RevisionSelector, RollbackEnvironment,
    UpdateEnvironment,
};
pub use revision::{GitRevisionResolver, RevisionId, ResolveRevision};
pub use runner::{CommandRunner, ProcessRunner, RunOptions, ToolCommand};
pub use settings::BridgeSettings;
pub use version::{ToolVersion, VersionNumber};
