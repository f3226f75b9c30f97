//! Capability providers plugged into the bridge.
//!
//! The bridge never implements diff, history, merge and friends itself; the
//! host hands it one object per capability and the bridge exposes them
//! unchanged.

use std::fmt;
use std::sync::Arc;

/// Common base of every capability provider.
pub trait Provider: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &str;
}

/// Detects changed files in the working tree.
pub trait ChangeProvider: Provider {}
/// Produces diffs between revisions.
pub trait DiffProvider: Provider {}
/// Lists file and repository history.
pub trait HistoryProvider: Provider {}
/// Resolves merge conflicts.
pub trait MergeProvider: Provider {}
/// Reverts local changes.
pub trait RollbackEnvironment: Provider {}
/// Commits changes.
pub trait CheckinEnvironment: Provider {}
/// Annotates (blames) files.
pub trait AnnotationProvider: Provider {}
/// Updates the working tree from upstream; also serves status and integrate.
pub trait UpdateEnvironment: Provider {}
/// Exposes bridge settings to the host's configuration UI.
pub trait Configurable: Provider {}
/// Lets the user pick a revision.
pub trait RevisionSelector: Provider {}

/// The fixed set of capability providers held by a [`crate::VcsBridge`].
///
/// Built once with the `with_*` methods and read-only afterwards. Slots the
/// host does not fill stay empty.
#[derive(Clone, Default)]
pub struct CapabilityProviders {
    change: Option<Arc<dyn ChangeProvider>>,
    diff: Option<Arc<dyn DiffProvider>>,
    history: Option<Arc<dyn HistoryProvider>>,
    merge: Option<Arc<dyn MergeProvider>>,
    rollback: Option<Arc<dyn RollbackEnvironment>>,
    checkin: Option<Arc<dyn CheckinEnvironment>>,
    annotation: Option<Arc<dyn AnnotationProvider>>,
    update: Option<Arc<dyn UpdateEnvironment>>,
    configurable: Option<Arc<dyn Configurable>>,
    revision_selector: Option<Arc<dyn RevisionSelector>>,
}

macro_rules! provider_slot {
    ($field:ident, $with:ident, $trait:ident, $doc:literal) => {
        #[doc = concat!("Set the ", $doc, ".")]
        #[must_use]
        pub fn $with(mut self, provider: Arc<dyn $trait>) -> Self {
            self.$field = Some(provider);
            self
        }

        #[doc = concat!("The ", $doc, ", if any.")]
        #[must_use]
        pub fn $field(&self) -> Option<&Arc<dyn $trait>> {
            self.$field.as_ref()
        }
    };
}

impl CapabilityProviders {
    /// An empty provider set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    provider_slot!(change, with_change, ChangeProvider, "change provider");
    provider_slot!(diff, with_diff, DiffProvider, "diff provider");
    provider_slot!(history, with_history, HistoryProvider, "history provider");
    provider_slot!(merge, with_merge, MergeProvider, "merge provider");
    provider_slot!(rollback, with_rollback, RollbackEnvironment, "rollback environment");
    provider_slot!(checkin, with_checkin, CheckinEnvironment, "checkin environment");
    provider_slot!(annotation, with_annotation, AnnotationProvider, "annotation provider");
    provider_slot!(update, with_update, UpdateEnvironment, "update environment");
    provider_slot!(configurable, with_configurable, Configurable, "configuration provider");
    provider_slot!(
        revision_selector,
        with_revision_selector,
        RevisionSelector,
        "revision selector"
    );

    fn ids(&self) -> Vec<(&'static str, &str)> {
        let slots = [
            ("change", self.change.as_ref().map(|p| p.id())),
            ("diff", self.diff.as_ref().map(|p| p.id())),
            ("history", self.history.as_ref().map(|p| p.id())),
            ("merge", self.merge.as_ref().map(|p| p.id())),
            ("rollback", self.rollback.as_ref().map(|p| p.id())),
            ("checkin", self.checkin.as_ref().map(|p| p.id())),
            ("annotation", self.annotation.as_ref().map(|p| p.id())),
            ("update", self.update.as_ref().map(|p| p.id())),
            ("configurable", self.configurable.as_ref().map(|p| p.id())),
            (
                "revision_selector",
                self.revision_selector.as_ref().map(|p| p.id()),
            ),
        ];
        slots
            .into_iter()
            .filter_map(|(slot, id)| id.map(|id| (slot, id)))
            .collect()
    }
}

impl fmt::Debug for CapabilityProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.ids()).finish()
    }
}
