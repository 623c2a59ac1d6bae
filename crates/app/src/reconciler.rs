//! Reconciler: turns a selection result back into canonical entries.
//!
//! The host compares activated entries against its own instances, so the
//! output must be those instances, never copies. Each selected entry is
//! looked up in the [`EntryIndex`] by `(lorebook, uid)`; overrides are
//! written onto the canonical instance and its handle is returned.

use lorescript_domain::entry::EntryHandle;
use lorescript_domain::lorebook::Lorebook;
use lorescript_domain::selection::SelectionResult;

use crate::entry_index::EntryIndex;

/// Canonical entries of `lorebook` selected by `selection`, overrides applied.
///
/// Output follows the lorebook's entry iteration order. Entries without an
/// `automationId`, entries the script did not select, and entries with no
/// canonical instance in `index` are left out.
#[must_use]
pub fn reconcile(
    name: &str,
    lorebook: &Lorebook,
    selection: &SelectionResult,
    index: &EntryIndex,
) -> Vec<EntryHandle> {
    let mut activated = Vec::new();
    for entry in lorebook.iter() {
        let Some(automation_id) = entry.automation_id() else {
            continue;
        };
        let Some(overrides) = selection.get(automation_id) else {
            continue;
        };
        let Some(canonical) = index.get(name, &entry.uid) else {
            tracing::warn!(
                lorebook = %name,
                uid = %entry.uid,
                automation_id,
                "selected entry has no canonical instance, dropping it"
            );
            continue;
        };
        canonical.write().apply_overrides(overrides);
        activated.push(canonical.clone());
    }
    activated
}
