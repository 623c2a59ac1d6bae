//! Entry Index: lookup from `(lorebook, uid)` to the host's canonical entry.
//!
//! Built fresh for every triggering event so that it never goes stale
//! against host-side edits. A lorebook that fails to load is left out;
//! the others are unaffected.

use std::collections::HashMap;

use lorescript_domain::entry::{EntryHandle, EntryUid};

use crate::ports::LorebookRepository;

/// Key of a canonical entry: the lorebook name and the entry's uid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub lorebook: String,
    pub uid: EntryUid,
}

impl EntryKey {
    #[must_use]
    pub fn new(lorebook: impl Into<String>, uid: EntryUid) -> Self {
        Self {
            lorebook: lorebook.into(),
            uid,
        }
    }
}

/// Canonical entries of every active lorebook.
#[derive(Debug, Default)]
pub struct EntryIndex {
    entries: HashMap<EntryKey, EntryHandle>,
}

impl EntryIndex {
    /// Ask the host for the canonical entries of each lorebook in `names`.
    ///
    /// Failures are logged and that lorebook's entries are simply absent.
    /// When the host reports the same uid twice, the first one wins.
    #[tracing::instrument(skip(repo))]
    pub async fn build<R: LorebookRepository>(repo: &R, names: &[String]) -> Self {
        let mut index = Self::default();
        for name in names {
            match repo.canonical_entries(name).await {
                Ok(handles) => {
                    for handle in handles {
                        index.insert(name, handle);
                    }
                }
                Err(err) => {
                    tracing::warn!(lorebook = %name, error = %err, "skipping lorebook in entry index");
                }
            }
        }
        tracing::debug!(entries = index.len(), "entry index built");
        index
    }

    /// Register a canonical entry unless its key is already taken.
    pub fn insert(&mut self, lorebook: &str, handle: EntryHandle) {
        let uid = handle.read().uid.clone();
        self.entries
            .entry(EntryKey::new(lorebook, uid))
            .or_insert(handle);
    }

    /// The canonical instance for `uid` in `lorebook`.
    #[must_use]
    pub fn get(&self, lorebook: &str, uid: &EntryUid) -> Option<&EntryHandle> {
        self.entries.get(&EntryKey::new(lorebook, uid.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
