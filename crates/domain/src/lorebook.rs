//! Lorebook: a named collection of entries in the host's world-info format.
//!
//! The name is not part of the document: the host addresses lorebooks by
//! name and stores the body separately. Unknown top-level fields are kept
//! so that a load/save cycle never drops host data.

mod attachment;

pub use attachment::{AttachmentPolicy, ParsePolicyError, SCRIPT_EXTENSION_KEY, ScriptAttachment};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::{Entry, EntryUid};

/// A lorebook body: entries keyed by uid plus lorebook-level extensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lorebook {
    #[serde(default)]
    pub entries: BTreeMap<EntryUid, Entry>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Lorebook {
    /// Create an empty lorebook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, keyed by its own uid.
    #[must_use]
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.insert(entry);
        self
    }

    /// Insert or replace an entry, keyed by its own uid.
    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.uid.clone(), entry);
    }

    /// Entries in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    #[must_use]
    pub fn get(&self, uid: &EntryUid) -> Option<&Entry> {
        self.entries.get(uid)
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
