//! Shared handles to canonical entry instances.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Serialize, Serializer};

use super::Entry;

/// A canonical, host-owned entry.
///
/// Cloning a handle shares the same instance; it never copies the entry.
/// Two handles are the same entry only if [`EntryHandle::ptr_eq`] holds:
/// an equal-looking copy is a different entry as far as the host is
/// concerned.
#[derive(Clone)]
pub struct EntryHandle(Arc<RwLock<Entry>>);

impl EntryHandle {
    /// Take ownership of an entry and make it canonical.
    #[must_use]
    pub fn new(entry: Entry) -> Self {
        Self(Arc::new(RwLock::new(entry)))
    }

    /// Borrow the entry for reading.
    ///
    /// A poisoned lock is recovered: the entry is plain data and stays
    /// consistent field by field.
    pub fn read(&self) -> RwLockReadGuard<'_, Entry> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Borrow the entry for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, Entry> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current entry value, detached from the canonical instance.
    #[must_use]
    pub fn to_entry(&self) -> Entry {
        self.read().clone()
    }

    /// `true` when both handles point to the same canonical instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EntryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryHandle").field(&*self.read()).finish()
    }
}

impl Serialize for EntryHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}
