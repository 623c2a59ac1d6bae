//! Lorebook repository port: the host's lorebook storage.

use std::future::Future;

use lorescript_domain::entry::EntryHandle;
use lorescript_domain::error::LoreError;
use lorescript_domain::lorebook::Lorebook;

/// Loads and persists lorebooks, and owns their canonical entries.
pub trait LorebookRepository {
    /// Load a lorebook body by name. `Ok(None)` when it does not exist.
    fn load(&self, name: &str) -> impl Future<Output = Result<Option<Lorebook>, LoreError>> + Send;

    /// Persist a lorebook body under `name`, replacing any previous one.
    fn save(&self, name: &str, lorebook: Lorebook) -> impl Future<Output = Result<(), LoreError>> + Send;

    /// The host's canonical entry instances of `name`, in host order.
    ///
    /// Repeated calls must hand out the same instances for as long as the
    /// host considers them current.
    fn canonical_entries(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<EntryHandle>, LoreError>> + Send;
}

impl<T: LorebookRepository + Send + Sync> LorebookRepository for std::sync::Arc<T> {
    fn load(&self, name: &str) -> impl Future<Output = Result<Option<Lorebook>, LoreError>> + Send {
        (**self).load(name)
    }

    fn save(&self, name: &str, lorebook: Lorebook) -> impl Future<Output = Result<(), LoreError>> + Send {
        (**self).save(name, lorebook)
    }

    fn canonical_entries(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<EntryHandle>, LoreError>> + Send {
        (**self).canonical_entries(name)
    }
}
