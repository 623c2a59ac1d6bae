//! Script service: locating, normalizing, and editing script attachments.

use lorescript_domain::error::{LoreError, NotFoundError, ValidationError};
use lorescript_domain::lorebook::{AttachmentPolicy, Lorebook, ScriptAttachment};

use crate::ports::LorebookRepository;

/// Application service for the script attached to a lorebook.
pub struct ScriptService<R> {
    repo: R,
    policy: AttachmentPolicy,
}

impl<R: LorebookRepository> ScriptService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R, policy: AttachmentPolicy) -> Self {
        Self { repo, policy }
    }

    /// The policy used to pick between divergent attachments.
    #[must_use]
    pub fn policy(&self) -> AttachmentPolicy {
        self.policy
    }

    /// Find the script attached to lorebook `name`.
    ///
    /// Read-only: divergent storage locations are resolved by policy but not
    /// rewritten. See [`Self::normalize`].
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::NotFound`] when the lorebook does not exist,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, name: &str) -> Result<Option<ScriptAttachment>, LoreError> {
        let lorebook = self.load_existing(name).await?;
        Ok(lorebook.script(self.policy))
    }

    /// Converge the lorebook-level and entry-level attachments of `name`.
    ///
    /// Persists only when something actually changed, and returns whether it
    /// did. A second call right after is always a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::NotFound`] when the lorebook does not exist,
    /// or a storage error when loading or persisting fails.
    #[tracing::instrument(skip(self))]
    pub async fn normalize(&self, name: &str) -> Result<bool, LoreError> {
        let mut lorebook = self.load_existing(name).await?;
        if !lorebook.normalize_script(self.policy) {
            tracing::debug!("script attachment already consistent");
            return Ok(false);
        }
        if let Err(err) = self.repo.save(name, lorebook).await {
            tracing::error!(error = %err, "failed to persist normalized lorebook");
            return Err(err);
        }
        tracing::info!("script attachment normalized");
        Ok(true)
    }

    /// Script source shown by the editor; empty when no script is attached.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::NotFound`] when the lorebook does not exist,
    /// or a storage error from the repository.
    pub async fn load_source(&self, name: &str) -> Result<String, LoreError> {
        Ok(self
            .locate(name)
            .await?
            .map(|attachment| attachment.source)
            .unwrap_or_default())
    }

    /// Store editor content as the lorebook's script and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`LoreError::Validation`] for an empty name,
    /// [`LoreError::NotFound`] when the lorebook does not exist, or a
    /// storage error when loading or persisting fails.
    #[tracing::instrument(skip(self, source), fields(source_len = source.len()))]
    pub async fn save_source(&self, name: &str, source: String) -> Result<(), LoreError> {
        let mut lorebook = self.load_existing(name).await?;
        lorebook.attach_script(&ScriptAttachment::new(source));
        self.repo.save(name, lorebook).await
    }

    async fn load_existing(&self, name: &str) -> Result<Lorebook, LoreError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyLorebookName.into());
        }
        self.repo.load(name).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Lorebook",
                id: name.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorescript_domain::entry::{Entry, EntryHandle};
    use lorescript_domain::lorebook::SCRIPT_EXTENSION_KEY;
    use serde_json::json;
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;

    // ── In-memory lorebook repo ────────────────────────────────────

    #[derive(Default)]
    struct InMemoryLorebookRepo {
        store: Mutex<HashMap<String, Lorebook>>,
        saves: Mutex<usize>,
        fail_saves: bool,
    }

    impl InMemoryLorebookRepo {
        fn with(name: &str, lorebook: Lorebook) -> Self {
            let repo = Self::default();
            repo.store.lock().unwrap().insert(name.to_string(), lorebook);
            repo
        }

        fn saves(&self) -> usize {
            *self.saves.lock().unwrap()
        }

        fn stored(&self, name: &str) -> Lorebook {
            self.store.lock().unwrap().get(name).cloned().unwrap()
        }
    }

    impl LorebookRepository for InMemoryLorebookRepo {
        fn load(
            &self,
            name: &str,
        ) -> impl Future<Output = Result<Option<Lorebook>, LoreError>> + Send {
            let r = self.store.lock().unwrap().get(name).cloned();
            async { Ok(r) }
        }
        fn save(
            &self,
            name: &str,
            lorebook: Lorebook,
        ) -> impl Future<Output = Result<(), LoreError>> + Send {
            let result = if self.fail_saves {
                Err(LoreError::Storage(Box::new(std::io::Error::other("read-only"))))
            } else {
                *self.saves.lock().unwrap() += 1;
                self.store.lock().unwrap().insert(name.to_string(), lorebook);
                Ok(())
            };
            async { result }
        }
        fn canonical_entries(
            &self,
            _name: &str,
        ) -> impl Future<Output = Result<Vec<EntryHandle>, LoreError>> + Send {
            async { Ok(Vec::new()) }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn scripted(entry: Entry, source: &str) -> Entry {
        let mut entry = entry;
        entry
            .extensions
            .insert(SCRIPT_EXTENSION_KEY.to_string(), json!({"luaCode": source}));
        entry
    }

    fn divergent() -> Lorebook {
        let mut lorebook = Lorebook::new()
            .with_entry(Entry::new(0))
            .with_entry(scripted(Entry::new(1), "entry-level"));
        lorebook.extensions.insert(
            SCRIPT_EXTENSION_KEY.to_string(),
            json!({"luaCode": "lorebook-level"}),
        );
        lorebook
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_locate_lorebook_level_script_first() {
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", divergent()),
            AttachmentPolicy::default(),
        );
        let script = service.locate("Town").await.unwrap().unwrap();
        assert_eq!(script.source, "lorebook-level");
    }

    #[tokio::test]
    async fn should_locate_nothing_without_attachment() {
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", Lorebook::new().with_entry(Entry::new(0))),
            AttachmentPolicy::default(),
        );
        assert!(service.locate("Town").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_return_not_found_for_unknown_lorebook() {
        let service = ScriptService::new(InMemoryLorebookRepo::default(), AttachmentPolicy::default());
        let result = service.locate("Nowhere").await;
        assert!(matches!(result, Err(LoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_reject_empty_lorebook_name() {
        let service = ScriptService::new(InMemoryLorebookRepo::default(), AttachmentPolicy::default());
        let result = service.save_source("", "x".to_string()).await;
        assert!(matches!(
            result,
            Err(LoreError::Validation(ValidationError::EmptyLorebookName))
        ));
    }

    #[tokio::test]
    async fn should_persist_normalization_once() {
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", divergent()),
            AttachmentPolicy::default(),
        );

        assert!(service.normalize("Town").await.unwrap());
        assert!(!service.normalize("Town").await.unwrap());

        assert_eq!(service.repo.saves(), 1);
        let stored = service.repo.stored("Town");
        assert_eq!(stored.lorebook_script().unwrap().source, "lorebook-level");
        assert_eq!(stored.entry_script().unwrap().source, "lorebook-level");
    }

    #[tokio::test]
    async fn should_follow_entry_policy_when_normalizing() {
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", divergent()),
            AttachmentPolicy::PreferEntry,
        );

        assert!(service.normalize("Town").await.unwrap());

        let stored = service.repo.stored("Town");
        assert_eq!(stored.lorebook_script().unwrap().source, "entry-level");
    }

    #[tokio::test]
    async fn should_not_write_when_lorebook_has_no_entries() {
        let mut lorebook = Lorebook::new();
        lorebook
            .extensions
            .insert(SCRIPT_EXTENSION_KEY.to_string(), json!({"luaCode": "top"}));
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Empty", lorebook),
            AttachmentPolicy::default(),
        );

        assert!(!service.normalize("Empty").await.unwrap());
        assert_eq!(service.repo.saves(), 0);
    }

    #[tokio::test]
    async fn should_surface_persistence_failure() {
        let repo = InMemoryLorebookRepo {
            fail_saves: true,
            ..InMemoryLorebookRepo::with("Town", divergent())
        };
        let service = ScriptService::new(repo, AttachmentPolicy::default());

        let result = service.normalize("Town").await;

        assert!(matches!(result, Err(LoreError::Storage(_))));
    }

    #[tokio::test]
    async fn should_roundtrip_editor_source_byte_identically() {
        let source = "-- ünïcode\r\nfunction entries(data)\n\treturn {entries={}}\nend\n  ";
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", Lorebook::new().with_entry(Entry::new(0))),
            AttachmentPolicy::default(),
        );

        service.save_source("Town", source.to_string()).await.unwrap();

        assert_eq!(service.load_source("Town").await.unwrap(), source);
    }

    #[tokio::test]
    async fn should_load_empty_source_without_script() {
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", Lorebook::new()),
            AttachmentPolicy::default(),
        );
        assert_eq!(service.load_source("Town").await.unwrap(), "");
    }

    #[tokio::test]
    async fn should_replace_stale_attachments_on_save() {
        let service = ScriptService::new(
            InMemoryLorebookRepo::with("Town", divergent()),
            AttachmentPolicy::default(),
        );

        service.save_source("Town", "fresh".to_string()).await.unwrap();

        let stored = service.repo.stored("Town");
        assert_eq!(stored.lorebook_script().unwrap().source, "fresh");
        let attached: Vec<_> = stored
            .iter()
            .filter(|e| e.extensions.contains_key(SCRIPT_EXTENSION_KEY))
            .map(|e| e.uid.to_string())
            .collect();
        assert_eq!(attached, vec!["0"]);
    }
}
