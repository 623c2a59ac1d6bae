//! Filesystem implementation of [`LorebookRepository`].
//!
//! Each lorebook is one `<name>.json` file in the lorebook directory. The
//! repository also plays the host's part of owning the canonical entries:
//! it keeps one set of [`EntryHandle`]s per lorebook and hands out the same
//! instances until the file on disk changes.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use lorescript_app::ports::LorebookRepository;
use lorescript_domain::entry::EntryHandle;
use lorescript_domain::error::{LoreError, NotFoundError, ValidationError};
use lorescript_domain::lorebook::Lorebook;

use crate::error::StorageError;

const EXTENSION: &str = "json";

/// File state the cached handles were built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl Stamp {
    fn of(metadata: &std::fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

#[derive(Debug)]
struct Canonical {
    stamp: Stamp,
    handles: Vec<EntryHandle>,
}

type CanonicalCache = Arc<Mutex<HashMap<String, Canonical>>>;

/// Directory-backed lorebook repository.
///
/// Cloning is cheap and clones share the canonical entry cache.
#[derive(Debug, Clone)]
pub struct FsLorebookRepository {
    dir: PathBuf,
    cache: CanonicalCache,
}

impl FsLorebookRepository {
    /// Create a repository over `dir`. The directory is not touched until
    /// the first request.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Arc::default(),
        }
    }

    /// The directory lorebooks are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, ValidationError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{EXTENSION}")))
    }

    fn forget(cache: &CanonicalCache, name: &str) {
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

/// Reject names that would escape the lorebook directory.
fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyLorebookName);
    }
    let unsafe_name = name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if unsafe_name {
        return Err(ValidationError::InvalidLorebookName(name.to_string()));
    }
    Ok(())
}

async fn read_lorebook(path: &Path) -> Result<Option<Lorebook>, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::io(path)(err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(StorageError::json(path))
}

impl LorebookRepository for FsLorebookRepository {
    fn load(&self, name: &str) -> impl Future<Output = Result<Option<Lorebook>, LoreError>> + Send {
        let path = self.path_of(name);
        async move {
            let path = path?;
            Ok(read_lorebook(&path).await?)
        }
    }

    fn save(
        &self,
        name: &str,
        lorebook: Lorebook,
    ) -> impl Future<Output = Result<(), LoreError>> + Send {
        let path = self.path_of(name);
        let name = name.to_string();
        let dir = self.dir.clone();
        let cache = Arc::clone(&self.cache);
        async move {
            let path = path?;
            let bytes = serde_json::to_vec_pretty(&lorebook)?;

            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(StorageError::io(&dir))?;
            let staging = dir.join(format!(".{name}.{EXTENSION}.tmp"));
            tokio::fs::write(&staging, &bytes)
                .await
                .map_err(StorageError::io(&staging))?;
            tokio::fs::rename(&staging, &path)
                .await
                .map_err(StorageError::io(&path))?;

            Self::forget(&cache, &name);
            tracing::debug!(lorebook = %name, bytes = bytes.len(), "lorebook saved");
            Ok(())
        }
    }

    fn canonical_entries(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<EntryHandle>, LoreError>> + Send {
        let path = self.path_of(name);
        let name = name.to_string();
        let cache = Arc::clone(&self.cache);
        async move {
            let path = path?;
            let not_found = || NotFoundError {
                entity: "Lorebook",
                id: name.clone(),
            };

            let stamp = match tokio::fs::metadata(&path).await {
                Ok(metadata) => Stamp::of(&metadata),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    Self::forget(&cache, &name);
                    return Err(not_found().into());
                }
                Err(err) => return Err(StorageError::io(&path)(err).into()),
            };

            {
                let cached = cache.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(canonical) = cached.get(&name).filter(|c| c.stamp == stamp) {
                    return Ok(canonical.handles.clone());
                }
            }

            let lorebook = read_lorebook(&path).await?.ok_or_else(not_found)?;
            let handles: Vec<EntryHandle> = lorebook.iter().cloned().map(EntryHandle::new).collect();
            tracing::debug!(lorebook = %name, entries = handles.len(), "canonical entries refreshed");

            let mut cached = cache.lock().unwrap_or_else(PoisonError::into_inner);
            cached.insert(
                name.clone(),
                Canonical {
                    stamp,
                    handles: handles.clone(),
                },
            );
            Ok(handles)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorescript_domain::entry::{Entry, EntryUid};
    use lorescript_domain::lorebook::{SCRIPT_EXTENSION_KEY, ScriptAttachment};
    use serde_json::json;

    const TOWN: &str = r#"{
        "entries": {
            "0": {"uid": 0, "key": ["town"], "content": "The town square.", "automationId": "town", "weight": 1},
            "1": {"uid": 1, "key": ["castle"], "content": "A castle.", "extensions": {"position": 2}}
        },
        "name": "Town"
    }"#;

    fn repo_with_town() -> (tempfile::TempDir, FsLorebookRepository) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Town.json"), TOWN).unwrap();
        let repo = FsLorebookRepository::new(dir.path());
        (dir, repo)
    }

    #[tokio::test]
    async fn should_load_host_lorebook_file() {
        let (_dir, repo) = repo_with_town();

        let lorebook = repo.load("Town").await.unwrap().unwrap();

        assert_eq!(lorebook.len(), 2);
        let town = lorebook.get(&EntryUid::from(0)).unwrap();
        assert_eq!(town.automation_id(), Some("town"));
        assert_eq!(town.field("content"), Some(&json!("The town square.")));
    }

    #[tokio::test]
    async fn should_return_none_for_missing_lorebook() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsLorebookRepository::new(dir.path());
        assert!(repo.load("Nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_reject_path_escaping_names() {
        let (_dir, repo) = repo_with_town();
        for name in ["../Town", "a/b", "a\\b", "..", "/etc/passwd"] {
            let result = repo.load(name).await;
            assert!(
                matches!(result, Err(LoreError::Validation(ValidationError::InvalidLorebookName(_)))),
                "{name} accepted"
            );
        }
        assert!(matches!(
            repo.load("").await,
            Err(LoreError::Validation(ValidationError::EmptyLorebookName))
        ));
    }

    #[tokio::test]
    async fn should_report_invalid_json_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Bad.json"), "{ not json").unwrap();
        let repo = FsLorebookRepository::new(dir.path());

        assert!(matches!(repo.load("Bad").await, Err(LoreError::Storage(_))));
    }

    #[tokio::test]
    async fn should_save_and_preserve_unknown_fields() {
        let (dir, repo) = repo_with_town();
        let mut lorebook = repo.load("Town").await.unwrap().unwrap();
        lorebook.attach_script(&ScriptAttachment::new("function entries() end"));

        repo.save("Town", lorebook).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.path().join("Town.json")).unwrap()).unwrap();
        assert_eq!(raw["name"], json!("Town"));
        assert_eq!(raw["entries"]["1"]["extensions"]["position"], json!(2));
        assert_eq!(
            raw["extensions"][SCRIPT_EXTENSION_KEY]["luaCode"],
            json!("function entries() end")
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn should_return_same_canonical_instances_until_file_changes() {
        let (_dir, repo) = repo_with_town();

        let first = repo.canonical_entries("Town").await.unwrap();
        let second = repo.canonical_entries("Town").await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(first.iter().zip(&second).all(|(a, b)| a.ptr_eq(b)));
    }

    #[tokio::test]
    async fn should_share_canonical_instances_between_clones() {
        let (_dir, repo) = repo_with_town();
        let clone = repo.clone();

        let first = repo.canonical_entries("Town").await.unwrap();
        let second = clone.canonical_entries("Town").await.unwrap();

        assert!(first[0].ptr_eq(&second[0]));
    }

    #[tokio::test]
    async fn should_refresh_canonical_instances_after_save() {
        let (_dir, repo) = repo_with_town();
        let before = repo.canonical_entries("Town").await.unwrap();

        let lorebook = Lorebook::new().with_entry(Entry::new(7).with_automation_id("new"));
        repo.save("Town", lorebook).await.unwrap();
        let after = repo.canonical_entries("Town").await.unwrap();

        assert_eq!(after.len(), 1);
        assert!(!before[0].ptr_eq(&after[0]));
        assert_eq!(after[0].read().uid, EntryUid::from(7));
    }

    #[tokio::test]
    async fn should_report_missing_lorebook_when_listing_canonical_entries() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsLorebookRepository::new(dir.path());

        assert!(matches!(
            repo.canonical_entries("Nowhere").await,
            Err(LoreError::NotFound(_))
        ));
    }

    #[test]
    fn should_accept_ordinary_names() {
        for name in ["Town", "My World (v2)", "ünïcode", "a.b"] {
            assert!(validate_name(name).is_ok(), "{name} rejected");
        }
    }
}
