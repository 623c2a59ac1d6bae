//! Filesystem implementation of [`SessionSource`].
//!
//! The host mirrors its session state into one JSON file:
//!
//! ```json
//! {
//!   "character_lorebook": "Town",
//!   "global_lorebooks": ["World"],
//!   "chat_lorebook": null,
//!   "chat": [{ "name": "User", "is_user": true, "mes": "Hello" }],
//!   "context": { "characterId": 0 }
//! }
//! ```
//!
//! Every field is optional. The file is re-read on every request so that
//! each activation run sees the current session.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

use lorescript_app::ports::SessionSource;
use lorescript_domain::error::LoreError;
use lorescript_domain::session::{ActiveLorebooks, Conversation};

use crate::error::StorageError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionFile {
    character_lorebook: Option<String>,
    global_lorebooks: Vec<String>,
    chat_lorebook: Option<String>,
    chat: Vec<Value>,
    context: Value,
}

/// Session state read from a JSON file.
#[derive(Debug, Clone)]
pub struct FsSessionSource {
    path: PathBuf,
}

impl FsSessionSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(path: PathBuf) -> Result<SessionFile, StorageError> {
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(StorageError::json(path)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no session file, using an empty session");
                Ok(SessionFile::default())
            }
            Err(err) => Err(StorageError::io(path)(err)),
        }
    }
}

impl SessionSource for FsSessionSource {
    fn active_lorebooks(&self) -> impl Future<Output = Result<ActiveLorebooks, LoreError>> + Send {
        let path = self.path.clone();
        async move {
            let file = Self::read(path).await?;
            Ok(ActiveLorebooks {
                character: file.character_lorebook,
                global: file.global_lorebooks,
                chat: file.chat_lorebook,
            })
        }
    }

    fn conversation(&self) -> impl Future<Output = Result<Conversation, LoreError>> + Send {
        let path = self.path.clone();
        async move {
            let file = Self::read(path).await?;
            let context = match file.context {
                Value::Null => Value::Object(Map::new()),
                context => context,
            };
            Ok(Conversation {
                chat: file.chat,
                context,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_with(content: &str) -> (tempfile::TempDir, FsSessionSource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, content).unwrap();
        (dir, FsSessionSource::new(path))
    }

    #[tokio::test]
    async fn should_read_active_lorebooks_in_binding_order() {
        let (_dir, source) = source_with(
            r#"{"character_lorebook": "Town", "global_lorebooks": ["World", "Town"], "chat_lorebook": "Chat"}"#,
        );

        let active = source.active_lorebooks().await.unwrap();

        assert_eq!(active.names(), vec!["Town", "World", "Chat"]);
    }

    #[tokio::test]
    async fn should_read_conversation() {
        let (_dir, source) = source_with(
            r#"{"chat": [{"name": "User", "mes": "hi"}], "context": {"characterId": 2}}"#,
        );

        let conversation = source.conversation().await.unwrap();

        assert_eq!(conversation.chat, vec![json!({"name": "User", "mes": "hi"})]);
        assert_eq!(conversation.context, json!({"characterId": 2}));
    }

    #[tokio::test]
    async fn should_default_to_empty_session_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSessionSource::new(dir.path().join("missing.json"));

        assert!(source.active_lorebooks().await.unwrap().names().is_empty());
        let conversation = source.conversation().await.unwrap();
        assert!(conversation.chat.is_empty());
        assert_eq!(conversation.context, json!({}));
    }

    #[tokio::test]
    async fn should_pick_up_changes_between_calls() {
        let (dir, source) = source_with(r#"{"global_lorebooks": ["A"]}"#);
        assert_eq!(source.active_lorebooks().await.unwrap().names(), vec!["A"]);

        std::fs::write(dir.path().join("session.json"), r#"{"global_lorebooks": ["B"]}"#)
            .unwrap();

        assert_eq!(source.active_lorebooks().await.unwrap().names(), vec!["B"]);
    }

    #[tokio::test]
    async fn should_report_malformed_session_file() {
        let (_dir, source) = source_with("[1, 2");
        assert!(matches!(
            source.active_lorebooks().await,
            Err(LoreError::Storage(_))
        ));
    }
}
