//! Execution snapshot: the input bundle passed into a script run.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::lorebook::Lorebook;
use crate::session::Conversation;

/// Read-only input of one script run: `{ chat, loreBook, context }`.
///
/// Built fresh per run from structural copies, so nothing the script does
/// to it can reach the host's objects. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionSnapshot {
    pub chat: Vec<Value>,
    #[serde(rename = "loreBook")]
    pub lore_book: Map<String, Value>,
    pub context: Value,
}

impl ExecutionSnapshot {
    /// Capture the conversation and the lorebook's entries keyed by uid.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if an entry cannot be represented as JSON.
    pub fn capture(
        conversation: &Conversation,
        lorebook: &Lorebook,
    ) -> Result<Self, serde_json::Error> {
        let mut lore_book = Map::new();
        for entry in lorebook.iter() {
            lore_book.insert(entry.uid.to_string(), serde_json::to_value(entry)?);
        }
        Ok(Self {
            chat: conversation.chat.clone(),
            lore_book,
            context: conversation.context.clone(),
        })
    }
}
