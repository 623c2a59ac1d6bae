//! Session: which lorebooks currently apply and the ambient conversation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lorebooks bound to the current chat session, by binding site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveLorebooks {
    /// Lorebook bound to the active character.
    pub character: Option<String>,
    /// Globally selected lorebooks.
    pub global: Vec<String>,
    /// Lorebook bound to the current chat.
    pub chat: Option<String>,
}

impl ActiveLorebooks {
    /// Distinct lorebook names in processing order: character, globals, chat.
    ///
    /// Empty names are skipped; a lorebook bound in several places appears
    /// once, at its first position.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let candidates = self
            .character
            .iter()
            .chain(self.global.iter())
            .chain(self.chat.iter());
        for name in candidates {
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Ambient conversation state handed to scripts unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversation {
    /// Chat history, oldest message first, in the host's message shape.
    pub chat: Vec<Value>,
    /// Opaque host context object.
    pub context: Value,
}
