//! Script attachment: the script source bound to a lorebook.
//!
//! The same logical attachment has two storage locations: the lorebook's
//! own `extensions` (survives entry deletion) and the `extensions` of one
//! entry (survives the host's export/import, which only carries entries).
//! Reads go through [`Lorebook::script`]; writes go through
//! [`Lorebook::attach_script`] and [`Lorebook::normalize_script`], which
//! keep both locations converged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Lorebook;

/// Extension key holding the attachment in both locations.
pub const SCRIPT_EXTENSION_KEY: &str = "luaLoreBook";

const SOURCE_FIELD: &str = "luaCode";

/// Script source attached to a lorebook.
///
/// Fields other than the source are carried along untouched when the
/// attachment is copied between locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAttachment {
    #[serde(rename = "luaCode", default)]
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScriptAttachment {
    /// An attachment holding only `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            extra: Map::new(),
        }
    }

    /// A whitespace-only source does not count as a script.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    fn read(extensions: &Map<String, Value>) -> Option<Self> {
        let value = extensions.get(SCRIPT_EXTENSION_KEY)?;
        Self::deserialize(value).ok()
    }

    fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert(SOURCE_FIELD.to_string(), Value::String(self.source.clone()));
        Value::Object(map)
    }
}

/// Which location wins when both hold differing attachments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPolicy {
    /// The lorebook-level attachment wins; the entry-level one fills in
    /// only when the lorebook has none.
    #[default]
    PreferLorebook,
    /// The entry-level attachment wins; the lorebook-level one fills in
    /// only when no entry has one.
    PreferEntry,
}

impl AttachmentPolicy {
    /// Pick the authoritative attachment out of the two locations.
    #[must_use]
    pub fn choose(
        self,
        lorebook: Option<ScriptAttachment>,
        entry: Option<ScriptAttachment>,
    ) -> Option<ScriptAttachment> {
        match self {
            Self::PreferLorebook => lorebook.or(entry),
            Self::PreferEntry => entry.or(lorebook),
        }
    }
}

impl fmt::Display for AttachmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreferLorebook => f.write_str("prefer_lorebook"),
            Self::PreferEntry => f.write_str("prefer_entry"),
        }
    }
}

/// Returned when parsing an unknown [`AttachmentPolicy`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attachment policy {0:?} (expected prefer_lorebook or prefer_entry)")]
pub struct ParsePolicyError(String);

impl FromStr for AttachmentPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefer_lorebook" => Ok(Self::PreferLorebook),
            "prefer_entry" => Ok(Self::PreferEntry),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

impl Lorebook {
    /// Attachment stored at the lorebook level.
    #[must_use]
    pub fn lorebook_script(&self) -> Option<ScriptAttachment> {
        ScriptAttachment::read(&self.extensions)
    }

    /// First attachment found on an entry, in iteration order.
    #[must_use]
    pub fn entry_script(&self) -> Option<ScriptAttachment> {
        self.iter()
            .find_map(|entry| ScriptAttachment::read(&entry.extensions))
    }

    /// The attachment that applies to this lorebook under `policy`.
    #[must_use]
    pub fn script(&self, policy: AttachmentPolicy) -> Option<ScriptAttachment> {
        policy.choose(self.lorebook_script(), self.entry_script())
    }

    /// Store `attachment` as the single canonical attachment.
    ///
    /// Writes the lorebook-level slot, strips the attachment from every
    /// entry and re-attaches it to the first entry. A lorebook without
    /// entries only gets the lorebook-level slot. Returns `true` when
    /// anything changed.
    pub fn attach_script(&mut self, attachment: &ScriptAttachment) -> bool {
        let value = attachment.to_value();
        let mut changed = false;

        if self.extensions.get(SCRIPT_EXTENSION_KEY) != Some(&value) {
            self.extensions
                .insert(SCRIPT_EXTENSION_KEY.to_string(), value.clone());
            changed = true;
        }

        let mut entries = self.entries.values_mut();
        if let Some(first) = entries.next()
            && first.extensions.get(SCRIPT_EXTENSION_KEY) != Some(&value)
        {
            first
                .extensions
                .insert(SCRIPT_EXTENSION_KEY.to_string(), value.clone());
            changed = true;
        }
        for entry in entries {
            if entry.extensions.remove(SCRIPT_EXTENSION_KEY).is_some() {
                changed = true;
            }
        }

        changed
    }

    /// Converge both storage locations onto the attachment chosen by `policy`.
    ///
    /// Returns `true` when the lorebook was modified and needs persisting.
    /// Running it twice in a row always returns `false` the second time.
    pub fn normalize_script(&mut self, policy: AttachmentPolicy) -> bool {
        match self.script(policy) {
            Some(attachment) => self.attach_script(&attachment),
            None => false,
        }
    }
}
