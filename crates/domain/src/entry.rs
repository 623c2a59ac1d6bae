//! Entry: a single knowledge unit inside a lorebook.
//!
//! An entry carries a stable [`EntryUid`] scoped to its lorebook, an
//! optional `automationId` that scripts use as their correlation key, and
//! every other host field verbatim. The host owns the canonical instances;
//! they circulate as [`EntryHandle`]s so that identity survives the trip
//! through a script.

mod handle;
mod uid;

pub use handle::EntryHandle;
pub use uid::EntryUid;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name of the correlation key in the host format.
pub const AUTOMATION_ID_FIELD: &str = "automationId";

/// A lorebook entry in the host's world-info format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub uid: EntryUid,
    #[serde(rename = "automationId", default)]
    pub automation_id: String,
    #[serde(default)]
    pub extensions: Map<String, Value>,
    /// Every other host field (`key`, `content`, `order`, …), preserved as-is.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entry {
    /// Create an entry with no correlation key and no extra fields.
    #[must_use]
    pub fn new(uid: impl Into<EntryUid>) -> Self {
        Self {
            uid: uid.into(),
            automation_id: String::new(),
            extensions: Map::new(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn with_automation_id(mut self, automation_id: impl Into<String>) -> Self {
        self.automation_id = automation_id.into();
        self
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// The correlation key, or `None` when the entry has none.
    ///
    /// Entries without a key can never be selected by a script.
    #[must_use]
    pub fn automation_id(&self) -> Option<&str> {
        if self.automation_id.is_empty() {
            None
        } else {
            Some(&self.automation_id)
        }
    }

    /// Look up a host field by name.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Merge a script override record onto this entry.
    ///
    /// Field-level overwrite: listed fields replace existing values or are
    /// added, unlisted fields stay untouched. `uid` is the identity key and
    /// is never overwritten. `automationId` only accepts strings and
    /// `extensions` only accepts objects; other shapes are ignored.
    pub fn apply_overrides(&mut self, overrides: &Map<String, Value>) {
        for (key, value) in overrides {
            match key.as_str() {
                "uid" => {}
                AUTOMATION_ID_FIELD => {
                    if let Value::String(id) = value {
                        self.automation_id.clone_from(id);
                    }
                }
                "extensions" => {
                    if let Value::Object(map) = value {
                        self.extensions.clone_from(map);
                    }
                }
                _ => {
                    self.fields.insert(key.clone(), value.clone());
                }
            }
        }
    }
}
