//! Selection result: a script's decision, keyed by `automationId`.
//!
//! Scripts return `{ entries = { [automationId] = record } }`. A record
//! that is a table carries fields to merge onto the entry; `nil`/`false`
//! means "not selected"; any other value selects the entry unchanged.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::ScriptError;

/// Top-level key of the script's return value.
pub const ENTRIES_KEY: &str = "entries";

/// Entries chosen by one script run, with their override records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionResult {
    selections: HashMap<String, Map<String, Value>>,
}

impl SelectionResult {
    /// An empty result: nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `automation_id` with the given override record.
    #[must_use]
    pub fn with_selection(
        mut self,
        automation_id: impl Into<String>,
        overrides: Map<String, Value>,
    ) -> Self {
        self.selections.insert(automation_id.into(), overrides);
        self
    }

    /// Interpret a script's return value.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::MalformedResult`] when the value is not a
    /// table, has no `entries` table, or uses keys that cannot name an entry.
    pub fn from_script_output(output: Value) -> Result<Self, ScriptError> {
        let mut root = match output {
            Value::Object(root) => root,
            other => {
                return Err(malformed(format!(
                    "expected a table, got {}",
                    kind(&other)
                )));
            }
        };
        let entries = root
            .remove(ENTRIES_KEY)
            .ok_or_else(|| malformed("missing `entries` table".to_string()))?;

        let records: Vec<(String, Value)> = match entries {
            Value::Object(map) => map.into_iter().collect(),
            // A Lua sequence: positions are the keys.
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, value)| ((index + 1).to_string(), value))
                .collect(),
            other => {
                return Err(malformed(format!(
                    "`entries` must be a table, got {}",
                    kind(&other)
                )));
            }
        };

        let mut selections = HashMap::with_capacity(records.len());
        for (automation_id, record) in records {
            match record {
                Value::Null | Value::Bool(false) => {}
                Value::Object(overrides) => {
                    selections.insert(automation_id, overrides);
                }
                _ => {
                    selections.insert(automation_id, Map::new());
                }
            }
        }
        Ok(Self { selections })
    }

    /// The override record for `automation_id`, if selected.
    #[must_use]
    pub fn get(&self, automation_id: &str) -> Option<&Map<String, Value>> {
        self.selections.get(automation_id)
    }

    #[must_use]
    pub fn is_selected(&self, automation_id: &str) -> bool {
        self.selections.contains_key(automation_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

fn malformed(reason: String) -> ScriptError {
    ScriptError::MalformedResult { reason }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "table",
    }
}
