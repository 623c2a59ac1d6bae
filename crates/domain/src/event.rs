//! Events: host triggers coming in, activation batches going out.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::EntryHandle;
use crate::id::BatchId;

/// Something the host reports that this subsystem reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// The user sent a message.
    MessageSent,
    /// The user swiped to another reply.
    MessageSwiped,
    /// A lorebook was saved by the host.
    LorebookUpdated { name: String },
}

impl HostEvent {
    /// Whether this event starts an activation run.
    #[must_use]
    pub fn triggers_activation(&self) -> bool {
        matches!(self, Self::MessageSent | Self::MessageSwiped)
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MessageSent => f.write_str("message_sent"),
            Self::MessageSwiped => f.write_str("message_swiped"),
            Self::LorebookUpdated { name } => write!(f, "lorebook_updated({name})"),
        }
    }
}

/// Kind of host event an activation run answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationTrigger {
    MessageSent,
    MessageSwiped,
}

impl ActivationTrigger {
    /// The trigger carried by `event`, if it starts a run.
    #[must_use]
    pub fn from_event(event: &HostEvent) -> Option<Self> {
        match event {
            HostEvent::MessageSent => Some(Self::MessageSent),
            HostEvent::MessageSwiped => Some(Self::MessageSwiped),
            HostEvent::LorebookUpdated { .. } => None,
        }
    }
}

/// The reconciled entries of one activation run, across all lorebooks.
///
/// Exactly one batch is emitted per triggering event. Entries are the
/// host's canonical instances, in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationBatch {
    pub id: BatchId,
    pub trigger: ActivationTrigger,
    pub emitted_at: DateTime<Utc>,
    pub entries: Vec<EntryHandle>,
}

impl ActivationBatch {
    #[must_use]
    pub fn new(trigger: ActivationTrigger, entries: Vec<EntryHandle>) -> Self {
        Self {
            id: BatchId::new(),
            trigger,
            emitted_at: Utc::now(),
            entries,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use serde_json::json;

    #[test]
    fn should_parse_tagged_host_events() {
        let event: HostEvent = serde_json::from_str(r#"{"type":"message_sent"}"#).unwrap();
        assert_eq!(event, HostEvent::MessageSent);

        let event: HostEvent =
            serde_json::from_str(r#"{"type":"lorebook_updated","name":"Town"}"#).unwrap();
        assert_eq!(
            event,
            HostEvent::LorebookUpdated {
                name: "Town".to_string()
            }
        );
    }

    #[test]
    fn should_trigger_activation_only_for_message_events() {
        assert!(HostEvent::MessageSent.triggers_activation());
        assert!(HostEvent::MessageSwiped.triggers_activation());
        let update = HostEvent::LorebookUpdated {
            name: "Town".to_string(),
        };
        assert!(!update.triggers_activation());
        assert_eq!(ActivationTrigger::from_event(&update), None);
    }

    #[test]
    fn should_serialize_batch_with_entry_bodies() {
        let batch = ActivationBatch::new(
            ActivationTrigger::MessageSwiped,
            vec![EntryHandle::new(Entry::new(1).with_automation_id("auto-1"))],
        );
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["trigger"], json!("message_swiped"));
        assert_eq!(value["entries"][0]["automationId"], json!("auto-1"));
        assert_eq!(batch.len(), 1);
    }
}
