//! Activation engine: reacts to host events by running lorebook scripts.
//!
//! For each message event the engine resolves the active lorebooks, builds
//! a fresh [`EntryIndex`], and processes every lorebook in order: load it,
//! locate its script, run the script on a snapshot, reconcile the selection
//! onto canonical entries. The results of all lorebooks are published as a
//! single [`ActivationBatch`]. A lorebook-update event only normalizes the
//! script attachment of that lorebook.
//!
//! Every per-lorebook failure is logged and contained: the failing lorebook
//! contributes nothing, its siblings are unaffected.

use tokio::sync::mpsc;

use lorescript_domain::entry::EntryHandle;
use lorescript_domain::error::LoreError;
use lorescript_domain::event::{ActivationBatch, ActivationTrigger, HostEvent};
use lorescript_domain::id::RunId;
use lorescript_domain::lorebook::AttachmentPolicy;
use lorescript_domain::session::Conversation;
use lorescript_domain::snapshot::ExecutionSnapshot;

use crate::entry_index::EntryIndex;
use crate::ports::{ActivationPublisher, LorebookRepository, ScriptRunner, SessionSource};
use crate::reconciler::reconcile;
use crate::services::script_service::ScriptService;

/// Reactive activation engine driven by host events.
pub struct ActivationEngine<S, R, X, P> {
    session: S,
    repo: R,
    runner: X,
    publisher: P,
    scripts: ScriptService<R>,
}

impl<S, R, X, P> ActivationEngine<S, R, X, P>
where
    S: SessionSource,
    R: LorebookRepository + Clone,
    X: ScriptRunner,
    P: ActivationPublisher,
{
    /// Create a new engine.
    pub fn new(session: S, repo: R, runner: X, publisher: P, policy: AttachmentPolicy) -> Self {
        let scripts = ScriptService::new(repo.clone(), policy);
        Self {
            session,
            repo,
            runner,
            publisher,
            scripts,
        }
    }

    /// React to one host event.
    ///
    /// Message events start an activation run and return its batch;
    /// lorebook updates run normalization and return `None`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the session itself cannot be read or the
    /// batch cannot be published. Per-lorebook failures never surface here.
    #[tracing::instrument(skip(self, event), fields(event = %event))]
    pub async fn handle_event(&self, event: &HostEvent) -> Result<Option<ActivationBatch>, LoreError> {
        if let Some(trigger) = ActivationTrigger::from_event(event) {
            return self.activate(trigger).await.map(Some);
        }
        if let HostEvent::LorebookUpdated { name } = event
            && let Err(err) = self.scripts.normalize(name).await
        {
            tracing::warn!(lorebook = %name, error = %err, "normalization failed");
        }
        Ok(None)
    }

    /// Run every active lorebook's script and publish one aggregated batch.
    ///
    /// # Errors
    ///
    /// Returns an error when the active lorebooks or the conversation cannot
    /// be read from the session, or when publishing fails.
    pub async fn activate(&self, trigger: ActivationTrigger) -> Result<ActivationBatch, LoreError> {
        let run_id = RunId::new();
        let names = self.session.active_lorebooks().await?.names();
        tracing::debug!(%run_id, lorebooks = ?names, "activation run started");

        let index = EntryIndex::build(&self.repo, &names).await;
        let conversation = self.session.conversation().await?;

        let mut activated = Vec::new();
        for name in &names {
            match self.activate_lorebook(name, &index, &conversation).await {
                Ok(entries) => activated.extend(entries),
                Err(err) => {
                    tracing::warn!(%run_id, lorebook = %name, error = %err, "lorebook contributes no activations");
                }
            }
        }

        let batch = ActivationBatch::new(trigger, activated);
        tracing::info!(%run_id, batch_id = %batch.id, activated = batch.len(), "activation run finished");
        self.publisher.publish(batch.clone()).await?;
        Ok(batch)
    }

    /// Consume host events until every sender is gone.
    ///
    /// Events are handled one at a time, in arrival order. Senders wait
    /// while the queue is full, so every event gets its answer.
    pub async fn run(&self, mut events: mpsc::Receiver<HostEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle_event(&event).await {
                tracing::error!(event = %event, error = %err, "failed to handle host event");
            }
        }
        tracing::debug!("host event queue closed");
    }

    /// Activations contributed by a single lorebook.
    async fn activate_lorebook(
        &self,
        name: &str,
        index: &EntryIndex,
        conversation: &Conversation,
    ) -> Result<Vec<EntryHandle>, LoreError> {
        let Some(lorebook) = self.repo.load(name).await? else {
            tracing::debug!(lorebook = %name, "lorebook not found, skipping");
            return Ok(Vec::new());
        };
        let Some(script) = lorebook
            .script(self.scripts.policy())
            .filter(|script| !script.is_blank())
        else {
            tracing::trace!(lorebook = %name, "no script attached");
            return Ok(Vec::new());
        };

        let snapshot = ExecutionSnapshot::capture(conversation, &lorebook)?;
        tracing::debug!(
            lorebook = %name,
            chat_messages = snapshot.chat.len(),
            entries = snapshot.lore_book.len(),
            "executing lorebook script"
        );
        let selection = self.runner.run(name, &script, &snapshot)?;
        tracing::debug!(lorebook = %name, selected = selection.len(), "script returned");

        let activated = reconcile(name, &lorebook, &selection, index);
        tracing::debug!(
            lorebook = %name,
            uids = ?activated.iter().map(|h| h.read().uid.to_string()).collect::<Vec<_>>(),
            "activated entries"
        );
        Ok(activated)
    }
}
