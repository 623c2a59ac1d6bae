//! Activation port: the host's single activation channel.

use std::future::Future;

use lorescript_domain::error::LoreError;
use lorescript_domain::event::ActivationBatch;

/// Emits activation batches to whoever consumes them on the host side.
pub trait ActivationPublisher {
    /// Publish one batch. Called once per triggering event.
    fn publish(&self, batch: ActivationBatch) -> impl Future<Output = Result<(), LoreError>> + Send;
}

impl<T: ActivationPublisher + Send + Sync> ActivationPublisher for std::sync::Arc<T> {
    fn publish(&self, batch: ActivationBatch) -> impl Future<Output = Result<(), LoreError>> + Send {
        (**self).publish(batch)
    }
}
