//! Session port: what the host currently has open.

use std::future::Future;

use lorescript_domain::error::LoreError;
use lorescript_domain::session::{ActiveLorebooks, Conversation};

/// Read access to the host's chat session.
pub trait SessionSource {
    /// Lorebooks bound to the character, selected globally, and bound to the chat.
    fn active_lorebooks(&self) -> impl Future<Output = Result<ActiveLorebooks, LoreError>> + Send;

    /// Chat history and ambient context, captured at call time.
    fn conversation(&self) -> impl Future<Output = Result<Conversation, LoreError>> + Send;
}

impl<T: SessionSource + Send + Sync> SessionSource for std::sync::Arc<T> {
    fn active_lorebooks(&self) -> impl Future<Output = Result<ActiveLorebooks, LoreError>> + Send {
        (**self).active_lorebooks()
    }

    fn conversation(&self) -> impl Future<Output = Result<Conversation, LoreError>> + Send {
        (**self).conversation()
    }
}
