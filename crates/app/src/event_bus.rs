//! In-process channels between the host and the activation engine.
//!
//! [`InProcessEventBus`] fans activation batches out to any number of
//! listeners and may drop messages for a listener that falls behind.
//! [`ActivationQueue`] has exactly one consumer and never drops: a full
//! queue makes the publisher wait.

use std::future::Future;

use tokio::sync::{broadcast, mpsc};

use lorescript_domain::error::LoreError;
use lorescript_domain::event::ActivationBatch;

use crate::ports::ActivationPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Sending succeeds even when there are no active subscribers
/// (the message is simply dropped).
pub struct InProcessEventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> InProcessEventBus<E> {
    /// Create a new event bus with the given channel capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to messages on this bus.
    ///
    /// Returns a receiver that will get every message sent *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }

    /// Send a message to every current subscriber.
    ///
    /// Returns the number of subscribers that received it.
    pub fn send(&self, message: E) -> usize {
        // broadcast::send fails only when there are zero receivers.
        self.sender.send(message).unwrap_or(0)
    }
}

impl<E> Clone for InProcessEventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl ActivationPublisher for InProcessEventBus<ActivationBatch> {
    fn publish(&self, batch: ActivationBatch) -> impl Future<Output = Result<(), LoreError>> + Send {
        let delivered = self.send(batch);
        tracing::trace!(delivered, "activation batch sent on bus");
        async { Ok(()) }
    }
}

/// Bounded single-consumer queue of activation batches.
#[derive(Debug, Clone)]
pub struct ActivationQueue {
    sender: mpsc::Sender<ActivationBatch>,
}

impl ActivationQueue {
    /// Create a queue holding at most `capacity` unconsumed batches.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ActivationBatch>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl ActivationPublisher for ActivationQueue {
    fn publish(&self, batch: ActivationBatch) -> impl Future<Output = Result<(), LoreError>> + Send {
        let sender = self.sender.clone();
        async move {
            if let Err(mpsc::error::SendError(batch)) = sender.send(batch).await {
                tracing::warn!(batch_id = %batch.id, "activation batch dropped, consumer is gone");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lorescript_domain::entry::{Entry, EntryHandle};
    use lorescript_domain::event::{ActivationTrigger, HostEvent};

    #[tokio::test]
    async fn should_deliver_batch_to_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx = bus.subscribe();

        let handle = EntryHandle::new(Entry::new(1));
        let batch = ActivationBatch::new(ActivationTrigger::MessageSent, vec![handle.clone()]);
        let batch_id = batch.id;

        bus.publish(batch).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, batch_id);
        assert!(received.entries[0].ptr_eq(&handle));
    }

    #[tokio::test]
    async fn should_deliver_host_event_to_multiple_subscribers() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.send(HostEvent::MessageSwiped), 2);

        assert_eq!(rx1.recv().await.unwrap(), HostEvent::MessageSwiped);
        assert_eq!(rx2.recv().await.unwrap(), HostEvent::MessageSwiped);
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        let batch = ActivationBatch::new(ActivationTrigger::MessageSent, vec![]);
        assert!(bus.publish(batch).await.is_ok());
    }

    #[tokio::test]
    async fn should_not_deliver_messages_sent_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.send(HostEvent::MessageSent);

        let mut rx = bus.subscribe();
        bus.send(HostEvent::MessageSwiped);

        assert_eq!(rx.recv().await.unwrap(), HostEvent::MessageSwiped);
    }

    #[tokio::test]
    async fn should_make_publisher_wait_instead_of_dropping() {
        let (queue, mut rx) = ActivationQueue::new(1);
        let producer = tokio::spawn(async move {
            let mut ids = Vec::new();
            for _ in 0..5 {
                let batch = ActivationBatch::new(ActivationTrigger::MessageSent, vec![]);
                ids.push(batch.id);
                queue.publish(batch).await.unwrap();
            }
            ids
        });

        let mut received = Vec::new();
        while let Some(batch) = rx.recv().await {
            received.push(batch.id);
        }

        assert_eq!(received, producer.await.unwrap());
    }

    #[tokio::test]
    async fn should_succeed_when_queue_consumer_is_gone() {
        let (queue, rx) = ActivationQueue::new(1);
        drop(rx);
        let batch = ActivationBatch::new(ActivationTrigger::MessageSent, vec![]);
        assert!(queue.publish(batch).await.is_ok());
    }
}
