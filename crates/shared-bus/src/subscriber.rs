//! # Directive Subscriber
//!
//! Defines the subscription side of the directive bus.

use crate::directive::TopicMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

/// A source of raw directive payloads addressed to one topic.
///
/// The gateway's directive listener consumes this; the in-memory
/// [`Subscription`] and networked subscribers both implement it.
#[async_trait]
pub trait DirectiveSource: Send {
    /// Wait for the next payload.
    ///
    /// Returns `None` once the source is permanently closed.
    async fn next_payload(&mut self) -> Option<Vec<u8>>;

    /// The topic this source is bound to.
    fn topic(&self) -> &str;
}

/// A subscription handle for receiving directives on one topic.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    /// The broadcast receiver.
    receiver: broadcast::Receiver<TopicMessage>,

    /// Topic this subscription listens on.
    topic: String,

    /// Reference to subscription tracking (for cleanup).
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<TopicMessage>,
        topic: String,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    ) -> Self {
        Self {
            receiver,
            topic,
            subscriptions,
        }
    }

    /// Receive the next message on this subscription's topic.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The next message for this topic
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<TopicMessage> {
        loop {
            let message = match self.receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(topic = %self.topic, lagged = count, "Subscriber lagged, directives dropped");
                    continue;
                }
            };

            if message.topic == self.topic {
                return Some(message);
            }
        }
    }
}

#[async_trait]
impl DirectiveSource for Subscription {
    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        self.recv().await.map(|m| m.payload)
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Ok(mut subs) = self.subscriptions.write() else {
            return;
        };
        let Some(count) = subs.get_mut(&self.topic) else {
            return;
        };

        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.topic);
        }
        debug!(topic = %self.topic, "Directive subscription dropped");
    }
}
