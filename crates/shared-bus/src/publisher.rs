//! # Directive Publisher
//!
//! Defines the publishing side of the directive bus.

use crate::directive::TopicMessage;
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Errors from publishing a directive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Topic name is empty.
    #[error("empty topic")]
    EmptyTopic,

    /// The underlying channel rejected the publish.
    #[error("publish failed: {0}")]
    Backend(String),
}

/// Trait for publishing payloads to a named topic.
///
/// The gateway uses this to address control messages at one specific
/// instance (the topic is that instance's container identity).
#[async_trait]
pub trait DirectivePublisher: Send + Sync {
    /// Publish `payload` on `topic`.
    ///
    /// # Returns
    ///
    /// The number of subscribers the channel reports as having received it.
    /// Zero receivers is not an error: the target may simply be gone.
    async fn publish(&self, payload: &[u8], topic: &str) -> Result<usize, PublishError>;

    /// Total publishes accepted by this publisher.
    fn published(&self) -> u64;
}

/// In-memory implementation of the directive bus.
///
/// Uses `tokio::sync::broadcast`; every subscription sees every message and
/// keeps only those on its own topic. Suitable for a single process hosting
/// one or more gateway instances (tests run several side by side).
pub struct InMemoryDirectiveBus {
    /// Broadcast sender for topic messages.
    sender: broadcast::Sender<TopicMessage>,

    /// Active subscription count by topic.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    /// Total messages published.
    published: AtomicU64,

}

impl InMemoryDirectiveBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            published: AtomicU64::new(0),
        }
    }

    /// Subscribe to messages published on `topic`.
    #[must_use]
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let receiver = self.sender.subscribe();

        if let Ok(mut subs) = self.subscriptions.write() {
            *subs.entry(topic.to_string()).or_insert(0) += 1;
        }

        debug!(topic, "New directive subscription");

        Subscription::new(receiver, topic.to_string(), self.subscriptions.clone())
    }

    /// Number of live subscriptions on a topic.
    #[must_use]
    pub fn topic_subscribers(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .ok()
            .and_then(|subs| subs.get(topic).copied())
            .unwrap_or(0)
    }
}

impl Default for InMemoryDirectiveBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectivePublisher for InMemoryDirectiveBus {
    async fn publish(&self, payload: &[u8], topic: &str) -> Result<usize, PublishError> {
        if topic.is_empty() {
            return Err(PublishError::EmptyTopic);
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        let receivers = self.topic_subscribers(topic);

        let message = TopicMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };

        // A send error only means nobody is subscribed to anything.
        if self.sender.send(message).is_err() {
            debug!(topic, "Directive dropped (no subscribers)");
            return Ok(0);
        }

        debug!(topic, receivers, "Directive published");
        Ok(receivers)
    }

    fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
