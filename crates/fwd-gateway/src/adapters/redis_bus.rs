//! Redis pub/sub directive channel.
//!
//! Publishing uses a multiplexed connection; each subscription owns a
//! dedicated pub/sub connection whose messages are pumped into a channel by
//! a background task.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use shared_bus::{DirectivePublisher, DirectiveSource, PublishError};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Buffered directives per subscription.
const SUBSCRIPTION_BUFFER: usize = 64;

pub struct RedisDirectiveBus {
    client: redis::Client,
    conn: MultiplexedConnection,
    published: AtomicU64,
}

impl RedisDirectiveBus {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(url, "Connected to Redis directive channel");
        Ok(Self {
            client,
            conn,
            published: AtomicU64::new(0),
        })
    }

    /// Subscribe to `topic` on a dedicated connection.
    pub async fn subscribe(&self, topic: &str) -> Result<RedisSubscription, redis::RedisError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;
        info!(topic, "Subscribed to directive topic");

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let pump_topic = topic.to_string();
        let pump = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let payload: Vec<u8> = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(topic = %pump_topic, error = %e, "Unreadable directive payload");
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
            debug!(topic = %pump_topic, "Directive subscription ended");
        });

        Ok(RedisSubscription {
            topic: topic.to_string(),
            receiver: rx,
            pump,
        })
    }
}

#[async_trait]
impl DirectivePublisher for RedisDirectiveBus {
    async fn publish(&self, payload: &[u8], topic: &str) -> Result<usize, PublishError> {
        if topic.is_empty() {
            return Err(PublishError::EmptyTopic);
        }

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(topic, payload)
            .await
            .map_err(|e| PublishError::Backend(e.to_string()))?;

        self.published.fetch_add(1, Ordering::Relaxed);
        debug!(topic, receivers, "Directive published");
        Ok(usize::try_from(receivers).unwrap_or(0))
    }

    fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// A live Redis subscription to one topic.
pub struct RedisSubscription {
    topic: String,
    receiver: mpsc::Receiver<Vec<u8>>,
    pump: JoinHandle<()>,
}

#[async_trait]
impl DirectiveSource for RedisSubscription {
    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }

    fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for RedisSubscription {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
