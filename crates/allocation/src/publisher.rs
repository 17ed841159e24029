//! Outbound event publication.
//!
//! The message bus hands committed events to an [`EventPublisher`], which
//! puts them on a named pub/sub channel.

use crate::{AllocationError, AllocationResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the in-memory broadcast channel.
const IN_MEMORY_CAPACITY: usize = 1024;

/// A message as it was put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub channel: String,
    pub payload: String,
}

/// Sink for outbound events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, channel: &str, payload: &str) -> AllocationResult<()>;
}

/// Publishes with Redis `PUBLISH`.
#[derive(Clone)]
pub struct RedisPublisher {
    conn: MultiplexedConnection,
}

impl RedisPublisher {
    pub async fn connect(redis_url: &str) -> AllocationResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl EventPublisher for RedisPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> AllocationResult<()> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(channel, payload).await?;
        debug!(channel, receivers, "Published event");
        Ok(())
    }
}

/// In-process publisher: keeps a log of everything published and
/// broadcasts each message to live subscribers.
#[derive(Clone)]
pub struct InMemoryPublisher {
    log: Arc<Mutex<Vec<PublishedMessage>>>,
    sender: broadcast::Sender<PublishedMessage>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(IN_MEMORY_CAPACITY);
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            sender,
        }
    }

    /// Receive every message published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.log.lock().clone()
    }

    /// Messages published on `channel`, in order.
    pub fn published_on(&self, channel: &str) -> Vec<PublishedMessage> {
        self.log
            .lock()
            .iter()
            .filter(|message| message.channel == channel)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, channel: &str, payload: &str) -> AllocationResult<()> {
        let message = PublishedMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };
        self.log.lock().push(message.clone());
        // No live subscribers is not an error for a broadcast transport.
        let _ = self.sender.send(message);
        Ok(())
    }
}

/// A publisher that always fails. Useful for exercising publish errors.
#[derive(Debug, Clone, Default)]
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, channel: &str, _payload: &str) -> AllocationResult<()> {
        Err(AllocationError::Publish(format!("cannot publish to {channel}")))
    }
}
