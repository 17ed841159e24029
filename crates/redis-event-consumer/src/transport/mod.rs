//! Publish/subscribe transport and the subscription built on it.
//!
//! A [`Subscription`] owns its transport for its whole life. `listen`
//! yields messages in arrival order, skips subscription acknowledgements,
//! and fails for good once the connection is gone: a lost subscription is
//! never resumed, a new one has to be opened.

mod memory;
mod redis_pubsub;

pub use self::memory::{InMemoryTransport, TransportHandle};
pub use self::redis_pubsub::RedisTransport;

use crate::channel::Channel;
use crate::error::{ConsumerError, ConsumerResult};
use async_trait::async_trait;
use tracing::{debug, info};

/// What a raw frame from the transport carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Confirmation that a channel subscription is active.
    SubscriptionAck,
    /// A published message.
    Message,
}

/// A frame as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub channel: String,
    pub payload: Vec<u8>,
    pub kind: MessageKind,
}

impl RawMessage {
    pub fn message(channel: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
            kind: MessageKind::Message,
        }
    }

    pub fn subscription_ack(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: Vec::new(),
            kind: MessageKind::SubscriptionAck,
        }
    }

    /// Payload as text for logging.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// A pub/sub connection.
#[async_trait]
pub trait PubSubTransport: Send {
    /// Subscribe to `channel`. The transport reports the confirmation as a
    /// [`MessageKind::SubscriptionAck`] frame.
    async fn subscribe(&mut self, channel: &str) -> ConsumerResult<()>;

    /// Wait for the next frame. `None` means the connection is gone.
    async fn next_frame(&mut self) -> Option<RawMessage>;
}

/// An open subscription to a fixed channel set.
pub struct Subscription<T> {
    transport: T,
    channels: Vec<Channel>,
    ended: bool,
}

impl<T: PubSubTransport> Subscription<T> {
    /// Subscribe `transport` to every channel in `channels`.
    pub async fn open(mut transport: T, channels: &[Channel]) -> ConsumerResult<Self> {
        for channel in channels {
            transport.subscribe(channel.name()).await?;
            info!(channel = %channel, "Subscribed to channel");
        }

        Ok(Self {
            transport,
            channels: channels.to_vec(),
            ended: false,
        })
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Wait for the next published message.
    ///
    /// Returns `TransportConnection` when the connection is lost, and on
    /// every call after that.
    pub async fn listen(&mut self) -> ConsumerResult<RawMessage> {
        if self.ended {
            return Err(ConsumerError::TransportConnection(
                "subscription has ended".to_string(),
            ));
        }

        loop {
            match self.transport.next_frame().await {
                Some(frame) if frame.kind == MessageKind::SubscriptionAck => {
                    debug!(channel = %frame.channel, "Skipping subscription acknowledgement");
                }
                Some(frame) => return Ok(frame),
                None => {
                    self.ended = true;
                    return Err(ConsumerError::TransportConnection(
                        "connection closed".to_string(),
                    ));
                }
            }
        }
    }
}
