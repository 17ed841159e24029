//! In-process pub/sub transport.
//!
//! [`TransportHandle`] plays the broker: it publishes to subscribed channels
//! and can inject arbitrary frames. Dropping every handle (or calling
//! [`TransportHandle::disconnect`]) ends the connection.

use super::{PubSubTransport, RawMessage};
use crate::error::ConsumerResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Subscriber side of the in-process transport.
pub struct InMemoryTransport {
    receiver: mpsc::UnboundedReceiver<RawMessage>,
    subscribed: Arc<Mutex<HashSet<String>>>,
    acks: VecDeque<RawMessage>,
}

/// Broker side of the in-process transport.
#[derive(Clone)]
pub struct TransportHandle {
    sender: mpsc::UnboundedSender<RawMessage>,
    subscribed: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryTransport {
    pub fn new() -> (Self, TransportHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscribed = Arc::new(Mutex::new(HashSet::new()));

        let transport = Self {
            receiver,
            subscribed: subscribed.clone(),
            acks: VecDeque::new(),
        };
        let handle = TransportHandle { sender, subscribed };
        (transport, handle)
    }
}

impl TransportHandle {
    /// Publish `payload` on `channel`. Returns the number of subscribers
    /// that received it (0 or 1), like Redis `PUBLISH`.
    pub fn publish(&self, channel: &str, payload: impl Into<Vec<u8>>) -> usize {
        if !self.is_subscribed(channel) {
            return 0;
        }
        match self.sender.send(RawMessage::message(channel, payload)) {
            Ok(()) => 1,
            Err(_) => 0,
        }
    }

    /// Deliver a frame regardless of subscriptions.
    pub fn inject(&self, frame: RawMessage) -> bool {
        self.sender.send(frame).is_ok()
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.subscribed.lock().contains(channel)
    }

    pub fn subscribed_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.subscribed.lock().iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Drop this handle. The connection ends once every handle is gone and
    /// already delivered frames have been read.
    pub fn disconnect(self) {}
}

#[async_trait]
impl PubSubTransport for InMemoryTransport {
    async fn subscribe(&mut self, channel: &str) -> ConsumerResult<()> {
        self.subscribed.lock().insert(channel.to_string());
        self.acks.push_back(RawMessage::subscription_ack(channel));
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<RawMessage> {
        if let Some(ack) = self.acks.pop_front() {
            return Some(ack);
        }
        self.receiver.recv().await
    }
}
