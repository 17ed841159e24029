//! Redis pub/sub transport.
//!
//! Subscriptions are made on a dedicated async pub/sub connection. Redis
//! confirms each SUBSCRIBE before the call returns; the confirmation is
//! surfaced as a `SubscriptionAck` frame so the subscription sees the same
//! frame sequence the server sent.

use super::{PubSubTransport, RawMessage};
use crate::error::{ConsumerError, ConsumerResult};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use redis::aio::PubSub;
use redis::{Client, Msg};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::{debug, warn};

type MessageStream = Pin<Box<dyn Stream<Item = Msg> + Send>>;

enum State {
    /// Accepting SUBSCRIBE calls.
    Subscribing(PubSub),
    /// Delivering messages; no further subscriptions.
    Streaming(MessageStream),
    Closed,
}

/// Redis pub/sub connection.
pub struct RedisTransport {
    state: State,
    acks: VecDeque<RawMessage>,
}

impl RedisTransport {
    /// Open a pub/sub connection using `client`.
    pub async fn connect(client: &Client) -> ConsumerResult<Self> {
        let pubsub = client.get_async_pubsub().await?;
        debug!("Opened Redis pub/sub connection");
        Ok(Self {
            state: State::Subscribing(pubsub),
            acks: VecDeque::new(),
        })
    }
}

#[async_trait]
impl PubSubTransport for RedisTransport {
    async fn subscribe(&mut self, channel: &str) -> ConsumerResult<()> {
        match &mut self.state {
            State::Subscribing(pubsub) => {
                pubsub.subscribe(channel).await?;
                self.acks.push_back(RawMessage::subscription_ack(channel));
                Ok(())
            }
            State::Streaming(_) => Err(ConsumerError::TransportConnection(format!(
                "cannot subscribe to {} after listening has started",
                channel
            ))),
            State::Closed => Err(ConsumerError::TransportConnection(
                "connection closed".to_string(),
            )),
        }
    }

    async fn next_frame(&mut self) -> Option<RawMessage> {
        if let Some(ack) = self.acks.pop_front() {
            return Some(ack);
        }

        if let State::Subscribing(_) = self.state {
            if let State::Subscribing(pubsub) = std::mem::replace(&mut self.state, State::Closed) {
                self.state = State::Streaming(Box::pin(pubsub.into_on_message()));
            }
        }

        let State::Streaming(stream) = &mut self.state else {
            return None;
        };

        match stream.next().await {
            Some(msg) => Some(RawMessage::message(
                msg.get_channel_name(),
                msg.get_payload_bytes(),
            )),
            None => {
                warn!("Redis pub/sub stream ended");
                self.state = State::Closed;
                None
            }
        }
    }
}
