//! Redis event consumer.
//!
//! Subscribes to the `change_batch_quantity` and `allocate` channels,
//! translates each message into an allocation command and hands it to the
//! message bus with a fresh unit of work. Messages are handled strictly one
//! at a time, in the order Redis delivered them.
//!
//! ```text
//! Redis ──SUBSCRIBE──> Subscription ──RawMessage──> Dispatcher
//!                                                      │ translate
//!                                                      v
//!                                    CommandBus::handle(command, new_uow())
//!                                                      │ commit
//!                                                      v
//!                                          PUBLISH line_allocated
//! ```

pub mod bus;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod translator;
pub mod transport;

#[cfg(test)]
mod tests;

pub use bus::CommandBus;
pub use channel::Channel;
pub use config::ConsumerConfig;
pub use dispatcher::{Dispatcher, FailurePolicy, Outcome};
pub use error::{ConsumerError, ConsumerResult};
pub use translator::{translate, MalformedMessage, Translation};
pub use transport::{
    InMemoryTransport, MessageKind, PubSubTransport, RawMessage, RedisTransport, Subscription,
    TransportHandle,
};
