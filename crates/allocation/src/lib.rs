//! Order allocation: domain model, unit of work and message bus.
//!
//! Commands enter through [`MessageBus::handle`] together with a fresh
//! [`UnitOfWork`]. The bus runs the command handler, then every event the
//! command caused, commits once, and finally publishes the outbound events
//! (`line_allocated`) through an [`EventPublisher`].
//!
//! ```text
//! Command -> MessageBus -> handlers -> Product (aggregate)
//!                 |                        |
//!                 |<------- events --------|
//!                 v
//!           commit, then publish
//! ```

pub mod commands;
pub mod error;
pub mod events;
pub mod handlers;
pub mod messagebus;
pub mod model;
pub mod publisher;
pub mod schema;
pub mod unit_of_work;

pub use commands::{Allocate, ChangeBatchQuantity, Command, CreateBatch};
pub use error::{AllocationError, AllocationResult};
pub use events::{Allocated, Deallocated, Event, OutOfStock};
pub use handlers::LINE_ALLOCATED_CHANNEL;
pub use messagebus::MessageBus;
pub use model::{Batch, OrderLine, Product};
pub use publisher::{
    EventPublisher, FailingPublisher, InMemoryPublisher, PublishedMessage, RedisPublisher,
};
pub use schema::{init_schema, init_schema_at};
pub use unit_of_work::{
    InMemoryStore, InMemoryUnitOfWork, ProductRepository, SqliteUnitOfWork, UnitOfWork,
};
