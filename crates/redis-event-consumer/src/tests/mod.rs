//! Integration tests for the event consumer.
//!
//! - `harness.rs`       - In-memory transport, recording bus and the consumer under test
//! - `transport.rs`     - Subscription setup and connection loss
//! - `routing.rs`       - Channel binding and unbound channels
//! - `ordering.rs`      - Strict arrival order, one unit of work at a time
//! - `failure_policy.rs` - Malformed messages and handler failures under each policy
//! - `scenarios.rs`     - End to end allocation through the message bus

mod ordering;
mod routing;
