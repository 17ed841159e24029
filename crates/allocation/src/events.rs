//! Domain events recorded by the `Product` aggregate.

use serde::{Deserialize, Serialize};

/// An order line was allocated to a batch.
///
/// Serialized as the `line_allocated` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocated {
    pub orderid: String,
    pub sku: String,
    pub qty: i64,
    pub batchref: String,
}

/// An order line was released from its batch and needs a new home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deallocated {
    pub orderid: String,
    pub sku: String,
    pub qty: i64,
}

/// No batch could take an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfStock {
    pub sku: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Allocated(Allocated),
    Deallocated(Deallocated),
    OutOfStock(OutOfStock),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Allocated(_) => "Allocated",
            Event::Deallocated(_) => "Deallocated",
            Event::OutOfStock(_) => "OutOfStock",
        }
    }
}
