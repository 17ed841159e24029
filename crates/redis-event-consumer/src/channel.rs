//! Channel binding table.
//!
//! Every subscribed channel is a [`Channel`] variant, and every variant maps
//! to exactly one command constructor through an exhaustive `match`. Adding
//! a channel without a binding does not compile.

use allocation::{Allocate, ChangeBatchQuantity, Command};
use serde::Deserialize;
use std::fmt;

/// A channel the consumer subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    ChangeBatchQuantity,
    Allocate,
}

/// `change_batch_quantity` payload.
#[derive(Debug, Deserialize)]
struct ChangeBatchQuantityPayload {
    batchref: String,
    qty: i64,
}

/// `allocate` payload.
#[derive(Debug, Deserialize)]
struct AllocatePayload {
    orderid: String,
    sku: String,
    qty: i64,
}

impl Channel {
    /// The fixed subscription set, in subscription order.
    pub const ALL: [Channel; 2] = [Channel::ChangeBatchQuantity, Channel::Allocate];

    /// Wire name of the channel.
    pub fn name(self) -> &'static str {
        match self {
            Channel::ChangeBatchQuantity => "change_batch_quantity",
            Channel::Allocate => "allocate",
        }
    }

    /// Exact-match lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }

    /// Build this channel's command from a JSON payload.
    ///
    /// Only field presence and type are checked.
    pub fn bind(self, payload: &[u8]) -> Result<Command, serde_json::Error> {
        match self {
            Channel::ChangeBatchQuantity => {
                let p: ChangeBatchQuantityPayload = serde_json::from_slice(payload)?;
                Ok(Command::ChangeBatchQuantity(ChangeBatchQuantity {
                    reference: p.batchref,
                    qty: p.qty,
                }))
            }
            Channel::Allocate => {
                let p: AllocatePayload = serde_json::from_slice(payload)?;
                Ok(Command::Allocate(Allocate {
                    orderid: p.orderid,
                    sku: p.sku,
                    qty: p.qty,
                }))
            }
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
