//! Allocation domain model.
//!
//! `Product` is the aggregate: every change to a sku's batches goes through
//! it, and it records the domain events those changes produce.

use crate::events::{Allocated, Deallocated, Event, OutOfStock};
use crate::AllocationError;
use chrono::NaiveDate;

/// A customer's request for `qty` units of `sku`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderLine {
    pub orderid: String,
    pub sku: String,
    pub qty: i64,
}

/// A quantity of stock for one sku, either in the warehouse (`eta` is
/// `None`) or arriving on a known date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub reference: String,
    pub sku: String,
    pub eta: Option<NaiveDate>,
    purchased_quantity: i64,
    allocations: Vec<OrderLine>,
}

impl Batch {
    pub fn new(
        reference: impl Into<String>,
        sku: impl Into<String>,
        qty: i64,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            eta,
            purchased_quantity: qty,
            allocations: Vec::new(),
        }
    }

    pub fn purchased_quantity(&self) -> i64 {
        self.purchased_quantity
    }

    pub fn allocations(&self) -> &[OrderLine] {
        &self.allocations
    }

    pub fn allocated_quantity(&self) -> i64 {
        self.allocations.iter().map(|line| line.qty).sum()
    }

    pub fn available_quantity(&self) -> i64 {
        self.purchased_quantity - self.allocated_quantity()
    }

    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == line.sku && self.available_quantity() >= line.qty
    }

    /// Allocate `line` if there is room. Allocating the same line twice is a no-op.
    pub fn allocate(&mut self, line: OrderLine) {
        if self.can_allocate(&line) && !self.allocations.contains(&line) {
            self.allocations.push(line);
        }
    }

    pub fn deallocate(&mut self, line: &OrderLine) {
        self.allocations.retain(|allocated| allocated != line);
    }

    /// Release the most recently allocated line.
    pub fn deallocate_one(&mut self) -> Option<OrderLine> {
        self.allocations.pop()
    }

    pub(crate) fn restore_allocation(&mut self, line: OrderLine) {
        self.allocations.push(line);
    }
}

/// Aggregate root over every batch of one sku.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub sku: String,
    pub batches: Vec<Batch>,
    pub version_number: i64,
    events: Vec<Event>,
}

impl Product {
    pub fn new(sku: impl Into<String>, batches: Vec<Batch>) -> Self {
        Self::with_version(sku, batches, 0)
    }

    pub fn with_version(sku: impl Into<String>, batches: Vec<Batch>, version_number: i64) -> Self {
        Self {
            sku: sku.into(),
            batches,
            version_number,
            events: Vec::new(),
        }
    }

    /// Allocate `line` to the preferred batch and return its reference.
    ///
    /// Warehouse stock is preferred over shipments, then the earliest eta
    /// wins. Records `Allocated` on success and `OutOfStock` when no batch
    /// can take the line.
    pub fn allocate(&mut self, line: OrderLine) -> Option<String> {
        let chosen = self
            .batches
            .iter_mut()
            .filter(|batch| batch.can_allocate(&line))
            .min_by_key(|batch| batch.eta);

        let Some(batch) = chosen else {
            self.events.push(Event::OutOfStock(OutOfStock {
                sku: line.sku.clone(),
            }));
            return None;
        };

        let batchref = batch.reference.clone();
        self.events.push(Event::Allocated(Allocated {
            orderid: line.orderid.clone(),
            sku: line.sku.clone(),
            qty: line.qty,
            batchref: batchref.clone(),
        }));
        batch.allocate(line);
        self.version_number += 1;
        Some(batchref)
    }

    /// Set a batch's purchased quantity, releasing allocations until the
    /// batch is no longer oversold. Each released line records `Deallocated`.
    pub fn change_batch_quantity(&mut self, reference: &str, qty: i64) -> Result<(), AllocationError> {
        let batch = self
            .batches
            .iter_mut()
            .find(|batch| batch.reference == reference)
            .ok_or_else(|| AllocationError::InvalidSku(reference.to_string()))?;

        batch.purchased_quantity = qty;
        while batch.available_quantity() < 0 {
            let Some(line) = batch.deallocate_one() else {
                break;
            };
            self.events.push(Event::Deallocated(Deallocated {
                orderid: line.orderid,
                sku: line.sku,
                qty: line.qty,
            }));
        }
        Ok(())
    }

    pub fn has_batch(&self, reference: &str) -> bool {
        self.batches.iter().any(|batch| batch.reference == reference)
    }

    pub fn batch(&self, reference: &str) -> Option<&Batch> {
        self.batches.iter().find(|batch| batch.reference == reference)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
