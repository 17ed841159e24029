//! Command and event handlers.

use crate::commands::{Allocate, ChangeBatchQuantity, CreateBatch};
use crate::events::{Allocated, Deallocated, OutOfStock};
use crate::model::{Batch, OrderLine, Product};
use crate::unit_of_work::UnitOfWork;
use crate::{AllocationError, AllocationResult};
use tracing::{info, warn};

/// Channel on which allocations are announced.
pub const LINE_ALLOCATED_CHANNEL: &str = "line_allocated";

/// An event payload staged for publication after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub channel: &'static str,
    pub payload: String,
}

pub fn add_batch(command: CreateBatch, uow: &mut dyn UnitOfWork) -> AllocationResult<()> {
    let batch = Batch::new(command.reference, command.sku.clone(), command.qty, command.eta);
    let products = uow.products();
    match products.get(&command.sku)? {
        Some(product) => product.batches.push(batch),
        None => products.add(Product::new(command.sku, vec![batch])),
    }
    Ok(())
}

/// Returns the chosen batch reference, or `None` when out of stock.
pub fn allocate(command: Allocate, uow: &mut dyn UnitOfWork) -> AllocationResult<Option<String>> {
    let line = OrderLine {
        orderid: command.orderid,
        sku: command.sku,
        qty: command.qty,
    };
    let product = uow
        .products()
        .get(&line.sku)?
        .ok_or_else(|| AllocationError::InvalidSku(line.sku.clone()))?;
    Ok(product.allocate(line))
}

pub fn change_batch_quantity(
    command: ChangeBatchQuantity,
    uow: &mut dyn UnitOfWork,
) -> AllocationResult<()> {
    let product = uow
        .products()
        .get_by_batchref(&command.reference)?
        .ok_or_else(|| AllocationError::InvalidSku(command.reference.clone()))?;
    product.change_batch_quantity(&command.reference, command.qty)
}

pub fn reallocate(event: &Deallocated, uow: &mut dyn UnitOfWork) -> AllocationResult<()> {
    allocate(
        Allocate {
            orderid: event.orderid.clone(),
            sku: event.sku.clone(),
            qty: event.qty,
        },
        uow,
    )
    .map(|_| ())
}

pub fn publish_allocated_event(event: &Allocated) -> AllocationResult<Outbound> {
    Ok(Outbound {
        channel: LINE_ALLOCATED_CHANNEL,
        payload: serde_json::to_string(event)?,
    })
}

pub fn log_out_of_stock(event: &OutOfStock) {
    warn!(sku = %event.sku, "Out of stock");
}

pub(crate) fn log_allocated(event: &Allocated) {
    info!(
        orderid = %event.orderid,
        sku = %event.sku,
        batchref = %event.batchref,
        "Line allocated"
    );
}
