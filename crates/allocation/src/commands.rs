//! Commands accepted by the message bus.

use chrono::NaiveDate;

/// Allocate an order line to the preferred batch for its sku.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocate {
    pub orderid: String,
    pub sku: String,
    pub qty: i64,
}

/// Register a new batch of stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBatch {
    pub reference: String,
    pub sku: String,
    pub qty: i64,
    /// `None` means the batch is already in the warehouse.
    pub eta: Option<NaiveDate>,
}

/// Change the purchased quantity of an existing batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatchQuantity {
    pub reference: String,
    pub qty: i64,
}

/// Every command the bus knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Allocate(Allocate),
    CreateBatch(CreateBatch),
    ChangeBatchQuantity(ChangeBatchQuantity),
}

impl Command {
    /// Stable name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Allocate(_) => "Allocate",
            Command::CreateBatch(_) => "CreateBatch",
            Command::ChangeBatchQuantity(_) => "ChangeBatchQuantity",
        }
    }
}

impl From<Allocate> for Command {
    fn from(command: Allocate) -> Self {
        Command::Allocate(command)
    }
}

impl From<CreateBatch> for Command {
    fn from(command: CreateBatch) -> Self {
        Command::CreateBatch(command)
    }
}

impl From<ChangeBatchQuantity> for Command {
    fn from(command: ChangeBatchQuantity) -> Self {
        Command::ChangeBatchQuantity(command)
    }
}
