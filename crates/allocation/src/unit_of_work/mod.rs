//! Unit of work: one transactional boundary around a command.
//!
//! A unit of work hands out a product repository that tracks every product
//! it loads or adds. Nothing reaches the backing store until `commit`;
//! dropping an uncommitted unit of work discards its changes.

mod memory;
mod sqlite;

pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use sqlite::SqliteUnitOfWork;

use crate::events::Event;
use crate::model::Product;
use crate::AllocationResult;
use std::collections::BTreeMap;

/// Access to `Product` aggregates inside a unit of work.
pub trait ProductRepository {
    /// Track a new product. It is written on commit.
    fn add(&mut self, product: Product);

    /// Load the product for `sku`.
    fn get(&mut self, sku: &str) -> AllocationResult<Option<&mut Product>>;

    /// Load the product owning the batch `reference`.
    fn get_by_batchref(&mut self, reference: &str) -> AllocationResult<Option<&mut Product>>;
}

/// A transactional boundary for one command.
pub trait UnitOfWork: Send {
    fn products(&mut self) -> &mut dyn ProductRepository;

    fn commit(&mut self) -> AllocationResult<()>;

    fn rollback(&mut self) -> AllocationResult<()>;

    /// Drain events recorded on every product this unit of work has seen.
    fn collect_new_events(&mut self) -> Vec<Event>;
}

/// A product loaded into a unit of work, with the version it was loaded at.
/// `loaded_version` is `None` for products added in this unit of work.
#[derive(Debug, Clone)]
pub(crate) struct Tracked {
    pub product: Product,
    pub loaded_version: Option<i64>,
}

/// Products seen by one unit of work, keyed by sku.
#[derive(Debug, Default)]
pub(crate) struct Seen {
    products: BTreeMap<String, Tracked>,
}

impl Seen {
    pub fn contains(&self, sku: &str) -> bool {
        self.products.contains_key(sku)
    }

    pub fn insert_loaded(&mut self, product: Product) {
        let loaded_version = Some(product.version_number);
        self.products.insert(
            product.sku.clone(),
            Tracked {
                product,
                loaded_version,
            },
        );
    }

    pub fn insert_new(&mut self, product: Product) {
        self.products.insert(
            product.sku.clone(),
            Tracked {
                product,
                loaded_version: None,
            },
        );
    }

    pub fn get_mut(&mut self, sku: &str) -> Option<&mut Product> {
        self.products.get_mut(sku).map(|tracked| &mut tracked.product)
    }

    pub fn sku_for_batch(&self, reference: &str) -> Option<String> {
        self.products
            .values()
            .find(|tracked| tracked.product.has_batch(reference))
            .map(|tracked| tracked.product.sku.clone())
    }

    pub fn tracked(&self) -> impl Iterator<Item = &Tracked> {
        self.products.values()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.products
            .values_mut()
            .flat_map(|tracked| tracked.product.take_events())
            .collect()
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }
}
