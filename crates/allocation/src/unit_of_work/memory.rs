//! In-memory unit of work over a shared product store.

use super::{ProductRepository, Seen, UnitOfWork};
use crate::events::Event;
use crate::model::Product;
use crate::{AllocationError, AllocationResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Committed products shared by every in-memory unit of work.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    products: Arc<Mutex<BTreeMap<String, Product>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the committed product for `sku`.
    pub fn get(&self, sku: &str) -> Option<Product> {
        self.products.lock().get(sku).cloned()
    }

    pub fn len(&self) -> usize {
        self.products.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.lock().is_empty()
    }

    fn sku_for_batch(&self, reference: &str) -> Option<String> {
        self.products
            .lock()
            .values()
            .find(|product| product.has_batch(reference))
            .map(|product| product.sku.clone())
    }
}

/// Unit of work whose commit copies working products into an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    store: InMemoryStore,
    seen: Seen,
    committed: bool,
}

impl InMemoryUnitOfWork {
    pub fn new(store: InMemoryStore) -> Self {
        Self {
            store,
            seen: Seen::default(),
            committed: false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

impl ProductRepository for InMemoryUnitOfWork {
    fn add(&mut self, product: Product) {
        self.seen.insert_new(product);
    }

    fn get(&mut self, sku: &str) -> AllocationResult<Option<&mut Product>> {
        if !self.seen.contains(sku) {
            match self.store.get(sku) {
                Some(product) => self.seen.insert_loaded(product),
                None => return Ok(None),
            }
        }
        Ok(self.seen.get_mut(sku))
    }

    fn get_by_batchref(&mut self, reference: &str) -> AllocationResult<Option<&mut Product>> {
        let sku = self
            .seen
            .sku_for_batch(reference)
            .or_else(|| self.store.sku_for_batch(reference));

        match sku {
            Some(sku) => self.get(&sku),
            None => Ok(None),
        }
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn products(&mut self) -> &mut dyn ProductRepository {
        self
    }

    fn commit(&mut self) -> AllocationResult<()> {
        let mut products = self.store.products.lock();

        for tracked in self.seen.tracked() {
            let stored_version = products.get(&tracked.product.sku).map(|p| p.version_number);
            if let (Some(loaded), Some(stored)) = (tracked.loaded_version, stored_version) {
                if stored != loaded {
                    return Err(AllocationError::ConcurrentModification {
                        sku: tracked.product.sku.clone(),
                        expected: loaded,
                    });
                }
            }
        }

        for tracked in self.seen.tracked() {
            let mut product = tracked.product.clone();
            product.take_events();
            products.insert(product.sku.clone(), product);
        }

        self.committed = true;
        debug!(products = products.len(), "In-memory unit of work committed");
        Ok(())
    }

    fn rollback(&mut self) -> AllocationResult<()> {
        self.seen.clear();
        Ok(())
    }

    fn collect_new_events(&mut self) -> Vec<Event> {
        self.seen.take_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Batch, OrderLine};

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut uow = InMemoryUnitOfWork::new(store.clone());
        uow.products()
            .add(Product::new("LAMP", vec![Batch::new("b1", "LAMP", 10, None)]));
        uow.commit().unwrap();
        store
    }

    #[test]
    fn committed_products_are_visible_to_later_units() {
        let store = seeded_store();

        let mut uow = InMemoryUnitOfWork::new(store.clone());
        let product = uow.products().get("LAMP").unwrap().unwrap();
        assert_eq!(product.batches.len(), 1);
    }

    #[test]
    fn uncommitted_work_is_discarded_on_drop() {
        let store = seeded_store();

        {
            let mut uow = InMemoryUnitOfWork::new(store.clone());
            let product = uow.products().get("LAMP").unwrap().unwrap();
            product.allocate(OrderLine {
                orderid: "o1".to_string(),
                sku: "LAMP".to_string(),
                qty: 3,
            });
        }

        let stored = store.get("LAMP").unwrap();
        assert_eq!(stored.batch("b1").unwrap().available_quantity(), 10);
        assert_eq!(stored.version_number, 0);
    }

    #[test]
    fn rollback_discards_changes() {
        let store = seeded_store();

        let mut uow = InMemoryUnitOfWork::new(store.clone());
        uow.products()
            .add(Product::new("CHAIR", vec![Batch::new("c1", "CHAIR", 1, None)]));
        uow.rollback().unwrap();
        uow.commit().unwrap();

        assert!(store.get("CHAIR").is_none());
    }

    #[test]
    fn finds_product_by_batch_reference() {
        let store = seeded_store();

        let mut uow = InMemoryUnitOfWork::new(store);
        let product = uow.products().get_by_batchref("b1").unwrap().unwrap();
        assert_eq!(product.sku, "LAMP");
        assert!(uow.products().get_by_batchref("missing").unwrap().is_none());
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = seeded_store();
        let line = OrderLine {
            orderid: "o1".to_string(),
            sku: "LAMP".to_string(),
            qty: 1,
        };

        let mut first = InMemoryUnitOfWork::new(store.clone());
        let mut second = InMemoryUnitOfWork::new(store.clone());
        first.products().get("LAMP").unwrap().unwrap().allocate(line.clone());
        second.products().get("LAMP").unwrap().unwrap().allocate(line);

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, AllocationError::ConcurrentModification { expected: 0, .. }));
    }

    #[test]
    fn collects_events_from_seen_products() {
        let store = seeded_store();

        let mut uow = InMemoryUnitOfWork::new(store);
        uow.products().get("LAMP").unwrap().unwrap().allocate(OrderLine {
            orderid: "o1".to_string(),
            sku: "LAMP".to_string(),
            qty: 1,
        });

        assert_eq!(uow.collect_new_events().len(), 1);
        assert!(uow.collect_new_events().is_empty());
    }
}
