//! SQLite-backed unit of work.
//!
//! Each unit of work owns its own connection and holds an immediate
//! transaction from construction until `commit`, `rollback` or drop.

use super::{ProductRepository, Seen, UnitOfWork};
use crate::events::Event;
use crate::model::{Batch, OrderLine, Product};
use crate::{AllocationError, AllocationResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const ETA_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteUnitOfWork {
    conn: Connection,
    seen: Seen,
    open: bool,
}

impl SqliteUnitOfWork {
    /// Open a connection to the database at `path` and begin a transaction.
    ///
    /// The schema must already exist (see [`crate::init_schema_at`]).
    pub fn begin(path: &Path) -> AllocationResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::begin_on(conn)
    }

    /// Begin a transaction on an already opened connection.
    pub fn begin_on(conn: Connection) -> AllocationResult<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self {
            conn,
            seen: Seen::default(),
            open: true,
        })
    }

    fn ensure_open(&self) -> AllocationResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(AllocationError::Closed)
        }
    }

    fn load(&self, sku: &str) -> AllocationResult<Option<Product>> {
        let version: Option<i64> = self
            .conn
            .query_row(
                "SELECT version_number FROM products WHERE sku = ?1",
                params![sku],
                |row| row.get(0),
            )
            .optional()?;

        let Some(version) = version else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT reference, purchased_quantity, eta FROM batches WHERE sku = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![sku], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut batches = Vec::with_capacity(rows.len());
        for (reference, purchased_quantity, eta) in rows {
            let eta = eta.map(|s| parse_eta(&s)).transpose()?;
            let mut batch = Batch::new(reference, sku, purchased_quantity, eta);
            for line in self.load_allocations(&batch.reference)? {
                batch.restore_allocation(line);
            }
            batches.push(batch);
        }

        Ok(Some(Product::with_version(sku, batches, version)))
    }

    fn load_allocations(&self, reference: &str) -> AllocationResult<Vec<OrderLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT orderid, sku, qty FROM allocations WHERE batch_reference = ?1 ORDER BY id",
        )?;
        let lines = stmt
            .query_map(params![reference], |row| {
                Ok(OrderLine {
                    orderid: row.get(0)?,
                    sku: row.get(1)?,
                    qty: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    fn sku_for_batch(&self, reference: &str) -> AllocationResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT sku FROM batches WHERE reference = ?1",
                params![reference],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn write_product(&self, product: &Product, loaded_version: Option<i64>) -> AllocationResult<()> {
        match loaded_version {
            None => {
                self.conn.execute(
                    "INSERT INTO products (sku, version_number) VALUES (?1, ?2)",
                    params![product.sku, product.version_number],
                )?;
            }
            Some(expected) => {
                let updated = self.conn.execute(
                    "UPDATE products SET version_number = ?1 WHERE sku = ?2 AND version_number = ?3",
                    params![product.version_number, product.sku, expected],
                )?;
                if updated == 0 {
                    return Err(AllocationError::ConcurrentModification {
                        sku: product.sku.clone(),
                        expected,
                    });
                }
            }
        }

        for batch in &product.batches {
            self.conn.execute(
                "INSERT INTO batches (reference, sku, purchased_quantity, eta)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(reference) DO UPDATE SET
                     purchased_quantity = excluded.purchased_quantity,
                     eta = excluded.eta",
                params![
                    batch.reference,
                    batch.sku,
                    batch.purchased_quantity(),
                    batch.eta.map(|eta| eta.format(ETA_FORMAT).to_string()),
                ],
            )?;

            self.conn.execute(
                "DELETE FROM allocations WHERE batch_reference = ?1",
                params![batch.reference],
            )?;
            for line in batch.allocations() {
                self.conn.execute(
                    "INSERT INTO allocations (batch_reference, orderid, sku, qty)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![batch.reference, line.orderid, line.sku, line.qty],
                )?;
            }
        }

        Ok(())
    }
}

fn parse_eta(value: &str) -> AllocationResult<NaiveDate> {
    NaiveDate::parse_from_str(value, ETA_FORMAT)
        .map_err(|e| AllocationError::InvalidData(format!("eta {value:?}: {e}")))
}

impl ProductRepository for SqliteUnitOfWork {
    fn add(&mut self, product: Product) {
        self.seen.insert_new(product);
    }

    fn get(&mut self, sku: &str) -> AllocationResult<Option<&mut Product>> {
        self.ensure_open()?;
        if !self.seen.contains(sku) {
            match self.load(sku)? {
                Some(product) => self.seen.insert_loaded(product),
                None => return Ok(None),
            }
        }
        Ok(self.seen.get_mut(sku))
    }

    fn get_by_batchref(&mut self, reference: &str) -> AllocationResult<Option<&mut Product>> {
        self.ensure_open()?;
        let sku = match self.seen.sku_for_batch(reference) {
            Some(sku) => Some(sku),
            None => self.sku_for_batch(reference)?,
        };

        match sku {
            Some(sku) => self.get(&sku),
            None => Ok(None),
        }
    }
}

impl UnitOfWork for SqliteUnitOfWork {
    fn products(&mut self) -> &mut dyn ProductRepository {
        self
    }

    fn commit(&mut self) -> AllocationResult<()> {
        self.ensure_open()?;
        for tracked in self.seen.tracked() {
            self.write_product(&tracked.product, tracked.loaded_version)?;
        }
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        debug!("SQLite unit of work committed");
        Ok(())
    }

    fn rollback(&mut self) -> AllocationResult<()> {
        self.seen.clear();
        if self.open {
            self.open = false;
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn collect_new_events(&mut self) -> Vec<Event> {
        self.seen.take_events()
    }
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Failed to roll back SQLite unit of work");
            }
        }
    }
}
