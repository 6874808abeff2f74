//! Transaction scope over one physical store.
//!
//! A [`StoreHandle`] binds a table to its routed physical store and opens
//! one engine transaction per operation. Write transactions use relaxed
//! durability by default: acknowledgements may precede the flush, which is
//! acceptable for time-series rows that are re-derivable from their source.
//! Every native failure propagates as exactly one error per call;
//! connection-class failures are additionally reported to the connection so
//! the reopen task can take over.

use redb::{Durability, ReadOnlyTable, TableDefinition};

use crate::connection::Connection;
use crate::error::{TemporaError, TemporaResult};

/// Raw byte-keyed store table, the only shape the table layer reads/writes.
pub(crate) type RawReadTable = ReadOnlyTable<&'static [u8], &'static [u8]>;
pub(crate) type RawWriteTable<'txn> = redb::Table<'txn, &'static [u8], &'static [u8]>;

pub(crate) struct StoreHandle {
    name: String,
    conn: Connection,
}

impl StoreHandle {
    pub fn new(conn: Connection, name: String) -> Self {
        Self { name, conn }
    }

    /// Runs `body` inside one readonly transaction against this store.
    pub fn with_read<T, F>(&self, body: F) -> TemporaResult<T>
    where
        F: FnOnce(&RawReadTable) -> TemporaResult<T>,
    {
        let db = self.conn.database()?;
        let result = (|| {
            let txn = db
                .begin_read()
                .map_err(|e| transaction_error(e.into()))?;
            let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&self.name);
            let table = txn
                .open_table(def)
                .map_err(|e| transaction_error(e.into()))?;
            body(&table)
        })();
        self.observe(&result);
        result
    }

    /// Runs `body` inside one readwrite transaction against this store and
    /// commits it.
    pub fn with_write<T, F>(&self, body: F) -> TemporaResult<T>
    where
        F: for<'txn> FnOnce(&mut RawWriteTable<'txn>) -> TemporaResult<T>,
    {
        let db = self.conn.database()?;
        let result = (|| {
            let mut txn = db
                .begin_write()
                .map_err(|e| transaction_error(e.into()))?;
            txn.set_durability(if self.conn.relaxed_durability() {
                Durability::Eventual
            } else {
                Durability::Immediate
            });
            let out = {
                let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&self.name);
                let mut table = txn
                    .open_table(def)
                    .map_err(|e| transaction_error(e.into()))?;
                body(&mut table)?
            };
            txn.commit().map_err(|e| transaction_error(e.into()))?;
            Ok(out)
        })();
        self.observe(&result);
        result
    }

    /// Feeds connection-class failures back to the connection.
    fn observe<T>(&self, result: &TemporaResult<T>) {
        if let Err(err) = result {
            if let Some(source) = err.engine_source() {
                self.conn.notify_failure(source);
            }
        }
    }
}

fn transaction_error(source: redb::Error) -> TemporaError {
    TemporaError::Transaction { source }
}
