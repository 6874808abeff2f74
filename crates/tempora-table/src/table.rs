//! The public table surface: mutation and range-query operations.
//!
//! A table is an append-mostly series of rows ordered by one designated key
//! field. Rows are stored as opaque values under order-preserving encoded
//! identifiers, bracketed by two virtual sentinel boundaries that are
//! computed from the table name and never stored. All range endpoints below
//! are encoded identifiers; the engine's range scan returns rows from the
//! low end of a range first, which is why the right-bounded queries need
//! the two-phase reverse-cursor algorithm in
//! [`Table::get_until`] / [`Table::get_until_last`].

use std::ops::Bound;

use redb::ReadableTable;
use tracing::debug;

use tempora_common::{EncodedId, Key, KeyError, Row};

use crate::codec;
use crate::error::{TemporaError, TemporaResult};
use crate::range::IdRange;
use crate::store::{RawReadTable, StoreHandle};

/// A named, single-key-field row collection.
///
/// Obtained from [`Connection::open_table`](crate::Connection::open_table).
/// The table holds no open transaction of its own; every operation opens
/// one transaction against the physical store the table is routed to.
///
/// # Example
///
/// ```no_run
/// use tempora_table::{Connection, Datum, DbConfig, Row};
///
/// # fn main() -> tempora_table::TemporaResult<()> {
/// let conn = Connection::open("./data/market.tempora", DbConfig::default())?;
/// let candles = conn.open_table("candles_1m", "ts");
///
/// let mut row = Row::new();
/// row.insert("ts".into(), Datum::Number(1_626_814_980.0));
/// row.insert("close".into(), Datum::Number(29_841.14));
/// candles.put(&[row])?;
///
/// let latest = candles.get_until_last(3)?;
/// assert_eq!(latest.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Table {
    name: String,
    key_field: String,
    store: StoreHandle,
    first_prev_id: EncodedId,
    last_next_id: EncodedId,
}

impl Table {
    pub(crate) fn new(name: String, key_field: String, store: StoreHandle) -> Self {
        let first_prev_id = codec::sentinel_low(&name);
        let last_next_id = codec::sentinel_high(&name);
        Self {
            name,
            key_field,
            store,
            first_prev_id,
            last_next_id,
        }
    }

    /// The table's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The designated key field.
    #[must_use]
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    // ==========================================================================
    // Mutations
    // ==========================================================================

    /// Writes `rows`, overwriting any existing row with the same key.
    ///
    /// The batch is best-effort: a row that fails to write does not stop the
    /// rest, the transaction still commits, and the call fails afterwards
    /// with [`TemporaError::Put`] carrying the failure count. A row with an
    /// invalid or missing key field fails the whole call before anything is
    /// written. Empty input returns without opening a transaction.
    pub fn put(&self, rows: &[Row]) -> TemporaResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut batch = Vec::with_capacity(rows.len());
        for row in rows {
            let key = self.key_from_row(row)?;
            batch.push((self.build_id(&key)?, encode_row(row)?));
        }

        let failed = self.store.with_write(|table| {
            let mut failed = 0usize;
            for (id, value) in &batch {
                if let Err(err) = table.insert(id.as_bytes(), value.as_slice()) {
                    debug!("row write failed: table: {}, error: {}", self.name, err);
                    failed += 1;
                }
            }
            Ok(failed)
        })?;

        if failed > 0 {
            return Err(TemporaError::Put { failed });
        }
        Ok(())
    }

    /// Deletes every row, leaving the table empty. Idempotent.
    pub fn clear(&self) -> TemporaResult<()> {
        self.delete_range(self.interior())
    }

    /// Deletes every row with key `>= start_key`.
    pub fn delete_since(&self, start_key: impl Into<Key>) -> TemporaResult<()> {
        let start = self.build_id(&start_key.into())?;
        self.delete_range(IdRange::since(start, self.last_next_id.clone()))
    }

    /// Deletes every row with key `<= end_key`.
    pub fn delete_until(&self, end_key: impl Into<Key>) -> TemporaResult<()> {
        let end = self.build_id(&end_key.into())?;
        self.delete_range(IdRange::until(self.first_prev_id.clone(), end))
    }

    /// Deletes every row with `start_key <= key <= end_key`.
    pub fn delete_between(
        &self,
        start_key: impl Into<Key>,
        end_key: impl Into<Key>,
    ) -> TemporaResult<()> {
        let start = self.build_id(&start_key.into())?;
        let end = self.build_id(&end_key.into())?;
        self.delete_range(IdRange::between(start, end))
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    /// Point lookup by key.
    pub fn get(&self, key: impl Into<Key>) -> TemporaResult<Option<Row>> {
        let id = self.build_id(&key.into())?;
        self.store.with_read(|table| {
            match table
                .get(id.as_bytes())
                .map_err(|e| query_error("get", e.into()))?
            {
                Some(value) => Ok(Some(decode_row(value.value())?)),
                None => Ok(None),
            }
        })
    }

    /// Every row, ascending, no limit.
    pub fn get_all(&self) -> TemporaResult<Vec<Row>> {
        self.collect_forward(self.interior(), None)
    }

    /// The first `limit` rows with key `>= start_key`, ascending.
    pub fn get_since(&self, start_key: impl Into<Key>, limit: usize) -> TemporaResult<Vec<Row>> {
        let start = self.build_id(&start_key.into())?;
        self.collect_forward(
            IdRange::since(start, self.last_next_id.clone()),
            Some(limit),
        )
    }

    /// The first `limit` rows of the table, ascending.
    pub fn get_since_first(&self, limit: usize) -> TemporaResult<Vec<Row>> {
        self.collect_forward(self.interior(), Some(limit))
    }

    /// The first `limit` rows with `start_key <= key <= end_key`, ascending.
    pub fn get_between(
        &self,
        start_key: impl Into<Key>,
        end_key: impl Into<Key>,
        limit: usize,
    ) -> TemporaResult<Vec<Row>> {
        let start = self.build_id(&start_key.into())?;
        let end = self.build_id(&end_key.into())?;
        self.collect_forward(IdRange::between(start, end), Some(limit))
    }

    /// The last `limit` rows with key `<= end_key`, ascending.
    pub fn get_until(&self, end_key: impl Into<Key>, limit: usize) -> TemporaResult<Vec<Row>> {
        let end = self.build_id(&end_key.into())?;
        self.collect_right_bounded(Bound::Included(end), limit)
    }

    /// The last `limit` rows of the table, ascending.
    pub fn get_until_last(&self, limit: usize) -> TemporaResult<Vec<Row>> {
        self.collect_right_bounded(Bound::Excluded(self.last_next_id.clone()), limit)
    }

    /// The row with the smallest key, if any.
    pub fn first_row(&self) -> TemporaResult<Option<Row>> {
        self.edge_row(true)
    }

    /// The row with the largest key, if any.
    pub fn last_row(&self) -> TemporaResult<Option<Row>> {
        self.edge_row(false)
    }

    /// Number of rows in the table.
    pub fn count(&self) -> TemporaResult<u64> {
        let range = self.interior();
        self.store.with_read(|table| {
            let iter = table
                .range::<&[u8]>(range.bounds())
                .map_err(|e| query_error("count", e.into()))?;
            let mut total = 0u64;
            for entry in iter {
                entry.map_err(|e| query_error("count", e.into()))?;
                total += 1;
            }
            Ok(total)
        })
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    /// The range holding every real row: `(sentinel_low, sentinel_high)`.
    fn interior(&self) -> IdRange {
        IdRange::interior(self.first_prev_id.clone(), self.last_next_id.clone())
    }

    fn build_id(&self, key: &Key) -> TemporaResult<EncodedId> {
        Ok(codec::encode_id(&self.name, key)?)
    }

    fn key_from_row(&self, row: &Row) -> TemporaResult<Key> {
        let datum = row.get(&self.key_field).ok_or(KeyError::MissingField {
            field: self.key_field.clone(),
        })?;
        Ok(Key::try_from(datum)?)
    }

    fn delete_range(&self, range: IdRange) -> TemporaResult<()> {
        if range.is_inverted() {
            return Ok(());
        }
        self.store.with_write(|table| {
            let doomed: Vec<Vec<u8>> = {
                let iter = table
                    .range::<&[u8]>(range.bounds())
                    .map_err(|e| query_error("delete range", e.into()))?;
                let mut keys = Vec::new();
                for entry in iter {
                    let (key, _) = entry.map_err(|e| query_error("delete range", e.into()))?;
                    keys.push(key.value().to_vec());
                }
                keys
            };
            for key in &doomed {
                table
                    .remove(key.as_slice())
                    .map_err(|e| query_error("delete range", e.into()))?;
            }
            Ok(())
        })
    }

    fn collect_forward(&self, range: IdRange, limit: Option<usize>) -> TemporaResult<Vec<Row>> {
        if limit == Some(0) || range.is_inverted() {
            return Ok(Vec::new());
        }
        self.store.with_read(|table| {
            let iter = table
                .range::<&[u8]>(range.bounds())
                .map_err(|e| query_error("range scan", e.into()))?;
            let mut rows = Vec::new();
            for entry in iter {
                let (_, value) = entry.map_err(|e| query_error("range scan", e.into()))?;
                rows.push(decode_row(value.value())?);
                if Some(rows.len()) == limit {
                    break;
                }
            }
            Ok(rows)
        })
    }

    /// The two-phase right-bounded query.
    ///
    /// The engine's bulk range read is start-anchored — it returns the first
    /// `limit` entries of a range, never the last. To return the last
    /// `limit` rows up to `upper` in ascending order:
    ///
    /// 1. walk a reverse cursor over `(sentinel_low, upper]`; the first hit
    ///    fixes the upper edge actually present (`last_id`);
    /// 2. skip `limit - 1` entries further toward the low end without
    ///    materializing values; the entry the cursor settles on is the
    ///    inclusive lower bound — or, if the cursor runs out, the lower
    ///    bound falls back to the exclusive low sentinel;
    /// 3. re-issue one forward bulk scan over the bounds found, which
    ///    yields the final rows already ascending at full throughput.
    fn collect_right_bounded(
        &self,
        upper: Bound<EncodedId>,
        limit: usize,
    ) -> TemporaResult<Vec<Row>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.with_read(|table| {
            let upper_bound = match &upper {
                Bound::Included(id) => Bound::Included(id.as_bytes()),
                Bound::Excluded(id) => Bound::Excluded(id.as_bytes()),
                Bound::Unbounded => Bound::Unbounded,
            };
            let mut cursor = table
                .range::<&[u8]>((Bound::Excluded(self.first_prev_id.as_bytes()), upper_bound))
                .map_err(|e| query_error("open reverse cursor", e.into()))?;

            let Some(first) = cursor.next_back() else {
                // No matching rows at all.
                return Ok(Vec::new());
            };
            let (first_key, first_value) =
                first.map_err(|e| query_error("reverse cursor", e.into()))?;
            if limit == 1 {
                return Ok(vec![decode_row(first_value.value())?]);
            }
            let last_id = first_key.value().to_vec();

            let mut lower: Option<Vec<u8>> = None;
            for _ in 0..limit - 1 {
                match cursor.next_back() {
                    Some(entry) => {
                        let (key, _) = entry.map_err(|e| query_error("reverse cursor", e.into()))?;
                        lower = Some(key.value().to_vec());
                    }
                    None => {
                        // Fewer than `limit` rows exist; fall back to the
                        // low sentinel.
                        lower = None;
                        break;
                    }
                }
            }

            let start = match &lower {
                Some(key) => Bound::Included(key.as_slice()),
                None => Bound::Excluded(self.first_prev_id.as_bytes()),
            };
            let iter = table
                .range::<&[u8]>((start, Bound::Included(last_id.as_slice())))
                .map_err(|e| query_error("forward scan", e.into()))?;
            let mut rows = Vec::with_capacity(limit);
            for entry in iter.take(limit) {
                let (_, value) = entry.map_err(|e| query_error("forward scan", e.into()))?;
                rows.push(decode_row(value.value())?);
            }
            Ok(rows)
        })
    }

    fn edge_row(&self, forward: bool) -> TemporaResult<Option<Row>> {
        let range = self.interior();
        self.store.with_read(|table: &RawReadTable| {
            let mut iter = table
                .range::<&[u8]>(range.bounds())
                .map_err(|e| query_error("open cursor", e.into()))?;
            let entry = if forward { iter.next() } else { iter.next_back() };
            match entry {
                Some(entry) => {
                    let (_, value) = entry.map_err(|e| query_error("cursor", e.into()))?;
                    Ok(Some(decode_row(value.value())?))
                }
                None => Ok(None),
            }
        })
    }
}

fn query_error(op: &'static str, source: redb::Error) -> TemporaError {
    TemporaError::Query { op, source }
}

fn encode_row(row: &Row) -> TemporaResult<Vec<u8>> {
    bincode::serialize(row).map_err(|e| TemporaError::Internal {
        message: format!("row encode failed: {e}"),
    })
}

fn decode_row(bytes: &[u8]) -> TemporaResult<Row> {
    bincode::deserialize(bytes).map_err(|e| TemporaError::Corrupted {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use tempora_common::{Datum, DbConfig};

    fn row(ts: f64) -> Row {
        let mut row = Row::new();
        row.insert("ts".to_string(), Datum::Number(ts));
        row.insert("vol".to_string(), Datum::Number(1.108_220_020_382_135_7));
        row
    }

    fn open_table(dir: &tempfile::TempDir) -> (Connection, Table) {
        let conn = Connection::open(dir.path().join("t.tempora"), DbConfig::for_testing()).unwrap();
        let table = conn.open_table("candles", "ts");
        (conn, table)
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);

        table.put(&[row(60.0), row(120.0)]).unwrap();
        assert_eq!(table.get(60.0).unwrap(), Some(row(60.0)));
        assert_eq!(table.get(90.0).unwrap(), None);
        conn.close();
    }

    #[test]
    fn test_put_overwrites_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);

        let mut newer = row(60.0);
        newer.insert("vol".to_string(), Datum::Number(2.0));
        table.put(&[row(60.0)]).unwrap();
        table.put(&[newer.clone()]).unwrap();

        assert_eq!(table.count().unwrap(), 1);
        assert_eq!(table.get(60.0).unwrap(), Some(newer));
        conn.close();
    }

    #[test]
    fn test_put_rejects_missing_key_field() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);

        let mut bad = Row::new();
        bad.insert("close".to_string(), Datum::Number(1.0));
        let err = table.put(&[bad]).unwrap_err();
        assert!(matches!(
            err,
            TemporaError::Key {
                source: KeyError::MissingField { .. }
            }
        ));
        // Nothing was written.
        assert_eq!(table.count().unwrap(), 0);
        conn.close();
    }

    #[test]
    fn test_put_rejects_nan_key() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);

        let err = table.put(&[row(f64::NAN)]).unwrap_err();
        assert!(matches!(
            err,
            TemporaError::Key {
                source: KeyError::NanKey
            }
        ));
        conn.close();
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);

        table.put(&[row(60.0), row(120.0), row(180.0)]).unwrap();
        table.clear().unwrap();
        assert_eq!(table.count().unwrap(), 0);
        table.clear().unwrap();
        assert_eq!(table.count().unwrap(), 0);
        assert!(table.get_all().unwrap().is_empty());
        conn.close();
    }

    #[test]
    fn test_right_bounded_limits() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);
        table
            .put(&[row(60.0), row(120.0), row(180.0), row(240.0)])
            .unwrap();

        // limit == 0 never scans.
        assert!(table.get_until(240.0, 0).unwrap().is_empty());
        // limit == 1 short-circuits on the first reverse hit.
        assert_eq!(table.get_until(240.0, 1).unwrap(), vec![row(240.0)]);
        // limit beyond the row count returns everything, ascending.
        assert_eq!(
            table.get_until_last(10).unwrap(),
            vec![row(60.0), row(120.0), row(180.0), row(240.0)]
        );
        // No matching rows at all.
        assert!(table.get_until(30.0, 3).unwrap().is_empty());
        conn.close();
    }

    #[test]
    fn test_first_and_last_row_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let (conn, table) = open_table(&dir);

        assert_eq!(table.first_row().unwrap(), None);
        assert_eq!(table.last_row().unwrap(), None);
        conn.close();
    }
}
