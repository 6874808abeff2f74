//! Connection lifecycle: open, close, destroy, and recovery from lost
//! engine connections.
//!
//! A `Connection` is process-wide shared state owning one engine database.
//! All `store_count` physical stores are created in a single schema
//! transaction on first open and never resized afterward. When an operation
//! fails with a connection-class engine error, the connection drops its
//! handle and a background task reopens it after a fixed delay, retrying
//! until it succeeds or the connection is explicitly closed. Callers that
//! arrive while the handle is down block until it is live again, so
//! transient disconnects are invisible to new operations; only the
//! operation in flight at the moment of failure observes an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::{Condvar, Mutex};
use redb::{Database, DatabaseError, ReadableTable, TableDefinition};
use tracing::{error, info, warn};

use tempora_common::constants::{META_KEY_STORE_COUNT, META_STORE_NAME};
use tempora_common::DbConfig;

use crate::error::{connection_lost, loss_reason, TemporaError, TemporaResult};
use crate::router;
use crate::store::StoreHandle;
use crate::table::Table;

const META: TableDefinition<&str, u64> = TableDefinition::new(META_STORE_NAME);

/// A handle to one TemporaDB database.
///
/// Cloning is cheap; clones share the same underlying connection.
///
/// # Example
///
/// ```no_run
/// use tempora_table::{Connection, DbConfig};
///
/// # fn main() -> tempora_table::TemporaResult<()> {
/// let conn = Connection::open("./data/market.tempora", DbConfig::default())?;
/// let candles = conn.open_table("candles_1m", "ts");
/// conn.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    path: PathBuf,
    config: DbConfig,
    /// Count persisted at database creation; wins over the configured value.
    store_count: usize,
    state: Mutex<ConnState>,
    state_changed: Condvar,
    should_reopen: AtomicBool,
}

enum ConnState {
    Open(Arc<Database>),
    Reopening,
    Closed,
}

impl ConnState {
    const fn name(&self) -> &'static str {
        match self {
            Self::Open(_) => "open",
            Self::Reopening => "reopening",
            Self::Closed => "closed",
        }
    }
}

impl Connection {
    /// Opens the database at `path`, creating it (and its physical stores)
    /// on first open.
    ///
    /// # Errors
    ///
    /// [`TemporaError::Blocked`] when another live handle holds the
    /// database, [`TemporaError::InvalidConfig`] when the configuration
    /// fails validation, [`TemporaError::Open`] for any engine failure.
    pub fn open(path: impl AsRef<Path>, config: DbConfig) -> TemporaResult<Self> {
        let path = path.as_ref().to_path_buf();
        config
            .validate()
            .map_err(|message| TemporaError::InvalidConfig { message })?;

        let (db, store_count) = open_raw(&path, config.store_count)?;
        if store_count != config.store_count {
            warn!(
                "store count is fixed at creation: path: {}, configured: {}, using: {}",
                path.display(),
                config.store_count,
                store_count
            );
        }
        info!(
            "opened database: path: {}, stores: {}",
            path.display(),
            store_count
        );

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                path,
                config,
                store_count,
                state: Mutex::new(ConnState::Open(Arc::new(db))),
                state_changed: Condvar::new(),
                should_reopen: AtomicBool::new(true),
            }),
        })
    }

    /// Deletes the database at `path`. Succeeds when the file is already
    /// gone.
    ///
    /// # Errors
    ///
    /// [`TemporaError::Blocked`] when a live handle still holds the
    /// database, [`TemporaError::Destroy`] when the file cannot be removed.
    pub fn destroy(path: impl AsRef<Path>) -> TemporaResult<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(());
        }

        // Acquire and release the engine lock to prove nobody holds it.
        match Database::open(path) {
            Ok(db) => drop(db),
            Err(DatabaseError::DatabaseAlreadyOpen) => {
                return Err(TemporaError::Blocked {
                    path: path.to_path_buf(),
                })
            }
            // An unreadable file is still removable.
            Err(_) => {}
        }

        std::fs::remove_file(path).map_err(|source| TemporaError::Destroy {
            path: path.to_path_buf(),
            source,
        })?;
        info!("destroyed database: path: {}", path.display());
        Ok(())
    }

    /// Marks the connection as not-to-be-reopened and releases the handle.
    ///
    /// Subsequent operations fail with [`TemporaError::Closed`]; a reopen in
    /// progress is cancelled.
    pub fn close(&self) {
        self.inner.should_reopen.store(false, Ordering::Release);
        let mut state = self.inner.state.lock();
        if !matches!(*state, ConnState::Closed) {
            info!("closed database: path: {}", self.inner.path.display());
        }
        *state = ConnState::Closed;
        self.inner.state_changed.notify_all();
    }

    /// Opens a table named `name` whose rows are keyed by the field
    /// `key_field`.
    ///
    /// Opening is cheap: it computes the table's sentinel boundaries and
    /// routes it to its physical store, nothing is read or written.
    #[must_use]
    pub fn open_table(&self, name: impl Into<String>, key_field: impl Into<String>) -> Table {
        let name = name.into();
        let index = router::route(&name, self.inner.store_count);
        let store = StoreHandle::new(self.clone(), router::store_name(index));
        Table::new(name, key_field.into(), store)
    }

    /// Erases every row of the table named `name`.
    pub fn destroy_table(&self, name: &str) -> TemporaResult<()> {
        self.open_table(name, "").clear()
    }

    /// Number of physical stores backing this database.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.inner.store_count
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// The live engine handle, blocking while a reopen is in progress.
    pub(crate) fn database(&self) -> TemporaResult<Arc<Database>> {
        let mut state = self.inner.state.lock();
        loop {
            match &*state {
                ConnState::Open(db) => return Ok(Arc::clone(db)),
                ConnState::Closed => return Err(TemporaError::Closed),
                ConnState::Reopening => self.inner.state_changed.wait(&mut state),
            }
        }
    }

    pub(crate) fn relaxed_durability(&self) -> bool {
        self.inner.config.relaxed_durability
    }

    /// Reports an engine failure. Connection-class failures drop the handle
    /// and schedule the background reopen task; everything else is ignored.
    pub(crate) fn notify_failure(&self, err: &redb::Error) {
        if !connection_lost(err) {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if !matches!(*state, ConnState::Open(_)) {
                return;
            }
            warn!(
                "connection lost ({}): path: {}, error: {}",
                loss_reason(err),
                self.inner.path.display(),
                err
            );
            *state = ConnState::Reopening;
        }
        spawn_reopen(Arc::downgrade(&self.inner));
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.inner.path)
            .field("stores", &self.inner.store_count)
            .field("state", &self.inner.state.lock().name())
            .finish()
    }
}

/// Opens the engine database and runs the idempotent schema transaction:
/// create every physical store plus the meta store, and persist the store
/// count on first creation. Returns the handle and the effective count.
fn open_raw(path: &Path, requested_stores: usize) -> TemporaResult<(Database, usize)> {
    let db = Database::create(path).map_err(|err| match err {
        DatabaseError::DatabaseAlreadyOpen => TemporaError::Blocked {
            path: path.to_path_buf(),
        },
        other => TemporaError::Open {
            path: path.to_path_buf(),
            source: other.into(),
        },
    })?;

    let open_err = |err: redb::Error| TemporaError::Open {
        path: path.to_path_buf(),
        source: err,
    };

    let txn = db.begin_write().map_err(|e| open_err(e.into()))?;
    let store_count = {
        let mut meta = txn.open_table(META).map_err(|e| open_err(e.into()))?;
        let persisted = meta
            .get(META_KEY_STORE_COUNT)
            .map_err(|e| open_err(e.into()))?
            .map(|persisted| persisted.value() as usize);
        match persisted {
            Some(persisted) => persisted,
            None => {
                meta.insert(META_KEY_STORE_COUNT, requested_stores as u64)
                    .map_err(|e| open_err(e.into()))?;
                requested_stores
            }
        }
    };
    for index in 0..store_count {
        let name = router::store_name(index);
        let def: TableDefinition<&[u8], &[u8]> = TableDefinition::new(&name);
        txn.open_table(def).map_err(|e| open_err(e.into()))?;
    }
    txn.commit().map_err(|e| open_err(e.into()))?;

    Ok((db, store_count))
}

/// The background reopen task. Holds only a weak reference so a dropped
/// connection does not keep a retry loop alive; only this task installs a
/// new handle.
fn spawn_reopen(weak: Weak<ConnectionInner>) {
    thread::spawn(move || loop {
        let delay = match weak.upgrade() {
            Some(inner) => inner.config.reopen_delay,
            None => return,
        };
        thread::sleep(delay);

        let Some(inner) = weak.upgrade() else { return };
        if !inner.should_reopen.load(Ordering::Acquire) {
            let mut state = inner.state.lock();
            if matches!(*state, ConnState::Reopening) {
                *state = ConnState::Closed;
            }
            inner.state_changed.notify_all();
            return;
        }

        match open_raw(&inner.path, inner.store_count) {
            Ok((db, _)) => {
                let mut state = inner.state.lock();
                if matches!(*state, ConnState::Reopening) {
                    *state = ConnState::Open(Arc::new(db));
                    info!("reopened database: path: {}", inner.path.display());
                }
                inner.state_changed.notify_all();
                return;
            }
            Err(err) => {
                error!(
                    "failed to reopen database: path: {}, error: {}, will try again",
                    inner.path.display(),
                    err
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempora_common::{Datum, Row};

    fn sample_row(ts: i64) -> Row {
        let mut row = Row::new();
        row.insert("ts".to_string(), Datum::Number(ts as f64));
        row.insert("close".to_string(), Datum::Number(29_841.14));
        row
    }

    fn db_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("test.tempora")
    }

    #[test]
    fn test_open_persists_store_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path, DbConfig::for_testing()).unwrap();
        assert_eq!(conn.store_count(), 4);
        conn.close();
        drop(conn);

        // Reopening with a different configured count uses the persisted one.
        let conn = Connection::open(&path, DbConfig::with_store_count(16)).unwrap();
        assert_eq!(conn.store_count(), 4);
        conn.close();
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Connection::open(db_path(&dir), DbConfig::with_store_count(0)).unwrap_err();
        assert!(matches!(err, TemporaError::InvalidConfig { .. }));
    }

    #[test]
    fn test_second_open_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path, DbConfig::for_testing()).unwrap();
        let err = Connection::open(&path, DbConfig::for_testing()).unwrap_err();
        assert!(err.is_blocked());
        conn.close();
    }

    #[test]
    fn test_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);

        let conn = Connection::open(&path, DbConfig::for_testing()).unwrap();

        // In use: blocked.
        assert!(Connection::destroy(&path).unwrap_err().is_blocked());

        conn.close();
        Connection::destroy(&path).unwrap();
        assert!(!path.exists());

        // Destroying a missing database succeeds.
        Connection::destroy(&path).unwrap();
    }

    #[test]
    fn test_closed_connection_rejects_operations() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(db_path(&dir), DbConfig::for_testing()).unwrap();
        let table = conn.open_table("candles", "ts");
        conn.close();

        assert!(matches!(table.count(), Err(TemporaError::Closed)));
    }

    #[test]
    fn test_reconnect_liveness() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(db_path(&dir), DbConfig::for_testing()).unwrap();
        let table = conn.open_table("candles", "ts");
        table
            .put(&[sample_row(1), sample_row(2), sample_row(3)])
            .unwrap();

        // Simulate the engine invalidating the connection.
        let lost = redb::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "simulated disconnect",
        ));
        conn.notify_failure(&lost);

        // The next operation blocks until the background reopen lands, then
        // succeeds with no caller intervention.
        assert_eq!(table.count().unwrap(), 3);
        conn.close();
    }

    #[test]
    fn test_close_during_reopen_wins() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(db_path(&dir), DbConfig::for_testing()).unwrap();
        let table = conn.open_table("candles", "ts");

        let lost = redb::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "simulated disconnect",
        ));
        conn.notify_failure(&lost);
        conn.close();

        assert!(matches!(table.count(), Err(TemporaError::Closed)));
    }

    #[test]
    fn test_non_connection_errors_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(db_path(&dir), DbConfig::for_testing()).unwrap();
        let table = conn.open_table("candles", "ts");
        table.put(&[sample_row(1)]).unwrap();

        conn.notify_failure(&redb::Error::TableDoesNotExist("nope".to_string()));
        assert_eq!(table.count().unwrap(), 1);
        conn.close();
    }
}
