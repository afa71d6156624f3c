//! Report storage in a single redb database file.
//!
//! # Configuration Example
//! ```yaml
//! reports:
//!   backend: redb
//!   path: /data/reports.redb
//! ```

use ::redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use crate::{ReportBackend, ReportStoreError};

const REPORTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("reports");

fn backend_err(e: impl std::fmt::Display) -> ReportStoreError {
    ReportStoreError::backend(e.to_string())
}

/// Redb-backed report storage. Every put commits its own transaction.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Opens or creates the database at `path`.
    ///
    /// ```no_run
    /// use detector::RedbBackend;
    ///
    /// let backend = RedbBackend::open("/tmp/reports.redb").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReportStoreError> {
        let db = Database::create(path).map_err(backend_err)?;

        let write_txn = db.begin_write().map_err(backend_err)?;
        {
            let _table = write_txn.open_table(REPORTS_TABLE).map_err(backend_err)?;
        }
        write_txn.commit().map_err(backend_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl ReportBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), ReportStoreError> {
        let write_txn = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = write_txn.open_table(REPORTS_TABLE).map_err(backend_err)?;
            if table.get(key).map_err(backend_err)?.is_some() {
                return Err(ReportStoreError::backend(format!(
                    "duplicate report key {key}"
                )));
            }
            table.insert(key, value).map_err(backend_err)?;
        }
        write_txn.commit().map_err(backend_err)?;
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), ReportStoreError>,
    ) -> Result<(), ReportStoreError> {
        let read_txn = self.db.begin_read().map_err(backend_err)?;
        let table = read_txn.open_table(REPORTS_TABLE).map_err(backend_err)?;

        for item in table.iter().map_err(backend_err)? {
            let (key, value) = item.map_err(backend_err)?;
            visitor(key.value(), value.value())?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redb"
    }
}
